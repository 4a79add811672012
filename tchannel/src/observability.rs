//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Observability support for tchannel.
//!
//! Every noteworthy state change of a channel is expressed as a
//! [`ChannelEvent`]. Emitting an event does three things:
//!
//! - logs it through `tracing` with structured fields (feature
//!   `observability`)
//! - counts it in the channel's [`ChannelMetrics`], exported to the `metrics`
//!   crate under the same feature
//! - hands it to every registered [`EventObserver`]
//!
//! # Observing a channel
//!
//! ```rust
//! use std::sync::Arc;
//! use tchannel::channel::{ChannelConfig, TChannel};
//! use tchannel::observability::EventRecorder;
//! use tchannel::transport::MemoryNetwork;
//!
//! # fn main() -> Result<(), tchannel::TChannelError> {
//! let network = MemoryNetwork::new();
//! let channel = TChannel::new(ChannelConfig::new("client"), Arc::new(network))?;
//!
//! let recorder = EventRecorder::new();
//! channel.add_observer(Arc::new(recorder.clone()));
//! assert!(recorder.events().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! # Log messages
//!
//! | Event                | Level   | Message                                              |
//! |----------------------|---------|------------------------------------------------------|
//! | `peer.draining`      | `info`  | draining peer                                        |
//! | `connection.draining`| `info`  | draining connection                                  |
//! | `connection.reset`   | `info`  | resetting connection                                 |
//! | `response.dropped`   | `info`  | ignoring outresponse.send on a closed connection     |
//! | others               | `debug` |                                                      |

mod events;
mod metrics;

pub use events::ChannelEvent;
pub use metrics::ChannelMetrics;

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Notify;

#[cfg(feature = "observability")]
use tracing::{debug, info};

/// Receives the events of a channel.
///
/// Observers run synchronously on the task that emitted the event and must
/// not block. Closures taking `&ChannelEvent` are observers.
pub trait EventObserver: Send + Sync + 'static {
    /// Called once per emitted event.
    fn on_event(&self, event: &ChannelEvent);
}

impl<F> EventObserver for F
where
    F: Fn(&ChannelEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: &ChannelEvent) {
        self(event);
    }
}

/// Fan-out of channel events to logs, metrics and observers.
#[derive(Default)]
pub(crate) struct EventBus {
    observers: RwLock<Vec<Arc<dyn EventObserver>>>,
    metrics: ChannelMetrics,
}

impl EventBus {
    pub(crate) fn subscribe(&self, observer: Arc<dyn EventObserver>) {
        self.observers.write().push(observer);
    }

    pub(crate) fn metrics(&self) -> &ChannelMetrics {
        &self.metrics
    }

    pub(crate) fn emit(&self, event: ChannelEvent) {
        #[cfg(feature = "observability")]
        log_event(&event);
        self.metrics.record(&event);

        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_event(&event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.read().len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(feature = "observability")]
fn log_event(event: &ChannelEvent) {
    match event {
        ChannelEvent::ConnectionIdentified {
            connection_id,
            direction,
            remote,
        } => debug!(%connection_id, %direction, %remote, "connection identified"),
        ChannelEvent::ConnectionDraining {
            connection_id,
            reason,
            pending,
        } => info!(%connection_id, %reason, pending, "draining connection"),
        ChannelEvent::ConnectionReset {
            connection_id,
            direction,
            local,
            reason,
            failed_requests,
            abandoned_responses,
        } => info!(
            %connection_id,
            %direction,
            local,
            %reason,
            failed_requests,
            abandoned_responses,
            "resetting connection"
        ),
        ChannelEvent::ConnectionRemoved {
            connection_id,
            host_port,
        } => debug!(%connection_id, %host_port, "connection removed from peer"),
        ChannelEvent::PeerDraining {
            host_port,
            reason,
            connections,
        } => info!(%host_port, %reason, connections, "draining peer"),
        ChannelEvent::RequestDrained {
            connection_id,
            service,
            reason,
        } => debug!(%connection_id, %service, %reason, "refusing request on a draining connection"),
        ChannelEvent::RequestDeclined {
            connection_id,
            service,
            reason,
        } => debug!(%connection_id, %service, %reason, "declining request on a draining connection"),
        ChannelEvent::RequestTimedOut {
            service,
            host_port,
            timeout,
        } => debug!(%service, %host_port, ?timeout, "request timed out"),
        ChannelEvent::RequestRetried {
            service,
            attempt,
            error_type,
        } => debug!(%service, attempt, error_type, "retrying request"),
        ChannelEvent::ResponseDropped {
            connection_id,
            exchange_id,
        } => info!(
            %connection_id,
            exchange_id,
            "ignoring outresponse.send on a closed connection"
        ),
    }
}

/// Observer that keeps every event it sees.
///
/// Meant for tests and diagnostics: assertions run against recorded events
/// instead of log output.
///
/// # Examples
///
/// ```rust
/// use tchannel::observability::{ChannelEvent, EventObserver, EventRecorder};
///
/// let recorder = EventRecorder::new();
/// recorder.on_event(&ChannelEvent::PeerDraining {
///     host_port: "127.0.0.1:4040".to_string(),
///     reason: "testdown".to_string(),
///     connections: 0,
/// });
/// assert_eq!(recorder.count("peer.draining"), 1);
/// assert_eq!(recorder.names(), vec!["peer.draining"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<ChannelEvent>>>,
    notify: Arc<Notify>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().clone()
    }

    /// Names of the recorded events, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(ChannelEvent::name).collect()
    }

    /// Number of recorded events named `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    /// Waits until at least `count` events named `name` were recorded.
    pub async fn wait_for(&self, name: &str, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.count(name) >= count {
                return;
            }
            notified.await;
        }
    }

    /// Forgets all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventObserver for EventRecorder {
    fn on_event(&self, event: &ChannelEvent) {
        self.events.lock().push(event.clone());
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConnectionId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn dropped() -> ChannelEvent {
        ChannelEvent::ResponseDropped {
            connection_id: ConnectionId::new(),
            exchange_id: 3,
        }
    }

    #[test]
    fn test_bus_counts_and_notifies() {
        let bus = EventBus::default();
        let recorder = EventRecorder::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(Arc::new(recorder.clone()));
        bus.subscribe(Arc::new(move |_: &ChannelEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(dropped());
        bus.emit(dropped());

        assert_eq!(recorder.count("response.dropped"), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(bus.metrics().responses_dropped(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_returns_after_event() {
        let recorder = EventRecorder::new();
        let observer = recorder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            observer.on_event(&dropped());
        });

        tokio::time::timeout(Duration::from_secs(1), recorder.wait_for("response.dropped", 1))
            .await
            .unwrap();
        recorder.clear();
        assert!(recorder.events().is_empty());
    }
}
