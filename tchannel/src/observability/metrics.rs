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

//! Counters for channel lifecycle events.
//!
//! Counters are atomics readable at any time. With the `observability`
//! feature they are also exported through the `metrics` crate.

use super::ChannelEvent;
use std::sync::atomic::{AtomicU64, Ordering};

/// Totals of the events a channel emitted.
///
/// # Examples
///
/// ```rust
/// use tchannel::observability::{ChannelEvent, ChannelMetrics};
///
/// let metrics = ChannelMetrics::new();
/// metrics.record(&ChannelEvent::RequestRetried {
///     service: "server".to_string(),
///     attempt: 2,
///     error_type: "tchannel.declined",
/// });
/// assert_eq!(metrics.requests_retried(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Connections that finished identification
    connections_identified: AtomicU64,
    /// Drains started on connections
    connections_draining: AtomicU64,
    /// Connections destroyed
    connections_reset: AtomicU64,
    /// Connections removed from their peer
    connections_removed: AtomicU64,
    /// Drains started on peers
    peers_draining: AtomicU64,
    /// Outgoing requests refused by draining connections
    requests_drained: AtomicU64,
    /// Incoming requests declined by draining connections
    requests_declined: AtomicU64,
    /// Attempts that ran out of time
    requests_timed_out: AtomicU64,
    /// Retried attempts
    requests_retried: AtomicU64,
    /// Handler responses dropped after reset
    responses_dropped: AtomicU64,
}

impl ChannelMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts `event`.
    pub fn record(&self, event: &ChannelEvent) {
        let (counter, name) = match event {
            ChannelEvent::ConnectionIdentified { .. } => (
                &self.connections_identified,
                "tchannel.connections.identified",
            ),
            ChannelEvent::ConnectionDraining { .. } => {
                (&self.connections_draining, "tchannel.connections.draining")
            }
            ChannelEvent::ConnectionReset { .. } => {
                (&self.connections_reset, "tchannel.connections.reset")
            }
            ChannelEvent::ConnectionRemoved { .. } => {
                (&self.connections_removed, "tchannel.connections.removed")
            }
            ChannelEvent::PeerDraining { .. } => (&self.peers_draining, "tchannel.peers.draining"),
            ChannelEvent::RequestDrained { .. } => {
                (&self.requests_drained, "tchannel.requests.drained")
            }
            ChannelEvent::RequestDeclined { .. } => {
                (&self.requests_declined, "tchannel.requests.declined")
            }
            ChannelEvent::RequestTimedOut { .. } => {
                (&self.requests_timed_out, "tchannel.requests.timeout")
            }
            ChannelEvent::RequestRetried { .. } => {
                (&self.requests_retried, "tchannel.requests.retried")
            }
            ChannelEvent::ResponseDropped { .. } => {
                (&self.responses_dropped, "tchannel.responses.dropped")
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!(name).increment(1);
        #[cfg(not(feature = "observability"))]
        let _ = name;
    }

    /// Connections that finished identification.
    #[must_use]
    pub fn connections_identified(&self) -> u64 {
        self.connections_identified.load(Ordering::Relaxed)
    }

    /// Drains started on connections.
    #[must_use]
    pub fn connections_draining(&self) -> u64 {
        self.connections_draining.load(Ordering::Relaxed)
    }

    /// Connections destroyed.
    #[must_use]
    pub fn connections_reset(&self) -> u64 {
        self.connections_reset.load(Ordering::Relaxed)
    }

    /// Connections removed from their peer.
    #[must_use]
    pub fn connections_removed(&self) -> u64 {
        self.connections_removed.load(Ordering::Relaxed)
    }

    /// Connections identified and not yet reset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tchannel::connection::Direction;
    /// use tchannel::observability::{ChannelEvent, ChannelMetrics};
    /// use tchannel::transport::ConnectionId;
    ///
    /// let metrics = ChannelMetrics::new();
    /// metrics.record(&ChannelEvent::ConnectionIdentified {
    ///     connection_id: ConnectionId::new(),
    ///     direction: Direction::Outgoing,
    ///     remote: "127.0.0.1:4040".to_string(),
    /// });
    /// assert_eq!(metrics.active_connections(), 1);
    /// ```
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_identified()
            .saturating_sub(self.connections_reset())
    }

    /// Drains started on peers.
    #[must_use]
    pub fn peers_draining(&self) -> u64 {
        self.peers_draining.load(Ordering::Relaxed)
    }

    /// Outgoing requests refused by draining connections.
    #[must_use]
    pub fn requests_drained(&self) -> u64 {
        self.requests_drained.load(Ordering::Relaxed)
    }

    /// Incoming requests declined by draining connections.
    #[must_use]
    pub fn requests_declined(&self) -> u64 {
        self.requests_declined.load(Ordering::Relaxed)
    }

    /// Attempts that ran out of time.
    #[must_use]
    pub fn requests_timed_out(&self) -> u64 {
        self.requests_timed_out.load(Ordering::Relaxed)
    }

    /// Retried attempts.
    #[must_use]
    pub fn requests_retried(&self) -> u64 {
        self.requests_retried.load(Ordering::Relaxed)
    }

    /// Handler responses dropped after their connection was reset.
    #[must_use]
    pub fn responses_dropped(&self) -> u64 {
        self.responses_dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Direction;
    use crate::transport::ConnectionId;

    #[test]
    fn test_reset_balances_identified() {
        let metrics = ChannelMetrics::new();
        let id = ConnectionId::new();
        metrics.record(&ChannelEvent::ConnectionIdentified {
            connection_id: id,
            direction: Direction::Incoming,
            remote: "127.0.0.1:1".to_string(),
        });
        metrics.record(&ChannelEvent::ConnectionReset {
            connection_id: id,
            direction: Direction::Incoming,
            local: false,
            reason: "closed".to_string(),
            failed_requests: 0,
            abandoned_responses: 0,
        });
        assert_eq!(metrics.connections_reset(), 1);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[test]
    fn test_drain_refusals_are_counted_separately() {
        let metrics = ChannelMetrics::new();
        let id = ConnectionId::new();
        metrics.record(&ChannelEvent::RequestDrained {
            connection_id: id,
            service: "a".to_string(),
            reason: "testdown".to_string(),
        });
        for _ in 0..2 {
            metrics.record(&ChannelEvent::RequestDeclined {
                connection_id: id,
                service: "a".to_string(),
                reason: "testdown".to_string(),
            });
        }
        assert_eq!(metrics.requests_drained(), 1);
        assert_eq!(metrics.requests_declined(), 2);
        assert_eq!(metrics.requests_timed_out(), 0);
    }
}
