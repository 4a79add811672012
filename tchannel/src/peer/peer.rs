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

//! A logical remote endpoint and its connections.

use crate::channel::ChannelContext;
use crate::connection::{
    Connection, ConnectionState, Direction, DrainOptions, DrainStatus, DrainWaiter, ResetCause,
};
use crate::observability::ChannelEvent;
use crate::peer::PeerEvent;
use crate::request::RequestError;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct PeerState {
    connections: Vec<Arc<Connection>>,
    drain: Option<String>,
    pinned: bool,
}

/// A remote `host:port` and the connections to it.
///
/// Peers live in a channel's [`PeerRegistry`](crate::peer::PeerRegistry).
/// Outgoing requests pick a connection through
/// [`select_connection`](Self::select_connection); connections accepted from
/// the remote join the same peer once identified.
pub struct Peer {
    host_port: String,
    context: Weak<ChannelContext>,
    state: Mutex<PeerState>,
    events: broadcast::Sender<PeerEvent>,
    connecting: tokio::sync::Mutex<()>,
}

impl Peer {
    pub(crate) fn new(
        host_port: impl Into<String>,
        context: Weak<ChannelContext>,
        event_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            host_port: host_port.into(),
            context,
            state: Mutex::new(PeerState::default()),
            events,
            connecting: tokio::sync::Mutex::new(()),
        }
    }

    /// The remote address.
    #[must_use]
    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// Returns a connection for a new outgoing request.
    ///
    /// Prefers the newest identified, non-draining connection of the
    /// requested direction, then any identified non-draining one. While the
    /// peer drains, an alive draining connection is returned so its drain
    /// policy decides the request's fate. Otherwise a new outgoing connection
    /// is established and identified; concurrent callers share one attempt.
    pub async fn select_connection(
        self: &Arc<Self>,
        preference: Direction,
    ) -> Result<Arc<Connection>, RequestError> {
        if let Some(connection) = self.usable_connection(preference) {
            return Ok(connection);
        }
        let _establishing = self.connecting.lock().await;
        if let Some(connection) = self.usable_connection(preference) {
            return Ok(connection);
        }
        self.connect().await
    }

    /// Resolves once an identified connection to the peer exists.
    pub async fn wait_for_identified(self: &Arc<Self>) -> Result<(), RequestError> {
        self.select_connection(Direction::Outgoing).await.map(|_| ())
    }

    fn usable_connection(&self, preference: Direction) -> Option<Arc<Connection>> {
        let state = self.state.lock();
        let mut fallback = None;
        let mut draining = None;
        for connection in state.connections.iter().rev() {
            if !connection.is_identified() {
                continue;
            }
            if connection.is_draining() {
                draining = draining.or(Some(connection));
            } else if connection.direction() == preference {
                return Some(Arc::clone(connection));
            } else {
                fallback = fallback.or(Some(connection));
            }
        }
        let draining = draining.filter(|_| state.drain.is_some());
        fallback.or(draining).map(Arc::clone)
    }

    async fn connect(self: &Arc<Self>) -> Result<Arc<Connection>, RequestError> {
        let unavailable = |reason: String| RequestError::NoConnectionAvailable {
            host_port: self.host_port.clone(),
            reason,
        };
        let context = self
            .context
            .upgrade()
            .filter(|context| !context.is_closed())
            .ok_or_else(|| unavailable("channel closed".to_string()))?;

        let link = match context.connector.connect(&self.host_port).await {
            Ok(link) => link,
            Err(error) => {
                context.peers.remove_idle(self);
                return Err(unavailable(error.to_string()));
            }
        };
        let connection = Connection::open(link, Direction::Outgoing, &context);
        drop(context);

        connection.wait_identified().await?;
        let open = self
            .context
            .upgrade()
            .is_some_and(|context| !context.is_closed());
        if !open {
            connection.reset(ResetCause::local("channel closed"));
            return Err(unavailable("channel closed".to_string()));
        }
        self.attach(Arc::clone(&connection));
        Ok(connection)
    }

    /// Adds an identified connection and watches it until it closes.
    pub(crate) fn attach(self: &Arc<Self>, connection: Arc<Connection>) {
        // Drain outside the peer lock: before the connection becomes
        // selectable, and again if a drain started in between.
        let inherited = self.state.lock().drain.clone();
        if let Some(reason) = &inherited {
            let _inherited: DrainWaiter = connection.drain(reason);
        }
        let late = {
            let mut state = self.state.lock();
            state.connections.push(Arc::clone(&connection));
            state.drain.clone().filter(|_| inherited.is_none())
        };
        if let Some(reason) = late {
            let _inherited: DrainWaiter = connection.drain(&reason);
        }
        let _ = self.events.send(PeerEvent::ConnectionAdded {
            connection_id: connection.id(),
            direction: connection.direction(),
        });

        let peer = Arc::clone(self);
        tokio::spawn(async move {
            connection.closed().await;
            peer.detach(&connection);
        });
    }

    fn detach(&self, connection: &Connection) {
        let (removed, idle, pinned) = {
            let mut state = self.state.lock();
            let before = state.connections.len();
            state.connections.retain(|c| c.id() != connection.id());
            (
                state.connections.len() != before,
                state.connections.is_empty(),
                state.pinned,
            )
        };
        if !removed {
            return;
        }

        if let Some(context) = self.context.upgrade() {
            if idle && !pinned {
                context.peers.remove_idle(self);
            }
            context.events.emit(ChannelEvent::ConnectionRemoved {
                connection_id: connection.id(),
                host_port: self.host_port.clone(),
            });
        }

        let reason = match connection.state() {
            ConnectionState::Destroyed { reason } => reason,
            _ => String::new(),
        };
        let _ = self.events.send(PeerEvent::ConnectionRemoved {
            connection_id: connection.id(),
            direction: connection.direction(),
            reason,
        });
    }

    /// Starts draining the peer.
    ///
    /// The peer and every current connection are marked draining before this
    /// returns; connections attached later inherit the drain. The returned
    /// future resolves once every non-exempt request that was pending on the
    /// peer's connections at the time of the call completed. Draining again
    /// keeps the first reason.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tchannel::connection::DrainOptions;
    /// use tchannel::peer::Peer;
    ///
    /// # async fn example(peer: &Peer) {
    /// let drained = peer.drain(DrainOptions::new("testdown"));
    /// assert!(peer.is_draining());
    /// drained.await;
    /// # }
    /// ```
    pub fn drain(&self, options: DrainOptions) -> impl Future<Output = ()> + Send + 'static {
        let (reason, first, connections) = {
            let mut state = self.state.lock();
            let first = state.drain.is_none();
            let reason = state
                .drain
                .get_or_insert_with(|| options.reason().to_string())
                .clone();
            (reason, first, state.connections.clone())
        };

        if first {
            if let Some(context) = self.context.upgrade() {
                context.events.emit(ChannelEvent::PeerDraining {
                    host_port: self.host_port.clone(),
                    reason: reason.clone(),
                    connections: connections.len(),
                });
            }
        }

        // Connections attached since the snapshot inherited the drain already.
        let waiters: Vec<DrainWaiter> = connections
            .iter()
            .map(|connection| connection.drain(&reason))
            .collect();
        async move {
            for waiter in waiters {
                waiter.await;
            }
        }
    }

    /// Resets every connection as a local close.
    ///
    /// Pending outgoing requests fail with `LocalReset`.
    pub fn close(&self, reason: &str) {
        for connection in self.connections() {
            connection.reset(ResetCause::local(reason));
        }
    }

    /// Subscribes to connection lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }

    /// Current connections, oldest first.
    #[must_use]
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.state.lock().connections.clone()
    }

    /// Number of current connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// In-flight exchanges over all connections.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .connections
            .iter()
            .map(|connection| connection.pending_count())
            .sum()
    }

    /// Returns `true` if an identified, non-draining connection exists.
    #[must_use]
    pub fn has_usable_connection(&self) -> bool {
        self.state
            .lock()
            .connections
            .iter()
            .any(|connection| connection.is_identified() && !connection.is_draining())
    }

    /// Aggregate drain status.
    #[must_use]
    pub fn drain_state(&self) -> DrainStatus {
        let state = self.state.lock();
        match state.drain {
            None => DrainStatus::NotDraining,
            Some(_) if state.connections.iter().any(|c| !c.is_destroyed()) => {
                DrainStatus::Draining
            }
            Some(_) => DrainStatus::Drained,
        }
    }

    /// Returns `true` once told to drain.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.state.lock().drain.is_some()
    }

    /// Reason of the drain, if draining.
    #[must_use]
    pub fn drain_reason(&self) -> Option<String> {
        self.state.lock().drain.clone()
    }

    /// Returns `true` if the registry keeps this peer while it has no
    /// connections.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.state.lock().pinned
    }

    pub(crate) fn pin(&self) {
        self.state.lock().pinned = true;
    }

    pub(crate) fn is_idle_and_unpinned(&self) -> bool {
        let state = self.state.lock();
        state.connections.is_empty() && !state.pinned
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Peer")
            .field("host_port", &self.host_port)
            .field("connections", &state.connections.len())
            .field("drain", &state.drain)
            .field("pinned", &state.pinned)
            .finish()
    }
}
