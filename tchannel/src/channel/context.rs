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

//! State shared by a channel, its sub-channels, peers and connections.

use crate::channel::{ChannelConfig, ChannelState, HandlerRegistry};
use crate::connection::{
    Connection, Direction, DrainOptions, ExemptPolicy, Identity, ResetCause,
};
use crate::observability::EventBus;
use crate::peer::PeerRegistry;
use crate::transport::{Connector, FrameLink};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};

#[cfg(feature = "observability")]
use tracing::debug;

#[derive(Debug)]
struct Lifecycle {
    state: ChannelState,
    drain_reason: Option<String>,
}

/// Everything a channel's components need from the channel.
///
/// Peers and connections keep a `Weak` reference to it, so dropping the last
/// channel handle releases the whole graph.
pub(crate) struct ChannelContext {
    config: ChannelConfig,
    identity: RwLock<Identity>,
    pub(crate) handlers: HandlerRegistry,
    pub(crate) exempt: ExemptPolicy,
    pub(crate) events: EventBus,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) peers: PeerRegistry,
    lifecycle: RwLock<Lifecycle>,
    unidentified: Mutex<Vec<Weak<Connection>>>,
}

impl ChannelContext {
    pub(crate) fn new(config: ChannelConfig, connector: Arc<dyn Connector>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            identity: RwLock::new(Identity::ephemeral(config.process_name.clone())),
            handlers: HandlerRegistry::default(),
            exempt: ExemptPolicy::new(),
            events: EventBus::default(),
            connector,
            peers: PeerRegistry::new(weak.clone(), config.peer_event_capacity),
            lifecycle: RwLock::new(Lifecycle {
                state: ChannelState::Open,
                drain_reason: None,
            }),
            unidentified: Mutex::new(Vec::new()),
            config,
        })
    }

    pub(crate) fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// What this channel announces during identification.
    pub(crate) fn identity(&self) -> Identity {
        self.identity.read().clone()
    }

    pub(crate) fn set_host_port(&self, host_port: &str) {
        *self.identity.write() = Identity::new(host_port, self.config.process_name.clone());
    }

    pub(crate) fn state(&self) -> ChannelState {
        self.lifecycle.read().state
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state() == ChannelState::Closed
    }

    pub(crate) fn drain_reason(&self) -> Option<String> {
        self.lifecycle.read().drain_reason.clone()
    }

    /// Moves an open channel to `Draining`, keeping the first reason.
    ///
    /// Returns the reason in effect, or `None` if the channel is closed.
    pub(crate) fn begin_drain(&self, reason: &str) -> Option<String> {
        let mut lifecycle = self.lifecycle.write();
        match lifecycle.state {
            ChannelState::Closed => None,
            ChannelState::Open | ChannelState::Draining => {
                lifecycle.state = ChannelState::Draining;
                Some(
                    lifecycle
                        .drain_reason
                        .get_or_insert_with(|| reason.to_string())
                        .clone(),
                )
            }
        }
    }

    /// Returns `false` if the channel was already closed.
    pub(crate) fn mark_closed(&self) -> bool {
        let mut lifecycle = self.lifecycle.write();
        if lifecycle.state == ChannelState::Closed {
            return false;
        }
        lifecycle.state = ChannelState::Closed;
        true
    }

    /// Starts serving a link accepted by a listener.
    pub(crate) fn accept(self: &Arc<Self>, link: FrameLink) {
        if self.is_closed() {
            return;
        }
        let connection = Connection::open(link, Direction::Incoming, self);
        let mut unidentified = self.unidentified.lock();
        unidentified.retain(|weak| {
            weak.upgrade()
                .is_some_and(|c| !c.is_identified() && !c.is_destroyed())
        });
        unidentified.push(Arc::downgrade(&connection));
    }

    /// Hands an identified incoming connection to the peer it came from.
    pub(crate) fn attach_incoming(self: &Arc<Self>, connection: &Arc<Connection>) {
        if self.is_closed() {
            connection.reset(ResetCause::local("channel closed"));
            return;
        }
        let host_port = connection.remote_host_port();
        #[cfg(feature = "observability")]
        debug!(connection_id = %connection.id(), %host_port, "attaching incoming connection");

        let peer = self.peers.get_or_create(&host_port);
        peer.attach(Arc::clone(connection));
        if let Some(reason) = self.drain_reason() {
            let _draining = peer.drain(DrainOptions::new(reason));
        }
    }

    /// Resets connections that were accepted but never identified.
    pub(crate) fn reset_unidentified(&self, reason: &str) -> usize {
        let pending = std::mem::take(&mut *self.unidentified.lock());
        pending
            .into_iter()
            .filter_map(|weak| weak.upgrade())
            .filter(|connection| connection.reset(ResetCause::local(reason)))
            .count()
    }
}

impl fmt::Debug for ChannelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelContext")
            .field("identity", &*self.identity.read())
            .field("lifecycle", &*self.lifecycle.read())
            .field("peers", &self.peers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryNetwork;

    fn context() -> Arc<ChannelContext> {
        ChannelContext::new(ChannelConfig::new("test"), Arc::new(MemoryNetwork::new()))
    }

    #[test]
    fn test_identity_starts_ephemeral() {
        let context = context();
        assert!(context.identity().is_ephemeral());
        context.set_host_port("127.0.0.1:4040");
        assert_eq!(context.identity().host_port(), "127.0.0.1:4040");
        assert_eq!(context.identity().process_name(), "test");
    }

    #[test]
    fn test_drain_keeps_first_reason_and_close_wins() {
        let context = context();
        assert_eq!(context.begin_drain("first").as_deref(), Some("first"));
        assert_eq!(context.begin_drain("second").as_deref(), Some("first"));
        assert_eq!(context.state(), ChannelState::Draining);

        assert!(context.mark_closed());
        assert!(!context.mark_closed());
        assert!(context.begin_drain("late").is_none());
        assert!(context.is_closed());
    }

    #[tokio::test]
    async fn test_reset_unidentified_closes_pending_handshakes() {
        let context = context();
        let (local, _remote) = FrameLink::pair("127.0.0.1:4040", "127.0.0.1:50000");
        context.accept(local);
        assert_eq!(context.reset_unidentified("channel closed"), 1);
        assert_eq!(context.reset_unidentified("channel closed"), 0);
    }
}
