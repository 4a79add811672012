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

//! Lifecycle events emitted by a channel.

use crate::connection::Direction;
use crate::transport::ConnectionId;
use std::time::Duration;

/// Something noteworthy that happened inside a channel.
///
/// Every event is logged through `tracing`, counted and handed to the
/// channel's [`EventObserver`](super::EventObserver)s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection finished the identification handshake.
    ConnectionIdentified {
        /// The connection.
        connection_id: ConnectionId,
        /// Which side opened it.
        direction: Direction,
        /// Address the remote is known by.
        remote: String,
    },

    /// A connection started draining.
    ConnectionDraining {
        /// The connection.
        connection_id: ConnectionId,
        /// Why it drains.
        reason: String,
        /// Non-exempt exchanges the drain waits for.
        pending: usize,
    },

    /// A connection was destroyed.
    ConnectionReset {
        /// The connection.
        connection_id: ConnectionId,
        /// Which side opened it.
        direction: Direction,
        /// `true` if this process closed it.
        local: bool,
        /// What closed it.
        reason: String,
        /// Outgoing requests failed by the reset.
        failed_requests: usize,
        /// Incoming requests whose responses will be dropped.
        abandoned_responses: usize,
    },

    /// A closed connection left its peer.
    ConnectionRemoved {
        /// The connection.
        connection_id: ConnectionId,
        /// The peer it belonged to.
        host_port: String,
    },

    /// A peer started draining.
    PeerDraining {
        /// The peer.
        host_port: String,
        /// Why it drains.
        reason: String,
        /// Connections told to drain.
        connections: usize,
    },

    /// An outgoing request was refused by a draining connection.
    RequestDrained {
        /// The connection.
        connection_id: ConnectionId,
        /// Target service of the request.
        service: String,
        /// Drain reason.
        reason: String,
    },

    /// An incoming request was declined by a draining connection.
    RequestDeclined {
        /// The connection.
        connection_id: ConnectionId,
        /// Target service of the request.
        service: String,
        /// Drain reason.
        reason: String,
    },

    /// An outgoing request attempt ran out of time.
    RequestTimedOut {
        /// Target service.
        service: String,
        /// Peer the attempt went to.
        host_port: String,
        /// Time the attempt was allowed.
        timeout: Duration,
    },

    /// An outgoing request is tried again.
    RequestRetried {
        /// Target service.
        service: String,
        /// Number of the upcoming attempt, starting at 2.
        attempt: u32,
        /// Error type of the failed attempt.
        error_type: &'static str,
    },

    /// A handler answered after its connection was destroyed.
    ResponseDropped {
        /// The connection.
        connection_id: ConnectionId,
        /// Exchange the response belonged to.
        exchange_id: u32,
    },
}

impl ChannelEvent {
    /// Short dotted name of the event kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tchannel::observability::ChannelEvent;
    ///
    /// let event = ChannelEvent::PeerDraining {
    ///     host_port: "127.0.0.1:4040".to_string(),
    ///     reason: "testdown".to_string(),
    ///     connections: 1,
    /// };
    /// assert_eq!(event.name(), "peer.draining");
    /// ```
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionIdentified { .. } => "connection.identified",
            Self::ConnectionDraining { .. } => "connection.draining",
            Self::ConnectionReset { .. } => "connection.reset",
            Self::ConnectionRemoved { .. } => "connection.removed",
            Self::PeerDraining { .. } => "peer.draining",
            Self::RequestDrained { .. } => "request.drained",
            Self::RequestDeclined { .. } => "request.declined",
            Self::RequestTimedOut { .. } => "request.timeout",
            Self::RequestRetried { .. } => "request.retried",
            Self::ResponseDropped { .. } => "response.dropped",
        }
    }
}
