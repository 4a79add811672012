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

//! Lifecycle events published by a peer.

use crate::connection::Direction;
use crate::transport::ConnectionId;

/// Connection lifecycle changes of one peer.
///
/// Delivered through [`Peer::subscribe`](crate::peer::Peer::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// An identified connection joined the peer.
    ConnectionAdded {
        /// The new connection.
        connection_id: ConnectionId,
        /// Which side opened it.
        direction: Direction,
    },

    /// A connection fully closed and left the peer.
    ///
    /// Published once per connection, after it was detached.
    ConnectionRemoved {
        /// The closed connection.
        connection_id: ConnectionId,
        /// Which side opened it.
        direction: Direction,
        /// What closed it.
        reason: String,
    },
}

impl PeerEvent {
    /// The connection the event is about.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::ConnectionAdded { connection_id, .. }
            | Self::ConnectionRemoved { connection_id, .. } => *connection_id,
        }
    }

    /// Returns `true` for [`ConnectionRemoved`](Self::ConnectionRemoved).
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::ConnectionRemoved { .. })
    }
}
