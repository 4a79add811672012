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

//! Shared transport types.

use crate::connection::Frame;
use crate::transport::TransportError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Global counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a connection.
///
/// # Examples
///
/// ```rust
/// use tchannel::transport::ConnectionId;
///
/// let first = ConnectionId::new();
/// let second = ConnectionId::new();
/// assert_ne!(first, second);
/// assert_eq!(ConnectionId::from(7).to_string(), "Connection(7)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection({})", self.0)
    }
}

/// A bidirectional pipe of decoded frames between two channels.
///
/// Frames sent on one end arrive, in order, at the other end. Dropping an end
/// closes the pipe: the opposite receiver yields `None` once drained.
pub struct FrameLink {
    local_addr: String,
    remote_addr: String,
    sender: mpsc::UnboundedSender<Frame>,
    receiver: mpsc::UnboundedReceiver<Frame>,
}

impl FrameLink {
    /// Assembles a link from its parts.
    ///
    /// Codecs use this to wrap a socket: `sender` feeds the encoder task and
    /// `receiver` is fed by the decoder task.
    #[must_use]
    pub fn new(
        local_addr: impl Into<String>,
        remote_addr: impl Into<String>,
        sender: mpsc::UnboundedSender<Frame>,
        receiver: mpsc::UnboundedReceiver<Frame>,
    ) -> Self {
        Self {
            local_addr: local_addr.into(),
            remote_addr: remote_addr.into(),
            sender,
            receiver,
        }
    }

    /// Creates two links wired to each other.
    ///
    /// The first link is addressed as `a` talking to `b`, the second as `b`
    /// talking to `a`.
    #[must_use]
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> (Self, Self) {
        let (a, b) = (a.into(), b.into());
        let (a_to_b, from_a) = mpsc::unbounded_channel();
        let (b_to_a, from_b) = mpsc::unbounded_channel();
        (
            Self::new(a.clone(), b.clone(), a_to_b, from_b),
            Self::new(b, a, b_to_a, from_a),
        )
    }

    /// The address of this end.
    #[must_use]
    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    /// The address of the other end as seen by the transport.
    #[must_use]
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        String,
        String,
        mpsc::UnboundedSender<Frame>,
        mpsc::UnboundedReceiver<Frame>,
    ) {
        (self.local_addr, self.remote_addr, self.sender, self.receiver)
    }
}

impl fmt::Debug for FrameLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLink")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

/// Splits `host:port` into its host and numeric port.
///
/// # Examples
///
/// ```rust
/// use tchannel::transport::parse_host_port;
///
/// assert_eq!(parse_host_port("127.0.0.1:4040").unwrap(), ("127.0.0.1", 4040));
/// assert!(parse_host_port("localhost").is_err());
/// assert!(parse_host_port(":80").is_err());
/// ```
pub fn parse_host_port(address: &str) -> Result<(&str, u16), TransportError> {
    let invalid = || TransportError::InvalidAddress {
        address: address.to_string(),
    };
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let ids: Vec<_> = (0..64).map(|_| ConnectionId::new()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(parse_host_port("10.0.0.1:0").unwrap(), ("10.0.0.1", 0));
        assert!(parse_host_port("10.0.0.1:http").is_err());
        assert!(parse_host_port("10.0.0.1:70000").is_err());
    }

    #[tokio::test]
    async fn test_pair_delivers_in_order() {
        let (a, b) = FrameLink::pair("a:1", "b:2");
        assert_eq!(a.remote_addr(), "b:2");
        assert_eq!(b.remote_addr(), "a:1");

        let (_, _, a_tx, _a_rx) = a.into_parts();
        let (_, _, _b_tx, mut b_rx) = b.into_parts();
        for id in 1..=3 {
            a_tx.send(Frame::error(id, crate::connection::ErrorCode::Busy, "x"))
                .unwrap();
        }
        for id in 1..=3 {
            assert_eq!(b_rx.recv().await.and_then(|f| f.exchange_id()), Some(id));
        }
        drop(a_tx);
        assert!(b_rx.recv().await.is_none());
    }
}
