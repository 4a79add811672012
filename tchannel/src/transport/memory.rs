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

//! In-process network of frame links.
//!
//! [`MemoryNetwork`] maps `host:port` strings to listeners living in the same
//! process. It has no I/O overhead and behaves deterministically, which makes
//! it the transport of choice for tests and for embedding several channels in
//! one binary.

use crate::transport::{Connector, FrameLink, Listener, TransportError, parse_host_port};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

#[cfg(feature = "observability")]
use tracing::debug;

/// First port handed out for `:0` binds and client ends.
const EPHEMERAL_PORT_START: u16 = 49152;

/// Host used for the client end of dialed links.
const CLIENT_HOST: &str = "127.0.0.1";

#[derive(Debug)]
struct NetworkState {
    listeners: HashMap<String, mpsc::UnboundedSender<FrameLink>>,
    next_port: u16,
}

impl NetworkState {
    fn allocate_port(&mut self, host: &str) -> u16 {
        loop {
            let port = self.next_port;
            self.next_port = self.next_port.checked_add(1).unwrap_or(EPHEMERAL_PORT_START);
            if !self.listeners.contains_key(&format!("{host}:{port}")) {
                return port;
            }
        }
    }
}

/// An in-process network addressed by `host:port` strings.
///
/// Cloning is cheap; clones share the same address space.
///
/// # Examples
///
/// ```rust
/// use tchannel::transport::{Listener, MemoryNetwork};
///
/// let network = MemoryNetwork::new();
/// let listener = network.bind("127.0.0.1:0").unwrap();
/// let address = listener.local_addr().unwrap();
/// assert!(address.starts_with("127.0.0.1:"));
/// assert!(network.is_bound(&address));
///
/// drop(listener);
/// assert!(!network.is_bound(&address));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                listeners: HashMap::new(),
                next_port: EPHEMERAL_PORT_START,
            })),
        }
    }

    /// Binds a listener to `address`.
    ///
    /// A port of `0` picks a free ephemeral port; read it back with
    /// [`Listener::local_addr`].
    pub fn bind(&self, address: &str) -> Result<MemoryListener, TransportError> {
        let (host, port) = parse_host_port(address)?;
        let mut state = self.state.lock();
        let address = if port == 0 {
            let port = state.allocate_port(host);
            format!("{host}:{port}")
        } else {
            address.to_string()
        };
        if state.listeners.contains_key(&address) {
            return Err(TransportError::AddressInUse { address });
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.listeners.insert(address.clone(), sender);

        #[cfg(feature = "observability")]
        debug!(address = %address, "memory listener bound");

        Ok(MemoryListener {
            address,
            incoming: tokio::sync::Mutex::new(receiver),
            network: self.clone(),
        })
    }

    /// Returns `true` if a listener is bound to `address`.
    #[must_use]
    pub fn is_bound(&self, address: &str) -> bool {
        self.state.lock().listeners.contains_key(address)
    }

    fn unbind(&self, address: &str) {
        self.state.lock().listeners.remove(address);
    }
}

impl Default for MemoryNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for MemoryNetwork {
    async fn connect(&self, host_port: &str) -> Result<FrameLink, TransportError> {
        parse_host_port(host_port)?;
        let (acceptor, local_addr) = {
            let mut state = self.state.lock();
            let acceptor = state.listeners.get(host_port).cloned().ok_or_else(|| {
                TransportError::ConnectionRefused {
                    address: host_port.to_string(),
                    reason: "no listener bound".to_string(),
                }
            })?;
            let port = state.allocate_port(CLIENT_HOST);
            (acceptor, format!("{CLIENT_HOST}:{port}"))
        };

        let (client, server) = FrameLink::pair(local_addr, host_port);
        acceptor
            .send(server)
            .map_err(|_| TransportError::ConnectionRefused {
                address: host_port.to_string(),
                reason: "listener shut down".to_string(),
            })?;
        Ok(client)
    }
}

/// Listener half of a [`MemoryNetwork`] binding.
///
/// Dropping the listener (or calling [`Listener::shutdown`]) frees the address.
#[derive(Debug)]
pub struct MemoryListener {
    address: String,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<FrameLink>>,
    network: MemoryNetwork,
}

#[async_trait::async_trait]
impl Listener for MemoryListener {
    async fn accept(&self) -> Result<FrameLink, TransportError> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .ok_or(TransportError::Closed)
    }

    fn local_addr(&self) -> Result<String, TransportError> {
        Ok(self.address.clone())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.network.unbind(&self.address);
        self.incoming.lock().await.close();
        Ok(())
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.network.unbind(&self.address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_accept() {
        let network = MemoryNetwork::new();
        let listener = network.bind("127.0.0.1:4040").unwrap();

        let client = network.connect("127.0.0.1:4040").await.unwrap();
        let server = listener.accept().await.unwrap();

        assert_eq!(client.remote_addr(), "127.0.0.1:4040");
        assert_eq!(server.local_addr(), "127.0.0.1:4040");
        assert_eq!(server.remote_addr(), client.local_addr());
    }

    #[tokio::test]
    async fn test_connect_without_listener_is_refused() {
        let network = MemoryNetwork::new();
        let error = network.connect("127.0.0.1:1").await.unwrap_err();
        assert!(matches!(error, TransportError::ConnectionRefused { .. }));

        let error = network.connect("nonsense").await.unwrap_err();
        assert!(matches!(error, TransportError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_address_in_use() {
        let network = MemoryNetwork::new();
        let _listener = network.bind("127.0.0.1:4041").unwrap();
        let error = network.bind("127.0.0.1:4041").unwrap_err();
        assert_eq!(
            error,
            TransportError::AddressInUse {
                address: "127.0.0.1:4041".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_unbinds_and_closes() {
        let network = MemoryNetwork::new();
        let listener = network.bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        listener.shutdown().await.unwrap();
        assert!(!network.is_bound(&address));
        assert_eq!(listener.accept().await.unwrap_err(), TransportError::Closed);
        assert!(network.connect(&address).await.is_err());
    }

    #[test]
    fn test_ephemeral_ports_are_distinct() {
        let network = MemoryNetwork::new();
        let a = network.bind("127.0.0.1:0").unwrap();
        let b = network.bind("127.0.0.1:0").unwrap();
        assert_ne!(a.local_addr().unwrap(), b.local_addr().unwrap());
    }
}
