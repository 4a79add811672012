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

//! Traits at the transport seam.

use crate::transport::{FrameLink, TransportError};

/// Establishes outgoing frame links.
///
/// A channel holds one connector and uses it whenever a peer needs a new
/// outgoing connection.
///
/// # Examples
///
/// ```rust
/// use tchannel::transport::{Connector, FrameLink, TransportError};
///
/// struct Unreachable;
///
/// #[async_trait::async_trait]
/// impl Connector for Unreachable {
///     async fn connect(&self, host_port: &str) -> Result<FrameLink, TransportError> {
///         Err(TransportError::ConnectionRefused {
///             address: host_port.to_string(),
///             reason: "network unreachable".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a link to `host_port`.
    async fn connect(&self, host_port: &str) -> Result<FrameLink, TransportError>;
}

/// Accepts incoming frame links.
#[async_trait::async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Waits for the next incoming link.
    ///
    /// Returns [`TransportError::Closed`] once the listener has shut down.
    async fn accept(&self) -> Result<FrameLink, TransportError>;

    /// The `host:port` this listener is reachable at.
    fn local_addr(&self) -> Result<String, TransportError>;

    /// Stops accepting links. Already accepted links are unaffected.
    async fn shutdown(&self) -> Result<(), TransportError>;
}
