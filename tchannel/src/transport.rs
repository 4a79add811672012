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

//! Transport seam between the channel core and the network.
//!
//! The core never touches sockets or bytes. It consumes [`FrameLink`]s, each
//! a bidirectional pipe of already-decoded [`Frame`](crate::connection::Frame)
//! values, produced by two traits:
//!
//! - [`Connector`]: dials a remote `host:port` and yields the client half.
//! - [`Listener`]: accepts links initiated by remote channels.
//!
//! Byte-level framing lives outside this crate. A codec only needs to turn a
//! socket into a [`FrameLink`] (frames derive `serde` traits for that
//! purpose).
//!
//! [`MemoryNetwork`] implements both sides in-process. Several channels can
//! share one network and address each other by `host:port` strings.
//!
//! # Examples
//!
//! ```rust
//! use tchannel::transport::{Connector, Listener, MemoryNetwork};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//! let listener = network.bind("127.0.0.1:4040")?;
//!
//! let client = network.connect("127.0.0.1:4040").await?;
//! let server = listener.accept().await?;
//!
//! assert_eq!(client.remote_addr(), "127.0.0.1:4040");
//! assert_eq!(server.remote_addr(), client.local_addr());
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod traits;
mod types;

pub use error::TransportError;
pub use memory::{MemoryListener, MemoryNetwork};
pub use traits::{Connector, Listener};
pub use types::{ConnectionId, FrameLink, parse_host_port};
