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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! The crate is organized in layers, leaves first:
//!
//! - **[`transport`]**: the seam producing framed links, plus an in-process
//!   [`MemoryNetwork`](transport::MemoryNetwork)
//! - **[`connection`]**: one identified link carrying many exchanges, and
//!   the drain protocol
//! - **[`peer`]**: a remote `host:port` owning connections
//! - **[`request`]**: timeout, retry and error taxonomy of outgoing calls
//! - **[`channel`]**: the root object, sub-channels and handlers
//! - **[`hyperbahn`]**: client channels routed through a router list
//! - **[`observability`]**: events, tracing and metrics
//!
//! ## Error Handling
//!
//! - [`TransportError`]: link establishment and listener failures
//! - [`RequestError`]: terminal outcome of a failed call
//! - [`TChannelError`]: configuration and lifecycle errors
//!
//! ## Features
//!
//! - **`observability`** (default): structured logging through `tracing` and
//!   counters through `metrics`
//!
//! ## Safety
//!
//! Written in 100% safe Rust with `#![deny(unsafe_code)]`.

pub mod channel;
pub mod connection;
pub mod error;
pub mod hyperbahn;
pub mod observability;
pub mod peer;
pub mod request;
pub mod transport;

pub use channel::{ChannelConfig, ChannelState, SubChannel, SubChannelOptions, TChannel};
pub use connection::{Connection, Direction, DrainOptions};
pub use error::TChannelError;
pub use hyperbahn::{ClientChannelOptions, HyperbahnClient, HyperbahnClientOptions};
pub use observability::{ChannelEvent, ChannelMetrics, EventObserver, EventRecorder};
pub use peer::{Peer, PeerEvent, PeerRegistry};
pub use request::{CallResponse, OutgoingRequest, RequestError, RequestOptions, RetryFlags};
pub use transport::{MemoryNetwork, TransportError};
