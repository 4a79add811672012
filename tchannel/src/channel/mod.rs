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

//! Channels and sub-channels.
//!
//! A [`TChannel`] is the root object of a process: it owns the peer
//! registry, the handler registry, the drain exemption predicate and the
//! [`SubChannel`]s, one per service name.
//!
//! # Key Features
//!
//! - **Memoized sub-channels**: asking twice for the same service returns the
//!   same [`SubChannel`]
//! - **Shared peers**: every sub-channel sends through the channel's
//!   [`PeerRegistry`](crate::peer::PeerRegistry)
//! - **Graceful drain**: [`TChannel::drain`] stops new non-exempt work while
//!   letting in-flight exchanges finish
//!
//! # Examples
//!
//! ## Echo over an in-process network
//!
//! ```rust
//! use std::sync::Arc;
//! use tchannel::channel::{ChannelConfig, OutgoingResponse, SubChannelOptions, TChannel, handler_fn};
//! use tchannel::request::RequestOptions;
//! use tchannel::transport::MemoryNetwork;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let network = MemoryNetwork::new();
//!
//! let server = TChannel::new(ChannelConfig::new("server"), Arc::new(network.clone()))?;
//! let host_port = server.listen(network.bind("127.0.0.1:0")?)?;
//! server
//!     .make_sub_channel(SubChannelOptions::new("server"))?
//!     .register("echo", handler_fn(|request| async move {
//!         Ok(OutgoingResponse::ok(request.arg2, request.arg3))
//!     }));
//!
//! let client = TChannel::new(ChannelConfig::new("client"), Arc::new(network.clone()))?;
//! let sub = client.make_sub_channel(SubChannelOptions::new("server").with_peer(host_port))?;
//! let response = sub.request(RequestOptions::new()).send("echo", "", "mess1").await?;
//! assert_eq!(response.arg3_str(), "mess1");
//! # Ok(())
//! # }
//! ```
//!
//! ## Draining with an exemption
//!
//! ```rust,no_run
//! use tchannel::channel::TChannel;
//! use tchannel::connection::DrainOptions;
//!
//! # async fn example(server: TChannel) {
//! server.set_drain_exempt(|request| request.service == "health");
//! server.drain(DrainOptions::new("deploy")).await;
//! # }
//! ```

mod channel;
mod config;
mod context;
mod handler;
mod sub_channel;

pub use channel::{ChannelState, TChannel};
pub use config::{
    ChannelConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_PEER_EVENT_CAPACITY,
    DEFAULT_REQUEST_TIMEOUT, RequestDefaults, SubChannelOptions,
};
pub use handler::{
    HandlerError, HandlerFn, IncomingRequest, OutgoingResponse, RequestHandler, handler_fn,
};
pub use sub_channel::{SubChannel, SubChannelPeers};

pub(crate) use context::ChannelContext;
pub(crate) use handler::{HandlerRegistry, dispatch};
