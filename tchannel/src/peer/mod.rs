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

//! Peers: logical remote endpoints owning connections.
//!
//! A [`Peer`] is identified by the `host:port` of a remote channel. It owns
//! the connections to that channel in both directions, chooses one for each
//! outgoing request and can be drained independently of other peers.
//!
//! ```rust,no_run
//! use tchannel::channel::TChannel;
//! use tchannel::connection::DrainOptions;
//! use tchannel::peer::PeerEvent;
//!
//! # async fn example(client: TChannel) -> Result<(), Box<dyn std::error::Error>> {
//! let peer = client.peers().add("127.0.0.1:4040");
//! peer.wait_for_identified().await?;
//!
//! let mut events = peer.subscribe();
//! peer.drain(DrainOptions::new("testdown")).await;
//! peer.close("shutting down");
//! while let Ok(event) = events.recv().await {
//!     if let PeerEvent::ConnectionRemoved { reason, .. } = event {
//!         println!("connection removed: {reason}");
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod events;
mod peer;
mod registry;

pub use events::PeerEvent;
pub use peer::Peer;
pub use registry::PeerRegistry;
