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

//! Outgoing request lifecycle.
//!
//! A request is created from a [`SubChannel`](crate::channel::SubChannel)
//! and sent with [`OutgoingRequest::send`]. It ends exactly once: with a
//! [`CallResponse`] or with a [`RequestError`]. Timeouts, resets and
//! responses race under the connection lock, so a loser finds the exchange
//! gone and is discarded.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tchannel::channel::SubChannel;
//! use tchannel::request::{RequestOptions, RetryFlags};
//!
//! # async fn example(client: &SubChannel) {
//! let outcome = client
//!     .request(
//!         RequestOptions::new()
//!             .with_timeout(Duration::from_millis(100))
//!             .with_retry_flags(RetryFlags::never()),
//!     )
//!     .send("echo", "", "mess1")
//!     .await;
//!
//! match outcome {
//!     Ok(response) => println!("got {}", response.arg3_str()),
//!     Err(error) => println!("failed with {}", error.error_type()),
//! }
//! # }
//! ```

mod error;
mod options;
mod outgoing;
mod response;
mod retry;

pub use error::RequestError;
pub use options::{ARG_SCHEME_HEADER, CALLER_NAME_HEADER, DEFAULT_ARG_SCHEME, RequestOptions};
pub use outgoing::OutgoingRequest;
pub use response::CallResponse;
pub use retry::{DEFAULT_RETRY_LIMIT, RetryFlags};
