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

//! Connections, their frames and the drain protocol.
//!
//! A [`Connection`] is one identified link to a remote channel carrying many
//! concurrent exchanges, each identified by an exchange id. Connections can be
//! told to [`drain`](Connection::drain): they stop accepting new non-exempt
//! work in both directions while letting the exchanges already in flight run
//! to completion.
//!
//! # Drain semantics
//!
//! | Request after drain | Exempt | Outcome                               |
//! |---------------------|--------|---------------------------------------|
//! | outgoing            | no     | fails locally with `RequestDrained`   |
//! | incoming            | no     | answered with a `Declined` error frame |
//! | either              | yes    | processed normally                    |
//!
//! Resetting a connection fails its pending outgoing exchanges with
//! `LocalReset` when the close was local and `ConnectionReset` otherwise.

mod connection;
mod direction;
mod drain;
mod exchange;
mod frame;
mod handshake;

pub use connection::{Connection, ConnectionState, ResetCause};
pub use direction::Direction;
pub use drain::{
    DrainExemptFn, DrainOptions, DrainStatus, DrainWaiter, ExemptPolicy, RequestView,
};
pub use exchange::ExchangeIdGenerator;
pub use frame::{
    CallRequestFrame, CallResponseFrame, EPHEMERAL_HOST_PORT, ErrorCode, Frame, Headers,
    INIT_EXCHANGE_ID, InitFrame, PROTOCOL_VERSION,
};
pub use handshake::{HandshakeError, Identity};

pub(crate) use connection::{CallParams, PendingCall};
pub(crate) use drain::DrainState;
