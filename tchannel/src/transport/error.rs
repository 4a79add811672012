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

//! Transport layer error types.
//!
//! Transport errors are the lowest level of the error hierarchy. They cover
//! establishing links and binding listeners. Failures of an established link
//! surface one level up as connection resets on the affected requests.

use thiserror::Error;

/// Errors that can occur while establishing or accepting frame links.
///
/// # Examples
///
/// ```rust
/// use tchannel::transport::TransportError;
///
/// let error = TransportError::ConnectionRefused {
///     address: "127.0.0.1:4040".to_string(),
///     reason: "no listener bound".to_string(),
/// };
/// assert!(error.is_recoverable());
/// assert_eq!(
///     error.to_string(),
///     "connection refused by 127.0.0.1:4040: no listener bound"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote side did not accept the link.
    ///
    /// Either nothing listens at the address or the listener went away while
    /// the link was being handed over.
    #[error("connection refused by {address}: {reason}")]
    ConnectionRefused {
        /// The address that refused the link
        address: String,
        /// Why the link was refused
        reason: String,
    },

    /// Another listener is already bound to the address.
    #[error("address {address} is already in use")]
    AddressInUse {
        /// The contested address
        address: String,
    },

    /// The address is not of the form `host:port`.
    #[error("invalid address '{address}': expected host:port")]
    InvalidAddress {
        /// The rejected address
        address: String,
    },

    /// The listener or network has been shut down.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Returns `true` if trying the same operation again later may succeed.
    ///
    /// A refused connection can succeed once the remote starts listening.
    /// Malformed addresses and closed listeners stay broken.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectionRefused { .. } | Self::AddressInUse { .. })
    }

    /// Returns the address involved in the failure, if any.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::ConnectionRefused { address, .. }
            | Self::AddressInUse { address }
            | Self::InvalidAddress { address } => Some(address),
            Self::Closed => None,
        }
    }
}
