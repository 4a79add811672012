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

//! Top-level error type for tchannel.
//!
//! Errors come in three layers:
//!
//! 1. **Transport**: link establishment and listener failures ([`TransportError`])
//! 2. **Request**: the outcome taxonomy of a single call ([`RequestError`])
//! 3. **Channel**: configuration and lifecycle misuse, surfaced synchronously
//!    as [`TChannelError`]
//!
//! [`TChannelError`] composes the layers for APIs that can fail in more than
//! one of them.
//!
//! # Examples
//!
//! ```rust
//! use tchannel::TChannelError;
//! use tchannel::transport::TransportError;
//!
//! let error = TChannelError::invalid_argument("must pass serviceName");
//! assert!(error.is_invalid_argument());
//! assert_eq!(error.to_string(), "invalid argument: must pass serviceName");
//!
//! let error: TChannelError = TransportError::Closed.into();
//! assert_eq!(error.error_type(), "tchannel.transport");
//! ```

use crate::request::RequestError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for channel operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TChannelError {
    /// A caller passed an invalid option.
    ///
    /// Raised synchronously, before any state changes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tchannel::TChannelError;
    ///
    /// let error = TChannelError::InvalidArgument {
    ///     message: "must pass serviceName".to_string(),
    /// };
    /// assert_eq!(error.error_type(), "tchannel.invalid-argument");
    /// ```
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// A transport operation failed.
    Transport(TransportError),

    /// A request failed.
    Request(RequestError),

    /// The channel is already closed.
    Closed,
}

impl TChannelError {
    /// Creates an [`InvalidArgument`](Self::InvalidArgument) error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns `true` for [`InvalidArgument`](Self::InvalidArgument).
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Stable dotted name of the error kind.
    ///
    /// Request errors report their own type.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "tchannel.invalid-argument",
            Self::Transport(_) => "tchannel.transport",
            Self::Request(error) => error.error_type(),
            Self::Closed => "tchannel.closed",
        }
    }
}

impl fmt::Display for TChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { message } => write!(f, "invalid argument: {message}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Request(e) => write!(f, "request error: {e}"),
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

impl StdError for TChannelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Request(e) => Some(e),
            Self::InvalidArgument { .. } | Self::Closed => None,
        }
    }
}

impl From<TransportError> for TChannelError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<RequestError> for TChannelError {
    fn from(error: RequestError) -> Self {
        Self::Request(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_keeps_its_type() {
        let error: TChannelError = RequestError::Drained {
            reason: "testdown".to_string(),
        }
        .into();
        assert_eq!(error.error_type(), "tchannel.request.drained");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_invalid_argument_has_no_source() {
        let error = TChannelError::invalid_argument("must pass serviceName");
        assert!(error.is_invalid_argument());
        assert!(error.source().is_none());
        assert!(!TChannelError::Closed.is_invalid_argument());
    }
}
