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

//! Terminal failures of a request.

use crate::connection::ErrorCode;
use crate::request::RetryFlags;
use std::fmt;
use std::time::Duration;

/// Why a request did not produce a response.
///
/// Every outgoing request ends with exactly one response or exactly one of
/// these errors. Each variant has a stable dotted type string returned by
/// [`error_type`](Self::error_type).
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::ErrorCode;
/// use tchannel::request::RequestError;
///
/// let error = RequestError::from_error_frame(ErrorCode::Declined, "connection draining".into());
/// assert_eq!(error.error_type(), "tchannel.declined");
/// assert!(!error.reached_handler());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The remote refused the request because its connection is draining.
    Declined {
        /// The remote's explanation.
        message: String,
    },

    /// The local connection is draining; the request was never sent.
    Drained {
        /// Reason given when the drain started.
        reason: String,
    },

    /// No response arrived within the request timeout.
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The remote's handler exceeded the request's time to live.
    RemoteTimeout {
        /// The remote's explanation.
        message: String,
    },

    /// The connection was closed by the remote side or the transport.
    ConnectionReset {
        /// What closed the connection.
        reason: String,
    },

    /// The connection was closed locally, or was already destroyed when the
    /// request tried to use it.
    LocalReset {
        /// What closed the connection.
        reason: String,
    },

    /// The remote is too busy.
    Busy {
        /// The remote's explanation.
        message: String,
    },

    /// The remote considers itself unhealthy.
    Unhealthy {
        /// The remote's explanation.
        message: String,
    },

    /// The remote has no handler for the request, or it was malformed.
    BadRequest {
        /// The remote's explanation.
        message: String,
    },

    /// The remote handler failed.
    Unexpected {
        /// The remote's explanation.
        message: String,
    },

    /// The remote failed to reach a dependency.
    Network {
        /// The remote's explanation.
        message: String,
    },

    /// A frame violated the protocol.
    Protocol {
        /// What was violated.
        message: String,
    },

    /// The request was cancelled.
    Cancelled {
        /// The remote's explanation.
        message: String,
    },

    /// No identified connection to the peer could be established.
    NoConnectionAvailable {
        /// The peer that could not be reached.
        host_port: String,
        /// Why establishing failed.
        reason: String,
    },

    /// The sub-channel has no peer to send to.
    NoPeerAvailable {
        /// Service the request was for.
        service: String,
    },
}

impl RequestError {
    /// Maps a received error frame to a request error.
    #[must_use]
    pub fn from_error_frame(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::Timeout => Self::RemoteTimeout { message },
            ErrorCode::Cancelled => Self::Cancelled { message },
            ErrorCode::Busy => Self::Busy { message },
            ErrorCode::Declined => Self::Declined { message },
            ErrorCode::UnexpectedError => Self::Unexpected { message },
            ErrorCode::BadRequest => Self::BadRequest { message },
            ErrorCode::NetworkError => Self::Network { message },
            ErrorCode::Unhealthy => Self::Unhealthy { message },
            ErrorCode::ProtocolError => Self::Protocol { message },
        }
    }

    /// Stable dotted type of the error.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Declined { .. } => "tchannel.declined",
            Self::Drained { .. } => "tchannel.request.drained",
            Self::Timeout { .. } => "tchannel.request.timeout",
            Self::RemoteTimeout { .. } => "tchannel.timeout",
            Self::ConnectionReset { .. } => "tchannel.connection.reset",
            Self::LocalReset { .. } => "tchannel.local.reset",
            Self::Busy { .. } => "tchannel.busy",
            Self::Unhealthy { .. } => "tchannel.unhealthy",
            Self::BadRequest { .. } => "tchannel.bad-request",
            Self::Unexpected { .. } => "tchannel.unexpected",
            Self::Network { .. } => "tchannel.network",
            Self::Protocol { .. } => "tchannel.protocol",
            Self::Cancelled { .. } => "tchannel.cancelled",
            Self::NoConnectionAvailable { .. } => "tchannel.no-connection-available",
            Self::NoPeerAvailable { .. } => "tchannel.no-peer-available",
        }
    }

    /// Error code to put on the wire when relaying this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Declined { .. } | Self::Drained { .. } => ErrorCode::Declined,
            Self::Timeout { .. } | Self::RemoteTimeout { .. } => ErrorCode::Timeout,
            Self::Busy { .. } => ErrorCode::Busy,
            Self::Unhealthy { .. } => ErrorCode::Unhealthy,
            Self::BadRequest { .. } => ErrorCode::BadRequest,
            Self::Protocol { .. } => ErrorCode::ProtocolError,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::ConnectionReset { .. }
            | Self::LocalReset { .. }
            | Self::Network { .. }
            | Self::NoConnectionAvailable { .. }
            | Self::NoPeerAvailable { .. } => ErrorCode::NetworkError,
            Self::Unexpected { .. } => ErrorCode::UnexpectedError,
        }
    }

    /// Returns `true` for errors caused by a connection going away.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset { .. } | Self::LocalReset { .. })
    }

    /// Returns `true` for request timeouts, local or remote.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RemoteTimeout { .. })
    }

    /// Returns `true` for errors that stop a request because of a drain.
    #[must_use]
    pub const fn is_drain_rejection(&self) -> bool {
        matches!(self, Self::Declined { .. } | Self::Drained { .. })
    }

    /// Returns `true` if the request may have been seen by a remote handler.
    ///
    /// Requests that provably never reached a handler are safe to retry on
    /// any peer.
    #[must_use]
    pub const fn reached_handler(&self) -> bool {
        !matches!(
            self,
            Self::Declined { .. }
                | Self::Drained { .. }
                | Self::Busy { .. }
                | Self::Unhealthy { .. }
                | Self::NoConnectionAvailable { .. }
                | Self::NoPeerAvailable { .. }
        )
    }

    /// Returns `true` if `flags` allow retrying after this error.
    #[must_use]
    pub fn is_retryable(&self, flags: &RetryFlags) -> bool {
        flags.should_retry(self)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declined { message } => write!(f, "request declined: {}", message),
            Self::Drained { reason } => {
                write!(f, "request drained: connection draining ({})", reason)
            }
            Self::Timeout { timeout } => write!(f, "request timed out after {:?}", timeout),
            Self::RemoteTimeout { message } => write!(f, "remote timed out: {}", message),
            Self::ConnectionReset { reason } => write!(f, "connection reset: {}", reason),
            Self::LocalReset { reason } => write!(f, "local connection reset: {}", reason),
            Self::Busy { message } => write!(f, "remote busy: {}", message),
            Self::Unhealthy { message } => write!(f, "remote unhealthy: {}", message),
            Self::BadRequest { message } => write!(f, "bad request: {}", message),
            Self::Unexpected { message } => write!(f, "unexpected error: {}", message),
            Self::Network { message } => write!(f, "network error: {}", message),
            Self::Protocol { message } => write!(f, "protocol error: {}", message),
            Self::Cancelled { message } => write!(f, "request cancelled: {}", message),
            Self::NoConnectionAvailable { host_port, reason } => {
                write!(f, "no connection available to {}: {}", host_port, reason)
            }
            Self::NoPeerAvailable { service } => {
                write!(f, "no peer available for service '{}'", service)
            }
        }
    }
}

impl std::error::Error for RequestError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_types() {
        let cases = [
            (
                RequestError::Declined {
                    message: String::new(),
                },
                "tchannel.declined",
            ),
            (
                RequestError::Drained {
                    reason: String::new(),
                },
                "tchannel.request.drained",
            ),
            (
                RequestError::Timeout {
                    timeout: Duration::from_millis(100),
                },
                "tchannel.request.timeout",
            ),
            (
                RequestError::ConnectionReset {
                    reason: String::new(),
                },
                "tchannel.connection.reset",
            ),
            (
                RequestError::LocalReset {
                    reason: String::new(),
                },
                "tchannel.local.reset",
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.error_type(), expected);
        }
    }

    #[test]
    fn test_error_frame_mapping_preserves_code() {
        for value in [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xff] {
            let code = ErrorCode::from_u8(value).unwrap();
            let error = RequestError::from_error_frame(code, "m".to_string());
            assert_eq!(error.error_code(), code);
        }
    }

    #[test]
    fn test_classification() {
        let reset = RequestError::LocalReset {
            reason: "closed".to_string(),
        };
        assert!(reset.is_reset());
        assert!(reset.reached_handler());

        let drained = RequestError::Drained {
            reason: "testdown".to_string(),
        };
        assert!(drained.is_drain_rejection());
        assert!(!drained.reached_handler());
        assert_eq!(
            drained.to_string(),
            "request drained: connection draining (testdown)"
        );
    }
}
