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

//! Identification handshake.
//!
//! The side that opened a connection sends an init request carrying its
//! [`Identity`]; the accepting side validates it and answers with its own.
//! Only identified connections carry calls.

use crate::connection::{EPHEMERAL_HOST_PORT, Frame, InitFrame, PROTOCOL_VERSION};
use std::time::Duration;
use thiserror::Error;

/// How a channel presents itself during identification.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::Identity;
///
/// let identity = Identity::ephemeral("client");
/// assert!(identity.is_ephemeral());
///
/// let identity = Identity::new("127.0.0.1:4040", "server");
/// assert!(!identity.is_ephemeral());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    host_port: String,
    process_name: String,
}

impl Identity {
    /// Identity of a channel reachable at `host_port`.
    #[must_use]
    pub fn new(host_port: impl Into<String>, process_name: impl Into<String>) -> Self {
        Self {
            host_port: host_port.into(),
            process_name: process_name.into(),
        }
    }

    /// Identity of a channel that is not listening.
    #[must_use]
    pub fn ephemeral(process_name: impl Into<String>) -> Self {
        Self::new(EPHEMERAL_HOST_PORT, process_name)
    }

    /// Announced `host:port`.
    #[must_use]
    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    /// Announced process name.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Returns `true` if the channel cannot be dialed back.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.host_port == EPHEMERAL_HOST_PORT
    }

    pub(crate) fn init_request(&self) -> Frame {
        Frame::InitRequest(self.to_init_frame())
    }

    pub(crate) fn init_response(&self) -> Frame {
        Frame::InitResponse(self.to_init_frame())
    }

    fn to_init_frame(&self) -> InitFrame {
        InitFrame {
            version: PROTOCOL_VERSION,
            host_port: self.host_port.clone(),
            process_name: self.process_name.clone(),
        }
    }
}

/// Reasons identification can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The remote speaks another protocol version.
    #[error("protocol version mismatch: expected {expected}, received {received}")]
    VersionMismatch {
        /// Our version
        expected: u16,
        /// The remote's version
        received: u16,
    },

    /// A mandatory init field was empty.
    #[error("init frame is missing {field}")]
    MissingField {
        /// Name of the empty field
        field: &'static str,
    },

    /// A frame other than the expected init frame arrived first.
    #[error("unexpected {kind} frame before identification")]
    UnexpectedFrame {
        /// Kind of the offending frame
        kind: &'static str,
    },

    /// The remote answered our init request with an error.
    #[error("remote rejected identification: {message}")]
    Rejected {
        /// The remote's explanation
        message: String,
    },

    /// No init response arrived in time.
    #[error("identification timed out after {after:?}")]
    Timeout {
        /// The configured handshake timeout
        after: Duration,
    },
}

/// Validates an init frame from the remote and extracts its identity.
pub(crate) fn accept_init(frame: &InitFrame) -> Result<Identity, HandshakeError> {
    if frame.version != PROTOCOL_VERSION {
        return Err(HandshakeError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            received: frame.version,
        });
    }
    if frame.host_port.is_empty() {
        return Err(HandshakeError::MissingField { field: "host_port" });
    }
    if frame.process_name.is_empty() {
        return Err(HandshakeError::MissingField {
            field: "process_name",
        });
    }
    Ok(Identity::new(
        frame.host_port.clone(),
        frame.process_name.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(version: u16, host_port: &str, process_name: &str) -> InitFrame {
        InitFrame {
            version,
            host_port: host_port.to_string(),
            process_name: process_name.to_string(),
        }
    }

    #[test]
    fn test_accept_valid_init() {
        let identity = accept_init(&init(PROTOCOL_VERSION, "127.0.0.1:1", "server")).unwrap();
        assert_eq!(identity, Identity::new("127.0.0.1:1", "server"));
    }

    #[test]
    fn test_reject_version_mismatch() {
        let error = accept_init(&init(1, "127.0.0.1:1", "server")).unwrap_err();
        assert_eq!(
            error,
            HandshakeError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                received: 1
            }
        );
    }

    #[test]
    fn test_reject_missing_fields() {
        assert!(matches!(
            accept_init(&init(PROTOCOL_VERSION, "", "server")),
            Err(HandshakeError::MissingField { field: "host_port" })
        ));
        assert!(matches!(
            accept_init(&init(PROTOCOL_VERSION, "127.0.0.1:1", "")),
            Err(HandshakeError::MissingField {
                field: "process_name"
            })
        ));
    }

    #[test]
    fn test_init_frames_carry_identity() {
        let identity = Identity::ephemeral("client");
        match identity.init_request() {
            Frame::InitRequest(frame) => {
                assert_eq!(frame.host_port, EPHEMERAL_HOST_PORT);
                assert_eq!(frame.process_name, "client");
                assert_eq!(frame.version, PROTOCOL_VERSION);
            }
            other => panic!("unexpected frame {other:?}"),
        }
        assert!(matches!(identity.init_response(), Frame::InitResponse(_)));
    }
}
