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

//! Decoded protocol units exchanged over a [`FrameLink`](crate::transport::FrameLink).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocol version announced during identification.
pub const PROTOCOL_VERSION: u16 = 2;

/// Host:port announced by channels that are not listening.
pub const EPHEMERAL_HOST_PORT: &str = "0.0.0.0:0";

/// Exchange id used by identification frames and errors about them.
pub const INIT_EXCHANGE_ID: u32 = 0;

/// Transport headers attached to a call (`cn`, `as`, ...).
pub type Headers = BTreeMap<String, String>;

/// Error codes carried by [`Frame::Error`].
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::ErrorCode;
///
/// assert_eq!(ErrorCode::Declined.as_u8(), 0x04);
/// assert_eq!(ErrorCode::from_u8(0x04), Some(ErrorCode::Declined));
/// assert_eq!(ErrorCode::from_u8(0x42), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The request exceeded its time to live.
    Timeout,
    /// The caller cancelled the request.
    Cancelled,
    /// The remote is too busy to take the request.
    Busy,
    /// The remote refused the request, typically because it is draining.
    Declined,
    /// The handler failed in an unexpected way.
    UnexpectedError,
    /// The request was malformed or addressed an unknown endpoint.
    BadRequest,
    /// The remote could not reach a downstream dependency.
    NetworkError,
    /// The remote considers itself unhealthy.
    Unhealthy,
    /// A frame violated the protocol.
    ProtocolError,
}

impl ErrorCode {
    /// The wire value of this code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Timeout => 0x01,
            Self::Cancelled => 0x02,
            Self::Busy => 0x03,
            Self::Declined => 0x04,
            Self::UnexpectedError => 0x05,
            Self::BadRequest => 0x06,
            Self::NetworkError => 0x07,
            Self::Unhealthy => 0x08,
            Self::ProtocolError => 0xff,
        }
    }

    /// Looks a code up by its wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Timeout),
            0x02 => Some(Self::Cancelled),
            0x03 => Some(Self::Busy),
            0x04 => Some(Self::Declined),
            0x05 => Some(Self::UnexpectedError),
            0x06 => Some(Self::BadRequest),
            0x07 => Some(Self::NetworkError),
            0x08 => Some(Self::Unhealthy),
            0xff => Some(Self::ProtocolError),
            _ => None,
        }
    }

    /// Short lowercase name of the code.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Busy => "busy",
            Self::Declined => "declined",
            Self::UnexpectedError => "unexpected error",
            Self::BadRequest => "bad request",
            Self::NetworkError => "network error",
            Self::Unhealthy => "unhealthy",
            Self::ProtocolError => "protocol error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.as_u8())
    }
}

/// Identification payload shared by init requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitFrame {
    /// Protocol version of the sender.
    pub version: u16,
    /// Where the sender can be reached, or [`EPHEMERAL_HOST_PORT`].
    pub host_port: String,
    /// Free-form name of the sending process.
    pub process_name: String,
}

/// A request for `service`/`operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequestFrame {
    /// Exchange id, unique among in-flight exchanges of the connection.
    pub id: u32,
    /// Time to live in milliseconds; `0` means unbounded.
    pub ttl_ms: u64,
    /// Target service name.
    pub service: String,
    /// Transport headers.
    pub headers: Headers,
    /// Operation name (arg1).
    pub operation: String,
    /// Application headers (arg2).
    pub arg2: Vec<u8>,
    /// Application body (arg3).
    pub arg3: Vec<u8>,
}

/// The answer to a [`CallRequestFrame`] with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponseFrame {
    /// Exchange id of the request being answered.
    pub id: u32,
    /// `false` for application-level errors.
    pub ok: bool,
    /// Transport headers.
    pub headers: Headers,
    /// Application headers (arg2).
    pub arg2: Vec<u8>,
    /// Application body (arg3).
    pub arg3: Vec<u8>,
}

/// One decoded protocol unit.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::{ErrorCode, Frame};
///
/// let frame = Frame::error(7, ErrorCode::Declined, "connection draining");
/// assert_eq!(frame.exchange_id(), Some(7));
/// assert_eq!(frame.kind(), "error");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// First frame on an outgoing connection.
    InitRequest(InitFrame),
    /// Answer to an [`InitRequest`](Self::InitRequest).
    InitResponse(InitFrame),
    /// A request.
    CallRequest(CallRequestFrame),
    /// A successful (or application-failed) response.
    CallResponse(CallResponseFrame),
    /// A protocol-level failure of the exchange `id`.
    Error {
        /// Exchange id the error belongs to.
        id: u32,
        /// What went wrong.
        code: ErrorCode,
        /// Human readable detail.
        message: String,
    },
}

impl Frame {
    /// Builds an error frame.
    #[must_use]
    pub fn error(id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            code,
            message: message.into(),
        }
    }

    /// Exchange id carried by call and error frames.
    #[must_use]
    pub fn exchange_id(&self) -> Option<u32> {
        match self {
            Self::InitRequest(_) | Self::InitResponse(_) => None,
            Self::CallRequest(call) => Some(call.id),
            Self::CallResponse(response) => Some(response.id),
            Self::Error { id, .. } => Some(*id),
        }
    }

    /// Short name of the frame type, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitRequest(_) => "init request",
            Self::InitResponse(_) => "init response",
            Self::CallRequest(_) => "call request",
            Self::CallResponse(_) => "call response",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_wire_values_round_trip() {
        let codes = [
            ErrorCode::Timeout,
            ErrorCode::Cancelled,
            ErrorCode::Busy,
            ErrorCode::Declined,
            ErrorCode::UnexpectedError,
            ErrorCode::BadRequest,
            ErrorCode::NetworkError,
            ErrorCode::Unhealthy,
            ErrorCode::ProtocolError,
        ];
        for code in codes {
            assert_eq!(ErrorCode::from_u8(code.as_u8()), Some(code));
        }
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Declined.to_string(), "declined (0x04)");
        assert_eq!(ErrorCode::ProtocolError.to_string(), "protocol error (0xff)");
    }

    #[test]
    fn test_frames_serialize_for_external_codecs() {
        let mut headers = Headers::new();
        headers.insert("as".to_string(), "raw".to_string());
        let frame = Frame::CallRequest(CallRequestFrame {
            id: 3,
            ttl_ms: 100,
            service: "server".to_string(),
            headers,
            operation: "echo".to_string(),
            arg2: b"h".to_vec(),
            arg3: b"mess1".to_vec(),
        });

        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"CallRequest\""));
        let decoded: Frame = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_init_frames_have_no_exchange_id() {
        let frame = Frame::InitRequest(InitFrame {
            version: PROTOCOL_VERSION,
            host_port: EPHEMERAL_HOST_PORT.to_string(),
            process_name: "test".to_string(),
        });
        assert_eq!(frame.exchange_id(), None);
        assert_eq!(frame.kind(), "init request");
    }
}
