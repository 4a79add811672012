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

//! Configuration types for channels and sub-channels.

use crate::connection::Headers;
use crate::request::{DEFAULT_RETRY_LIMIT, RetryFlags};
use std::time::Duration;

/// Default time allowed for each request attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Default time allowed for the identification handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default buffer of each peer's event broadcast.
pub const DEFAULT_PEER_EVENT_CAPACITY: usize = 64;

/// Defaults applied to every request of a sub-channel.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tchannel::channel::RequestDefaults;
/// use tchannel::request::RetryFlags;
///
/// let defaults = RequestDefaults::new()
///     .with_timeout(Duration::from_millis(100))
///     .with_retry_flags(RetryFlags::never())
///     .with_header("as", "raw")
///     .with_header("cn", "serverClient");
/// assert_eq!(defaults.timeout, Duration::from_millis(100));
/// assert!(defaults.retry_flags.never);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Time allowed for each attempt.
    ///
    /// Default: 1 second
    pub timeout: Duration,

    /// Retry eligibility.
    ///
    /// Default: retry on connection errors
    pub retry_flags: RetryFlags,

    /// Maximum number of attempts, the first one included.
    ///
    /// Default: 4
    pub retry_limit: u32,

    /// Transport headers sent with every request.
    ///
    /// Default: none (`cn` and `as` are filled in at send time)
    pub headers: Headers,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_flags: RetryFlags::default(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            headers: Headers::new(),
        }
    }
}

impl RequestDefaults {
    /// Creates defaults with the standard values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry flags.
    #[must_use]
    pub fn with_retry_flags(mut self, flags: RetryFlags) -> Self {
        self.retry_flags = flags;
        self
    }

    /// Sets the retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Adds a transport header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Validates the defaults.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("request timeout must be greater than 0".to_string());
        }
        if self.retry_limit == 0 {
            return Err("retry_limit must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration for a [`TChannel`](crate::channel::TChannel).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tchannel::channel::ChannelConfig;
///
/// let config = ChannelConfig::new("server")
///     .with_handshake_timeout(Duration::from_secs(1));
/// assert!(config.validate().is_ok());
///
/// let config = ChannelConfig {
///     process_name: String::new(),
///     ..Default::default()
/// };
/// assert!(config.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Name announced during identification and used as the default caller
    /// name (`cn` header).
    ///
    /// Default: `tchannel[<pid>]`
    pub process_name: String,

    /// Time allowed for the identification handshake.
    ///
    /// Connections not identified within this duration are destroyed.
    ///
    /// Default: 5 seconds
    pub handshake_timeout: Duration,

    /// Request defaults inherited by sub-channels created without their own.
    pub request_defaults: RequestDefaults,

    /// Buffer of each peer's event broadcast. Slow subscribers lag behind
    /// and miss events once it overflows.
    ///
    /// Default: 64
    pub peer_event_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            process_name: format!("tchannel[{}]", std::process::id()),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            request_defaults: RequestDefaults::default(),
            peer_event_capacity: DEFAULT_PEER_EVENT_CAPACITY,
        }
    }
}

impl ChannelConfig {
    /// Creates a configuration announcing `process_name`.
    #[must_use]
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            ..Self::default()
        }
    }

    /// Sets the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the request defaults.
    #[must_use]
    pub fn with_request_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.request_defaults = defaults;
        self
    }

    /// Sets the peer event buffer.
    #[must_use]
    pub fn with_peer_event_capacity(mut self, capacity: usize) -> Self {
        self.peer_event_capacity = capacity;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.process_name.is_empty() {
            return Err("process_name must not be empty".to_string());
        }
        if self.handshake_timeout.is_zero() {
            return Err("handshake_timeout must be greater than 0".to_string());
        }
        if self.peer_event_capacity == 0 {
            return Err("peer_event_capacity must be greater than 0".to_string());
        }
        self.request_defaults.validate()
    }
}

/// Options for [`TChannel::make_sub_channel`](crate::channel::TChannel::make_sub_channel).
///
/// # Examples
///
/// ```rust
/// use tchannel::channel::SubChannelOptions;
///
/// let options = SubChannelOptions::new("server").with_peer("127.0.0.1:4040");
/// assert_eq!(options.service_name.as_deref(), Some("server"));
/// assert_eq!(options.peers, vec!["127.0.0.1:4040".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubChannelOptions {
    /// Service the sub-channel is bound to. Mandatory.
    pub service_name: Option<String>,
    /// Request defaults; the channel's are used when unset.
    pub request_defaults: Option<RequestDefaults>,
    /// Peers the sub-channel sends to.
    pub peers: Vec<String>,
}

impl SubChannelOptions {
    /// Options for a sub-channel bound to `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            ..Self::default()
        }
    }

    /// Sets the request defaults.
    #[must_use]
    pub fn with_request_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.request_defaults = Some(defaults);
        self
    }

    /// Adds a peer.
    #[must_use]
    pub fn with_peer(mut self, host_port: impl Into<String>) -> Self {
        self.peers.push(host_port.into());
        self
    }
}
