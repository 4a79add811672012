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

//! Per-request overrides.

use crate::connection::Headers;
use crate::request::RetryFlags;
use std::time::Duration;

/// Transport header naming the calling service.
pub const CALLER_NAME_HEADER: &str = "cn";

/// Transport header naming the argument scheme.
pub const ARG_SCHEME_HEADER: &str = "as";

/// Argument scheme used when the caller names none.
pub const DEFAULT_ARG_SCHEME: &str = "raw";

/// Overrides for one outgoing request.
///
/// Unset fields fall back to the sub-channel's request defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tchannel::request::{RequestOptions, RetryFlags};
///
/// let options = RequestOptions::new()
///     .with_host("127.0.0.1:4040")
///     .with_timeout(Duration::from_millis(100))
///     .with_retry_flags(RetryFlags::never())
///     .with_header("as", "raw");
/// assert_eq!(options.host.as_deref(), Some("127.0.0.1:4040"));
/// assert_eq!(options.headers.get("as").map(String::as_str), Some("raw"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send to this peer instead of choosing one of the sub-channel's peers.
    pub host: Option<String>,
    /// Time allowed for each attempt.
    pub timeout: Option<Duration>,
    /// Retry eligibility.
    pub retry_flags: Option<RetryFlags>,
    /// Maximum number of attempts, the first one included.
    pub retry_limit: Option<u32>,
    /// Transport headers, merged over the defaults.
    pub headers: Headers,
}

impl RequestOptions {
    /// Options that override nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a specific peer.
    #[must_use]
    pub fn with_host(mut self, host_port: impl Into<String>) -> Self {
        self.host = Some(host_port.into());
        self
    }

    /// Overrides the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the retry flags.
    #[must_use]
    pub fn with_retry_flags(mut self, flags: RetryFlags) -> Self {
        self.retry_flags = Some(flags);
        self
    }

    /// Overrides the retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Sets a transport header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
