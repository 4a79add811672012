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

//! Retry eligibility.

use crate::request::RequestError;
use serde::{Deserialize, Serialize};

/// Default number of attempts, the first one included.
pub const DEFAULT_RETRY_LIMIT: u32 = 4;

/// Which failures an outgoing request may be retried after.
///
/// Errors proving the request never reached a handler (`Declined`, `Busy`,
/// `Unhealthy`, `Drained`) are retried unless [`never`](Self::never) is set.
/// Connection failures need `on_connection_error`, timeouts need
/// `on_timeout`. Everything else is final.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use tchannel::request::{RequestError, RetryFlags};
///
/// let timeout = RequestError::Timeout { timeout: Duration::from_millis(100) };
/// assert!(!RetryFlags::default().should_retry(&timeout));
/// assert!(RetryFlags::default().with_on_timeout(true).should_retry(&timeout));
///
/// let declined = RequestError::Declined { message: "draining".into() };
/// assert!(RetryFlags::default().should_retry(&declined));
/// assert!(!RetryFlags::never().should_retry(&declined));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RetryFlags {
    /// Disables retries entirely.
    pub never: bool,
    /// Retry after resets and failures to connect.
    pub on_connection_error: bool,
    /// Retry after the request timed out.
    pub on_timeout: bool,
}

impl RetryFlags {
    /// Flags that disable every retry.
    #[must_use]
    pub const fn never() -> Self {
        Self {
            never: true,
            on_connection_error: false,
            on_timeout: false,
        }
    }

    /// Sets [`on_connection_error`](Self::on_connection_error).
    #[must_use]
    pub const fn with_on_connection_error(mut self, enabled: bool) -> Self {
        self.on_connection_error = enabled;
        self
    }

    /// Sets [`on_timeout`](Self::on_timeout).
    #[must_use]
    pub const fn with_on_timeout(mut self, enabled: bool) -> Self {
        self.on_timeout = enabled;
        self
    }

    /// Returns `true` if a request failing with `error` may be attempted again.
    #[must_use]
    pub fn should_retry(&self, error: &RequestError) -> bool {
        if self.never {
            return false;
        }
        match error {
            RequestError::Declined { .. }
            | RequestError::Busy { .. }
            | RequestError::Unhealthy { .. }
            | RequestError::Drained { .. } => true,
            RequestError::ConnectionReset { .. }
            | RequestError::LocalReset { .. }
            | RequestError::Network { .. }
            | RequestError::NoConnectionAvailable { .. } => self.on_connection_error,
            RequestError::Timeout { .. } | RequestError::RemoteTimeout { .. } => self.on_timeout,
            RequestError::BadRequest { .. }
            | RequestError::Unexpected { .. }
            | RequestError::Protocol { .. }
            | RequestError::Cancelled { .. }
            | RequestError::NoPeerAvailable { .. } => false,
        }
    }
}

impl Default for RetryFlags {
    fn default() -> Self {
        Self {
            never: false,
            on_connection_error: true,
            on_timeout: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reset() -> RequestError {
        RequestError::ConnectionReset {
            reason: "closed".to_string(),
        }
    }

    #[test]
    fn test_never_wins_over_everything() {
        let flags = RetryFlags {
            never: true,
            on_connection_error: true,
            on_timeout: true,
        };
        assert!(!flags.should_retry(&reset()));
        assert!(!flags.should_retry(&RequestError::Drained {
            reason: "x".to_string()
        }));
    }

    #[test]
    fn test_connection_errors_need_flag() {
        let flags = RetryFlags::default().with_on_connection_error(false);
        assert!(!flags.should_retry(&reset()));
        assert!(RetryFlags::default().should_retry(&reset()));
    }

    #[test]
    fn test_application_failures_are_final() {
        let flags = RetryFlags::default().with_on_timeout(true);
        assert!(!flags.should_retry(&RequestError::BadRequest {
            message: "no handler".to_string()
        }));
        assert!(!flags.should_retry(&RequestError::Unexpected {
            message: "boom".to_string()
        }));
        assert!(flags.should_retry(&RequestError::Timeout {
            timeout: Duration::from_millis(5)
        }));
    }

    #[test]
    fn test_is_retryable_delegates() {
        let error = RequestError::Busy {
            message: "busy".to_string(),
        };
        assert!(error.is_retryable(&RetryFlags::default()));
        assert!(!error.is_retryable(&RetryFlags::never()));
    }
}
