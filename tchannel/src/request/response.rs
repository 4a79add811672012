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

//! Responses to outgoing requests.

use crate::connection::{CallResponseFrame, Headers};
use std::borrow::Cow;

/// The response to an outgoing request.
///
/// `ok == false` marks an application-level error: the handler ran and
/// answered, so it is not a [`RequestError`](crate::request::RequestError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResponse {
    /// `false` for application-level errors.
    pub ok: bool,
    /// Transport headers.
    pub headers: Headers,
    /// Application headers (arg2).
    pub arg2: Vec<u8>,
    /// Application body (arg3).
    pub arg3: Vec<u8>,
}

impl CallResponse {
    /// Body decoded as UTF-8, lossily.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tchannel::connection::Headers;
    /// use tchannel::request::CallResponse;
    ///
    /// let response = CallResponse {
    ///     ok: true,
    ///     headers: Headers::new(),
    ///     arg2: Vec::new(),
    ///     arg3: b"mess1".to_vec(),
    /// };
    /// assert_eq!(response.arg3_str(), "mess1");
    /// ```
    #[must_use]
    pub fn arg3_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.arg3)
    }

    /// Application headers decoded as UTF-8, lossily.
    #[must_use]
    pub fn arg2_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.arg2)
    }
}

impl From<CallResponseFrame> for CallResponse {
    fn from(frame: CallResponseFrame) -> Self {
        Self {
            ok: frame.ok,
            headers: frame.headers,
            arg2: frame.arg2,
            arg3: frame.arg3,
        }
    }
}
