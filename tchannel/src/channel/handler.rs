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

//! Handlers for incoming requests.

use crate::connection::{CallResponseFrame, ErrorCode, Frame, Headers};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// A request received from a remote channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    /// Exchange id on the carrying connection.
    pub id: u32,
    /// Target service.
    pub service: String,
    /// Operation name (arg1).
    pub operation: String,
    /// Transport headers.
    pub headers: Headers,
    /// Application headers (arg2).
    pub arg2: Vec<u8>,
    /// Application body (arg3).
    pub arg3: Vec<u8>,
    /// Address of the calling channel.
    pub remote_addr: String,
    /// Time the caller allows; zero means unbounded.
    pub ttl: Duration,
}

/// What a handler answers with.
///
/// # Examples
///
/// ```rust
/// use tchannel::channel::OutgoingResponse;
///
/// let response = OutgoingResponse::ok("head", "body").with_header("as", "raw");
/// assert!(response.ok);
/// assert_eq!(response.arg3, b"body");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingResponse {
    /// `false` for application-level errors.
    pub ok: bool,
    /// Transport headers.
    pub headers: Headers,
    /// Application headers (arg2).
    pub arg2: Vec<u8>,
    /// Application body (arg3).
    pub arg3: Vec<u8>,
}

impl OutgoingResponse {
    /// A successful response.
    #[must_use]
    pub fn ok(arg2: impl Into<Vec<u8>>, arg3: impl Into<Vec<u8>>) -> Self {
        Self {
            ok: true,
            headers: Headers::new(),
            arg2: arg2.into(),
            arg3: arg3.into(),
        }
    }

    /// An application-level error response.
    #[must_use]
    pub fn not_ok(arg2: impl Into<Vec<u8>>, arg3: impl Into<Vec<u8>>) -> Self {
        Self {
            ok: false,
            ..Self::ok(arg2, arg3)
        }
    }

    /// Adds a transport header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A protocol-level failure raised by a handler.
///
/// The caller receives it as an error frame with `code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    /// Code sent to the caller.
    pub code: ErrorCode,
    /// Detail sent to the caller.
    pub message: String,
}

impl HandlerError {
    /// A failure with an explicit code.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// An unexpected failure.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedError, message)
    }

    /// The handler is too busy.
    #[must_use]
    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Busy, message)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HandlerError {}

/// Serves incoming requests for one service operation.
///
/// Closures can be used through [`handler_fn`].
#[async_trait::async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Produces the response to `request`.
    async fn handle(&self, request: IncomingRequest) -> Result<OutgoingResponse, HandlerError>;
}

/// Adapter turning an async closure into a [`RequestHandler`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async closure as a [`RequestHandler`].
///
/// # Examples
///
/// ```rust
/// use tchannel::channel::{OutgoingResponse, handler_fn};
///
/// let echo = handler_fn(|request| async move {
///     Ok(OutgoingResponse::ok(request.arg2, request.arg3))
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(IncomingRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OutgoingResponse, HandlerError>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait::async_trait]
impl<F, Fut> RequestHandler for HandlerFn<F>
where
    F: Fn(IncomingRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<OutgoingResponse, HandlerError>> + Send + 'static,
{
    async fn handle(&self, request: IncomingRequest) -> Result<OutgoingResponse, HandlerError> {
        (self.f)(request).await
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Handlers keyed by service and operation.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<HashMap<(String, String), Arc<dyn RequestHandler>>>,
}

impl HandlerRegistry {
    pub(crate) fn register(
        &self,
        service: &str,
        operation: &str,
        handler: Arc<dyn RequestHandler>,
    ) -> bool {
        self.handlers
            .write()
            .insert((service.to_string(), operation.to_string()), handler)
            .is_some()
    }

    pub(crate) fn lookup(&self, service: &str, operation: &str) -> Option<Arc<dyn RequestHandler>> {
        self.handlers
            .read()
            .get(&(service.to_string(), operation.to_string()))
            .cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.handlers.read().len()
    }
}

/// Runs `handler` within the request's TTL and builds the response frame.
pub(crate) async fn dispatch(handler: Arc<dyn RequestHandler>, request: IncomingRequest) -> Frame {
    let id = request.id;
    let ttl = request.ttl;
    let outcome = if ttl.is_zero() {
        handler.handle(request).await
    } else {
        match tokio::time::timeout(ttl, handler.handle(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(HandlerError::new(
                ErrorCode::Timeout,
                format!("request timed out after {ttl:?}"),
            )),
        }
    };
    match outcome {
        Ok(response) => Frame::CallResponse(CallResponseFrame {
            id,
            ok: response.ok,
            headers: response.headers,
            arg2: response.arg2,
            arg3: response.arg3,
        }),
        Err(error) => Frame::error(id, error.code, error.message),
    }
}
