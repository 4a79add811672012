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

//! Lifecycle of an outgoing request: peer choice, timeout and retries.

use crate::channel::{ChannelContext, RequestDefaults};
use crate::connection::{CallParams, Direction, Headers};
use crate::observability::ChannelEvent;
use crate::peer::Peer;
use crate::request::{
    ARG_SCHEME_HEADER, CALLER_NAME_HEADER, CallResponse, DEFAULT_ARG_SCHEME, RequestError,
    RequestOptions, RetryFlags,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// An outgoing request bound to a service, ready to be sent.
///
/// Created by [`SubChannel::request`](crate::channel::SubChannel::request).
/// Every attempt gets the full timeout; an attempt that fails with an error
/// the retry flags allow is repeated on another peer when one is available,
/// up to the retry limit.
pub struct OutgoingRequest {
    context: Arc<ChannelContext>,
    service: String,
    candidates: Vec<String>,
    host: Option<String>,
    timeout: Duration,
    retry_flags: RetryFlags,
    retry_limit: u32,
    headers: Headers,
}

impl OutgoingRequest {
    pub(crate) fn new(
        context: Arc<ChannelContext>,
        service: String,
        candidates: Vec<String>,
        defaults: &RequestDefaults,
        options: RequestOptions,
    ) -> Self {
        let mut headers = defaults.headers.clone();
        headers.extend(options.headers);
        headers
            .entry(CALLER_NAME_HEADER.to_string())
            .or_insert_with(|| context.config().process_name.clone());
        headers
            .entry(ARG_SCHEME_HEADER.to_string())
            .or_insert_with(|| DEFAULT_ARG_SCHEME.to_string());

        Self {
            context,
            service,
            candidates,
            host: options.host,
            timeout: options.timeout.unwrap_or(defaults.timeout),
            retry_flags: options.retry_flags.unwrap_or(defaults.retry_flags),
            retry_limit: options.retry_limit.unwrap_or(defaults.retry_limit).max(1),
            headers,
        }
    }

    /// Service the request is addressed to.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Time allowed for each attempt.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry eligibility.
    #[must_use]
    pub fn retry_flags(&self) -> RetryFlags {
        self.retry_flags
    }

    /// Maximum number of attempts.
    #[must_use]
    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Transport headers that will be sent.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sends the request and waits for its terminal outcome.
    ///
    /// Completes exactly once, with the response or with the error of the
    /// last attempt.
    pub async fn send(
        self,
        operation: impl Into<String>,
        arg2: impl Into<Vec<u8>>,
        arg3: impl Into<Vec<u8>>,
    ) -> Result<CallResponse, RequestError> {
        let operation = operation.into();
        let arg2 = arg2.into();
        let arg3 = arg3.into();

        if self.context.is_closed() {
            return Err(RequestError::LocalReset {
                reason: "channel closed".to_string(),
            });
        }

        let mut tried = HashSet::new();
        let mut attempt = 1;
        loop {
            let error = match self.attempt(&operation, &arg2, &arg3, &mut tried).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };
            if attempt >= self.retry_limit || !self.retry_flags.should_retry(&error) {
                return Err(error);
            }
            attempt += 1;
            self.context.events.emit(ChannelEvent::RequestRetried {
                service: self.service.clone(),
                attempt,
                error_type: error.error_type(),
            });
        }
    }

    async fn attempt(
        &self,
        operation: &str,
        arg2: &[u8],
        arg3: &[u8],
        tried: &mut HashSet<String>,
    ) -> Result<CallResponse, RequestError> {
        let peer = self.choose_peer(tried)?;
        tried.insert(peer.host_port().to_string());

        let deadline = Instant::now() + self.timeout;
        let connection = match tokio::time::timeout_at(
            deadline,
            peer.select_connection(Direction::Outgoing),
        )
        .await
        {
            Ok(selected) => selected?,
            Err(_) => return Err(self.timed_out(&peer)),
        };

        let pending = connection.send_request(CallParams {
            service: &self.service,
            operation,
            headers: &self.headers,
            arg2,
            arg3,
            ttl: deadline.saturating_duration_since(Instant::now()),
        })?;
        match pending.wait_until(&connection, deadline, self.timeout).await {
            Err(RequestError::Timeout { .. }) => Err(self.timed_out(&peer)),
            outcome => outcome,
        }
    }

    fn choose_peer(&self, tried: &HashSet<String>) -> Result<Arc<Peer>, RequestError> {
        if let Some(host) = &self.host {
            return Ok(self.context.peers.get_or_create(host));
        }
        let chosen = if self.candidates.is_empty() {
            self.context
                .peers
                .choose(&self.context.peers.host_ports(), tried)
        } else {
            self.context.peers.choose(&self.candidates, tried)
        };
        chosen
            .ok_or_else(|| RequestError::NoPeerAvailable {
                service: self.service.clone(),
            })
    }

    fn timed_out(&self, peer: &Peer) -> RequestError {
        self.context.events.emit(ChannelEvent::RequestTimedOut {
            service: self.service.clone(),
            host_port: peer.host_port().to_string(),
            timeout: self.timeout,
        });
        RequestError::Timeout {
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for OutgoingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutgoingRequest")
            .field("service", &self.service)
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .field("retry_flags", &self.retry_flags)
            .field("retry_limit", &self.retry_limit)
            .field("headers", &self.headers)
            .finish()
    }
}
