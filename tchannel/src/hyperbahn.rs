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

//! Client side of a Hyperbahn routing mesh.
//!
//! A [`HyperbahnClient`] wraps a channel that talks to services through a
//! list of routers. Client channels created from it send every request to
//! the routers, tagged with the caller name.
//!
//! ```rust
//! use std::sync::Arc;
//! use tchannel::channel::{ChannelConfig, TChannel};
//! use tchannel::hyperbahn::{ClientChannelOptions, HyperbahnClient, HyperbahnClientOptions};
//! use tchannel::transport::MemoryNetwork;
//!
//! # fn main() -> Result<(), tchannel::TChannelError> {
//! let channel = TChannel::new(ChannelConfig::new("client"), Arc::new(MemoryNetwork::new()))?;
//! let hyperbahn = HyperbahnClient::new(
//!     channel.clone(),
//!     HyperbahnClientOptions::new("hello-bob", "hello-alice")
//!         .with_router("127.0.0.1:21300"),
//! )?;
//!
//! let bob = hyperbahn.get_client_channel(ClientChannelOptions::new("hello-bob"))?;
//! assert!(bob.top_channel().is_some_and(|top| top.ptr_eq(&channel)));
//!
//! let error = hyperbahn.get_client_channel(ClientChannelOptions::default()).unwrap_err();
//! assert_eq!(error.to_string(), "invalid argument: must pass serviceName");
//! # Ok(())
//! # }
//! ```

use crate::channel::{RequestDefaults, SubChannel, SubChannelOptions, TChannel};
use crate::error::TChannelError;
use crate::request::CALLER_NAME_HEADER;
use std::sync::Arc;

/// Options for [`HyperbahnClient::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyperbahnClientOptions {
    /// Service this process registers as.
    pub service_name: String,
    /// Name sent as the `cn` header of outgoing requests.
    pub caller_name: String,
    /// Routers every client channel sends to.
    pub host_port_list: Vec<String>,
}

impl HyperbahnClientOptions {
    /// Options for `service_name` calling as `caller_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>, caller_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            caller_name: caller_name.into(),
            host_port_list: Vec::new(),
        }
    }

    /// Adds a router.
    #[must_use]
    pub fn with_router(mut self, host_port: impl Into<String>) -> Self {
        self.host_port_list.push(host_port.into());
        self
    }
}

/// Options for [`HyperbahnClient::get_client_channel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientChannelOptions {
    /// Service to call. Mandatory.
    pub service_name: Option<String>,
    /// Request defaults; the channel's are used when unset.
    pub request_defaults: Option<RequestDefaults>,
}

impl ClientChannelOptions {
    /// Options for calling `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            request_defaults: None,
        }
    }

    /// Sets the request defaults.
    #[must_use]
    pub fn with_request_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.request_defaults = Some(defaults);
        self
    }
}

/// A channel routed through Hyperbahn.
#[derive(Debug, Clone)]
pub struct HyperbahnClient {
    channel: TChannel,
    options: HyperbahnClientOptions,
}

impl HyperbahnClient {
    /// Wraps `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::InvalidArgument`] when the service name or
    /// the caller name is empty.
    pub fn new(channel: TChannel, options: HyperbahnClientOptions) -> Result<Self, TChannelError> {
        if options.service_name.is_empty() {
            return Err(TChannelError::invalid_argument("must pass serviceName"));
        }
        if options.caller_name.is_empty() {
            return Err(TChannelError::invalid_argument("must pass callerName"));
        }
        Ok(Self { channel, options })
    }

    /// Returns the sub-channel calling `options.service_name` through the
    /// routers.
    ///
    /// Memoized by service name like [`TChannel::make_sub_channel`].
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::InvalidArgument`] with message
    /// `"must pass serviceName"` when the name is missing or empty.
    pub fn get_client_channel(
        &self,
        options: ClientChannelOptions,
    ) -> Result<Arc<SubChannel>, TChannelError> {
        let service_name = match options.service_name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(TChannelError::invalid_argument("must pass serviceName")),
        };
        let defaults = options
            .request_defaults
            .unwrap_or_else(|| self.channel.config().request_defaults.clone())
            .with_header(CALLER_NAME_HEADER, self.options.caller_name.clone());

        let sub_options = self.options.host_port_list.iter().fold(
            SubChannelOptions::new(service_name).with_request_defaults(defaults),
            |options, router| options.with_peer(router.clone()),
        );
        self.channel.make_sub_channel(sub_options)
    }

    /// The wrapped channel.
    #[must_use]
    pub fn channel(&self) -> &TChannel {
        &self.channel
    }

    /// Service this process registers as.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.options.service_name
    }

    /// Name sent as the `cn` header.
    #[must_use]
    pub fn caller_name(&self) -> &str {
        &self.options.caller_name
    }

    /// The routers.
    #[must_use]
    pub fn routers(&self) -> &[String] {
        &self.options.host_port_list
    }
}
