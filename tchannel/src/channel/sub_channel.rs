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

//! Service-scoped views of a channel.

use crate::channel::channel::ChannelInner;
use crate::channel::{ChannelContext, RequestDefaults, RequestHandler, TChannel};
use crate::peer::Peer;
use crate::request::{OutgoingRequest, RequestOptions};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

#[cfg(feature = "observability")]
use tracing::debug;

/// A channel bound to one service name.
///
/// Sub-channels share the peer registry of their top channel. Requests made
/// through a sub-channel are addressed to its service and go to the peers it
/// was told about, or to any peer of the channel when it knows none.
pub struct SubChannel {
    service_name: String,
    defaults: RequestDefaults,
    context: Arc<ChannelContext>,
    top: Weak<ChannelInner>,
    peers: Mutex<BTreeSet<String>>,
}

impl SubChannel {
    pub(crate) fn new(
        service_name: String,
        defaults: RequestDefaults,
        context: Arc<ChannelContext>,
        top: Weak<ChannelInner>,
    ) -> Self {
        Self {
            service_name,
            defaults,
            context,
            top,
            peers: Mutex::new(BTreeSet::new()),
        }
    }

    /// The service this sub-channel is bound to.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Defaults applied to requests made through this sub-channel.
    #[must_use]
    pub fn request_defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    /// The channel owning this sub-channel, while it is alive.
    #[must_use]
    pub fn top_channel(&self) -> Option<TChannel> {
        self.top.upgrade().map(TChannel::from_inner)
    }

    /// The peers this sub-channel sends to.
    #[must_use]
    pub fn peers(&self) -> SubChannelPeers<'_> {
        SubChannelPeers { sub_channel: self }
    }

    /// Serves `operation` of this service with `handler`.
    ///
    /// A later registration for the same operation replaces the handler.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tchannel::channel::{ChannelConfig, OutgoingResponse, SubChannelOptions, TChannel, handler_fn};
    /// use tchannel::transport::MemoryNetwork;
    ///
    /// # fn main() -> Result<(), tchannel::TChannelError> {
    /// let channel = TChannel::new(ChannelConfig::new("server"), Arc::new(MemoryNetwork::new()))?;
    /// let server = channel.make_sub_channel(SubChannelOptions::new("server"))?;
    /// server.register("echo", handler_fn(|request| async move {
    ///     Ok(OutgoingResponse::ok(request.arg2, request.arg3))
    /// }));
    /// # Ok(())
    /// # }
    /// ```
    pub fn register<H: RequestHandler>(&self, operation: &str, handler: H) {
        let _replaced = self
            .context
            .handlers
            .register(&self.service_name, operation, Arc::new(handler));
        #[cfg(feature = "observability")]
        debug!(
            service = %self.service_name,
            operation,
            replaced = _replaced,
            "registered handler"
        );
    }

    /// Prepares a request to this service.
    pub fn request(&self, options: RequestOptions) -> OutgoingRequest {
        let candidates = self.peers.lock().iter().cloned().collect();
        OutgoingRequest::new(
            Arc::clone(&self.context),
            self.service_name.clone(),
            candidates,
            &self.defaults,
            options,
        )
    }
}

impl fmt::Debug for SubChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubChannel")
            .field("service_name", &self.service_name)
            .field("defaults", &self.defaults)
            .field("peers", &*self.peers.lock())
            .finish()
    }
}

/// The peers of a [`SubChannel`], backed by the top channel's registry.
#[derive(Clone, Copy)]
pub struct SubChannelPeers<'a> {
    sub_channel: &'a SubChannel,
}

impl SubChannelPeers<'_> {
    /// Adds `host_port` to the sub-channel and pins it in the channel
    /// registry.
    pub fn add(&self, host_port: &str) -> Arc<Peer> {
        let peer = self.sub_channel.context.peers.add(host_port);
        self.sub_channel.peers.lock().insert(host_port.to_string());
        peer
    }

    /// Looks up a peer known to the sub-channel.
    #[must_use]
    pub fn get(&self, host_port: &str) -> Option<Arc<Peer>> {
        if !self.sub_channel.peers.lock().contains(host_port) {
            return None;
        }
        self.sub_channel.context.peers.get(host_port)
    }

    /// Peers known to the sub-channel and still registered.
    #[must_use]
    pub fn values(&self) -> Vec<Arc<Peer>> {
        self.host_ports()
            .iter()
            .filter_map(|host_port| self.sub_channel.context.peers.get(host_port))
            .collect()
    }

    /// Addresses known to the sub-channel.
    #[must_use]
    pub fn host_ports(&self) -> Vec<String> {
        self.sub_channel.peers.lock().iter().cloned().collect()
    }

    /// Number of addresses known to the sub-channel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_channel.peers.lock().len()
    }

    /// Returns `true` if the sub-channel knows no peers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_channel.peers.lock().is_empty()
    }
}

impl fmt::Debug for SubChannelPeers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.host_ports()).finish()
    }
}
