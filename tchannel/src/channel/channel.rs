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

//! The top-level channel.

use crate::channel::{ChannelConfig, ChannelContext, SubChannel, SubChannelOptions};
use crate::connection::{DrainOptions, RequestView};
use crate::error::TChannelError;
use crate::observability::{ChannelMetrics, EventObserver};
use crate::peer::PeerRegistry;
use crate::transport::{Connector, Listener};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[cfg(feature = "observability")]
use tracing::{debug, info};

/// Lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Serving requests.
    Open,
    /// Told to drain; non-exempt work is refused.
    Draining,
    /// Closed; every connection was reset.
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

pub(crate) struct ChannelInner {
    pub(crate) context: Arc<ChannelContext>,
    sub_channels: Mutex<HashMap<String, Arc<SubChannel>>>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.get_mut().take() {
            task.abort();
        }
    }
}

/// A process-level RPC endpoint.
///
/// A channel owns the peer registry, the handler registry, the drain
/// exemption predicate and one [`SubChannel`] per service name. Handles are
/// cheap to clone and share the same state.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use tchannel::channel::{ChannelConfig, ChannelState, SubChannelOptions, TChannel};
/// use tchannel::transport::MemoryNetwork;
///
/// # fn main() -> Result<(), tchannel::TChannelError> {
/// let network = MemoryNetwork::new();
/// let channel = TChannel::new(ChannelConfig::new("client"), Arc::new(network))?;
///
/// let server = channel.make_sub_channel(SubChannelOptions::new("server"))?;
/// let again = channel.make_sub_channel(SubChannelOptions::new("server"))?;
/// assert!(Arc::ptr_eq(&server, &again));
///
/// let error = channel.make_sub_channel(SubChannelOptions::default()).unwrap_err();
/// assert_eq!(error.to_string(), "invalid argument: must pass serviceName");
///
/// channel.close()?;
/// assert_eq!(channel.state(), ChannelState::Closed);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TChannel {
    inner: Arc<ChannelInner>,
}

impl TChannel {
    /// Creates a channel that opens outgoing links through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::InvalidArgument`] if `config` does not
    /// validate.
    pub fn new(config: ChannelConfig, connector: Arc<dyn Connector>) -> Result<Self, TChannelError> {
        config.validate().map_err(TChannelError::invalid_argument)?;
        Ok(Self {
            inner: Arc::new(ChannelInner {
                context: ChannelContext::new(config, connector),
                sub_channels: Mutex::new(HashMap::new()),
                accept_task: Mutex::new(None),
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<ChannelInner>) -> Self {
        Self { inner }
    }

    /// Serves links accepted by `listener`.
    ///
    /// The listener's address becomes the `host:port` this channel announces
    /// during identification. Listening again replaces the previous listener.
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::Closed`] on a closed channel, or the
    /// listener's error if its address is unknown.
    pub fn listen<L: Listener>(&self, listener: L) -> Result<String, TChannelError> {
        let context = &self.inner.context;
        if context.is_closed() {
            return Err(TChannelError::Closed);
        }
        let host_port = listener.local_addr()?;
        context.set_host_port(&host_port);

        #[cfg(feature = "observability")]
        info!(%host_port, process_name = %context.config().process_name, "listening");

        let weak = Arc::downgrade(context);
        let task = tokio::spawn(async move {
            loop {
                let link = match listener.accept().await {
                    Ok(link) => link,
                    Err(_error) => {
                        #[cfg(feature = "observability")]
                        debug!(error = %_error, "accept loop stopped");
                        break;
                    }
                };
                let Some(context) = weak.upgrade() else {
                    break;
                };
                context.accept(link);
            }
        });
        if let Some(previous) = self.inner.accept_task.lock().replace(task) {
            previous.abort();
        }
        Ok(host_port)
    }

    /// Returns the sub-channel for `options.service_name`, creating it once.
    ///
    /// Later calls with the same name return the same instance; their
    /// request defaults are ignored but their peers are added.
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::InvalidArgument`] with message
    /// `"must pass serviceName"` when the name is missing or empty, and
    /// [`TChannelError::Closed`] on a closed channel.
    pub fn make_sub_channel(
        &self,
        options: SubChannelOptions,
    ) -> Result<Arc<SubChannel>, TChannelError> {
        let service_name = match options.service_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(TChannelError::invalid_argument("must pass serviceName")),
        };
        let context = &self.inner.context;
        if context.is_closed() {
            return Err(TChannelError::Closed);
        }
        let defaults = match options.request_defaults {
            Some(defaults) => {
                defaults.validate().map_err(TChannelError::invalid_argument)?;
                defaults
            }
            None => context.config().request_defaults.clone(),
        };

        let sub_channel = {
            let mut sub_channels = self.inner.sub_channels.lock();
            let entry = sub_channels.entry(service_name.clone()).or_insert_with(|| {
                #[cfg(feature = "observability")]
                debug!(service = %service_name, "creating sub-channel");
                Arc::new(SubChannel::new(
                    service_name,
                    defaults,
                    Arc::clone(context),
                    Arc::downgrade(&self.inner),
                ))
            });
            Arc::clone(entry)
        };
        for host_port in &options.peers {
            sub_channel.peers().add(host_port);
        }
        Ok(sub_channel)
    }

    /// Looks up an existing sub-channel.
    #[must_use]
    pub fn sub_channel(&self, service_name: &str) -> Option<Arc<SubChannel>> {
        self.inner.sub_channels.lock().get(service_name).cloned()
    }

    /// Installs the predicate deciding which requests keep flowing through
    /// draining connections.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tchannel::channel::{ChannelConfig, TChannel};
    /// use tchannel::transport::MemoryNetwork;
    ///
    /// # fn main() -> Result<(), tchannel::TChannelError> {
    /// let channel = TChannel::new(ChannelConfig::new("server"), Arc::new(MemoryNetwork::new()))?;
    /// channel.set_drain_exempt(|request| request.service == "b");
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_drain_exempt<F>(&self, predicate: F)
    where
        F: Fn(&RequestView<'_>) -> bool + Send + Sync + 'static,
    {
        self.inner.context.exempt.set(predicate);
    }

    /// Removes the drain exemption predicate; nothing is exempt afterwards.
    pub fn clear_drain_exempt(&self) {
        self.inner.context.exempt.clear();
    }

    /// Registers an observer for this channel's events.
    pub fn add_observer(&self, observer: Arc<dyn EventObserver>) {
        self.inner.context.events.subscribe(observer);
    }

    /// Counters of this channel's events.
    #[must_use]
    pub fn metrics(&self) -> &ChannelMetrics {
        self.inner.context.events.metrics()
    }

    /// Drains every peer.
    ///
    /// The drain takes effect before this returns, including on incoming
    /// connections identified later. The returned future resolves once the
    /// non-exempt work pending on all peers at the time of the call
    /// completed. A closed channel resolves immediately.
    pub fn drain(&self, options: DrainOptions) -> impl Future<Output = ()> + Send + 'static {
        let context = &self.inner.context;
        let drains: Vec<_> = match context.begin_drain(options.reason()) {
            Some(reason) => context
                .peers
                .values()
                .into_iter()
                .map(|peer| peer.drain(DrainOptions::new(reason.clone())))
                .collect(),
            None => Vec::new(),
        };
        async move {
            for drain in drains {
                drain.await;
            }
        }
    }

    /// Closes the channel.
    ///
    /// Stops accepting, resets every connection as a local close and empties
    /// the peer registry. Pending outgoing requests fail with `LocalReset`.
    ///
    /// # Errors
    ///
    /// Returns [`TChannelError::Closed`] if the channel was already closed.
    pub fn close(&self) -> Result<(), TChannelError> {
        let context = &self.inner.context;
        if !context.mark_closed() {
            return Err(TChannelError::Closed);
        }
        #[cfg(feature = "observability")]
        info!(process_name = %context.config().process_name, "closing channel");

        if let Some(task) = self.inner.accept_task.lock().take() {
            task.abort();
        }
        for peer in context.peers.clear() {
            peer.close("channel closed");
        }
        context.reset_unidentified("channel closed");
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.inner.context.state()
    }

    /// Address this channel listens on, once listening.
    #[must_use]
    pub fn host_port(&self) -> Option<String> {
        let identity = self.inner.context.identity();
        (!identity.is_ephemeral()).then(|| identity.host_port().to_string())
    }

    /// Name announced during identification.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.inner.context.config().process_name
    }

    /// The configuration the channel was built with.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        self.inner.context.config()
    }

    /// All peers of the channel.
    #[must_use]
    pub fn peers(&self) -> &PeerRegistry {
        &self.inner.context.peers
    }

    /// Returns `true` if both handles refer to the same channel.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TChannel")
            .field("process_name", &self.process_name())
            .field("host_port", &self.host_port())
            .field("state", &self.state())
            .field("peers", &self.peers().len())
            .finish()
    }
}
