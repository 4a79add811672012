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

//! Shared fixtures for integration tests.
//!
//! A [`Cluster`] is a server channel and a client channel, both listening on
//! one in-process network. Echo handlers wait on a gate so tests decide when
//! in-flight requests complete.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tchannel::channel::{
    ChannelConfig, OutgoingResponse, RequestDefaults, SubChannel, SubChannelOptions, TChannel,
    handler_fn,
};
use tchannel::observability::EventRecorder;
use tchannel::peer::{Peer, PeerEvent};
use tchannel::request::RetryFlags;
use tchannel::transport::MemoryNetwork;
use tokio::sync::{broadcast, mpsc, watch};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(3);

pub struct Cluster {
    pub network: MemoryNetwork,
    pub server: TChannel,
    pub server_host_port: String,
    pub server_events: EventRecorder,
    pub client: TChannel,
    pub client_host_port: String,
    pub client_events: EventRecorder,
}

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl Cluster {
    pub fn new() -> Self {
        let network = MemoryNetwork::new();
        let (server, server_host_port, server_events) = listening(&network, "server");
        let (client, client_host_port, client_events) = listening(&network, "client");
        Self {
            network,
            server,
            server_host_port,
            server_events,
            client,
            client_host_port,
            client_events,
        }
    }

    /// Client sub-channels for `services`, identified with the server.
    pub async fn clients(&self, services: &[&str]) -> Vec<Arc<SubChannel>> {
        let clients = services
            .iter()
            .map(|service| service_client(&self.client, service, &self.server_host_port))
            .collect();
        self.client
            .peers()
            .add(&self.server_host_port)
            .wait_for_identified()
            .await
            .expect("client identified with server");
        clients
    }

    /// The server's peer for the client, once its connection is attached.
    pub async fn server_peer(&self) -> Arc<Peer> {
        within(async {
            loop {
                if let Some(peer) = self.server.peers().get(&self.client_host_port) {
                    if peer.connection_count() > 0 {
                        return peer;
                    }
                }
                tokio::task::yield_now().await;
            }
        })
        .await
    }

    /// The client's peer for the server.
    pub fn client_peer(&self) -> Arc<Peer> {
        self.client
            .peers()
            .get(&self.server_host_port)
            .expect("client knows the server")
    }

    /// Subscribes to the peer events of every peer of both channels.
    pub fn removals(&self) -> Removals {
        let receivers = self
            .server
            .peers()
            .values()
            .into_iter()
            .chain(self.client.peers().values())
            .map(|peer| peer.subscribe())
            .collect();
        Removals { receivers }
    }
}

/// A channel named `name` listening on `network`, with an event recorder.
pub fn listening(network: &MemoryNetwork, name: &str) -> (TChannel, String, EventRecorder) {
    init_tracing();
    let channel = TChannel::new(ChannelConfig::new(name), Arc::new(network.clone()))
        .expect("valid config");
    let host_port = channel
        .listen(network.bind("127.0.0.1:0").expect("free port"))
        .expect("listening");
    let events = EventRecorder::new();
    channel.add_observer(Arc::new(events.clone()));
    (channel, host_port, events)
}

/// A sub-channel calling `service` that never retries.
pub fn service_client(channel: &TChannel, service: &str, server: &str) -> Arc<SubChannel> {
    let defaults = RequestDefaults::new()
        .with_timeout(Duration::from_secs(1))
        .with_retry_flags(RetryFlags::never())
        .with_header("as", "raw")
        .with_header("cn", format!("{service}Client"));
    channel
        .make_sub_channel(
            SubChannelOptions::new(service)
                .with_request_defaults(defaults)
                .with_peer(server),
        )
        .expect("valid sub-channel")
}

/// Controls when gated echo handlers answer.
pub struct Gate {
    open: watch::Sender<bool>,
    started: mpsc::UnboundedReceiver<String>,
    started_tx: mpsc::UnboundedSender<String>,
}

impl Gate {
    pub fn new() -> Self {
        let (open, _) = watch::channel(false);
        let (started_tx, started) = mpsc::unbounded_channel();
        Self {
            open,
            started,
            started_tx,
        }
    }

    /// Registers a gated `echo` handler for `service` on `channel`.
    pub fn serve(&self, channel: &TChannel, service: &str) {
        let gate = self.open.subscribe();
        let started = self.started_tx.clone();
        channel
            .make_sub_channel(SubChannelOptions::new(service))
            .expect("valid sub-channel")
            .register(
                "echo",
                handler_fn(move |request| {
                    let mut gate = gate.clone();
                    let started = started.clone();
                    async move {
                        let _ = started.send(String::from_utf8_lossy(&request.arg3).into_owned());
                        while !*gate.borrow_and_update() {
                            if gate.changed().await.is_err() {
                                break;
                            }
                        }
                        Ok(OutgoingResponse::ok(request.arg2, request.arg3).with_header("as", "raw"))
                    }
                }),
            );
    }

    /// Waits until a handler received a request with body `arg3`.
    pub async fn started(&mut self, arg3: &str) {
        within(async {
            loop {
                match self.started.recv().await {
                    Some(body) if body == arg3 => return,
                    Some(_) => {}
                    None => panic!("gate dropped"),
                }
            }
        })
        .await;
    }

    /// Lets every waiting and future handler answer.
    pub fn open(&self) {
        self.open.send_replace(true);
    }
}

/// Peer event receivers collected before a close.
pub struct Removals {
    receivers: Vec<broadcast::Receiver<PeerEvent>>,
}

impl Removals {
    /// Waits for `count` connection removals across all receivers.
    pub async fn wait(mut self, count: usize) {
        within(async {
            let mut seen = 0;
            while seen < count {
                for receiver in &mut self.receivers {
                    while let Ok(event) = receiver.try_recv() {
                        if event.is_removal() {
                            seen += 1;
                        }
                    }
                }
                tokio::task::yield_now().await;
            }
        })
        .await;
    }
}

/// Fails the test if `future` takes longer than [`WAIT`].
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("completed in time")
}
