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

//! Outgoing request lifecycle across channels.

mod common;

use common::{Cluster, Gate, listening, service_client, within};
use std::sync::Arc;
use std::time::Duration;
use tchannel::channel::{HandlerError, SubChannelOptions};
use tchannel::connection::DrainOptions;
use tchannel::request::{RequestOptions, RetryFlags};
use tchannel::transport::MemoryNetwork;

#[tokio::test]
async fn test_echo_round_trip() {
    let cluster = Cluster::new();
    let gate = Gate::new();
    gate.serve(&cluster.server, "server");
    gate.open();
    let client = cluster.clients(&["server"]).await.remove(0);

    let response = client
        .request(RequestOptions::new())
        .send("echo", "head", "mess1")
        .await
        .unwrap();
    assert!(response.ok);
    assert_eq!(response.arg2_str(), "head");
    assert_eq!(response.arg3_str(), "mess1");
    assert_eq!(response.headers.get("as").map(String::as_str), Some("raw"));
    assert_eq!(cluster.client_peer().pending_count(), 0);
}

#[tokio::test]
async fn test_handler_errors_reach_the_caller() {
    let cluster = Cluster::new();
    cluster
        .server
        .make_sub_channel(SubChannelOptions::new("server"))
        .unwrap()
        .register(
            "busy",
            tchannel::channel::handler_fn(|_request| async move {
                Err::<tchannel::channel::OutgoingResponse, _>(HandlerError::busy("try later"))
            }),
        );
    let client = cluster.clients(&["server"]).await.remove(0);

    let busy = client
        .request(RequestOptions::new())
        .send("busy", "", "")
        .await
        .unwrap_err();
    assert_eq!(busy.error_type(), "tchannel.busy");

    let missing = client
        .request(RequestOptions::new())
        .send("missing", "", "")
        .await
        .unwrap_err();
    assert_eq!(missing.error_type(), "tchannel.bad-request");
}

#[tokio::test]
async fn test_timeout_fails_request_and_discards_late_response() {
    let cluster = Cluster::new();
    let mut gate = Gate::new();
    gate.serve(&cluster.server, "server");
    let client = cluster.clients(&["server"]).await.remove(0);

    let error = client
        .request(RequestOptions::new().with_timeout(Duration::from_millis(50)))
        .send("echo", "", "slow")
        .await
        .unwrap_err();
    // The handler's time to live expires together with the request timeout.
    assert!(error.is_timeout(), "unexpected {error}");
    assert_eq!(cluster.client_peer().pending_count(), 0);

    // The connection keeps working once the handler answers late.
    gate.started("slow").await;
    gate.open();
    let response = client
        .request(RequestOptions::new())
        .send("echo", "", "fast")
        .await
        .unwrap();
    assert_eq!(response.arg3_str(), "fast");
}

#[tokio::test]
async fn test_declined_request_is_retried_on_another_peer() {
    let network = MemoryNetwork::new();
    let (draining, draining_host_port, _) = listening(&network, "draining");
    let (healthy, healthy_host_port, _) = listening(&network, "healthy");
    let (client, _, client_events) = listening(&network, "client");
    for server in [&draining, &healthy] {
        let gate = Gate::new();
        gate.serve(server, "server");
        gate.open();
    }

    let sub = client
        .make_sub_channel(
            SubChannelOptions::new("server")
                .with_peer(draining_host_port.clone())
                .with_peer(healthy_host_port.clone()),
        )
        .unwrap();
    // Only the draining server has a connection, so it is chosen first.
    client
        .peers()
        .add(&draining_host_port)
        .wait_for_identified()
        .await
        .unwrap();
    within(draining.drain(DrainOptions::new("testdown"))).await;

    let response = sub
        .request(RequestOptions::new())
        .send("echo", "", "mess1")
        .await
        .unwrap();
    assert_eq!(response.arg3_str(), "mess1");
    assert_eq!(client_events.count("request.retried"), 1);
    assert_eq!(client.metrics().requests_retried(), 1);
    assert!(client.peers().get(&healthy_host_port).is_some());
}

#[tokio::test]
async fn test_never_retry_returns_first_error() {
    let network = MemoryNetwork::new();
    let (server, server_host_port, _) = listening(&network, "server");
    let (client, _, client_events) = listening(&network, "client");
    let gate = Gate::new();
    gate.serve(&server, "server");
    within(server.drain(DrainOptions::new("testdown"))).await;

    let sub = service_client(&client, "server", &server_host_port);
    let error = sub
        .request(RequestOptions::new())
        .send("echo", "", "mess1")
        .await
        .unwrap_err();
    assert_eq!(error.error_type(), "tchannel.declined");
    assert_eq!(client_events.count("request.retried"), 0);
}

#[tokio::test]
async fn test_unreachable_and_missing_peers() {
    let network = MemoryNetwork::new();
    let (client, _, _) = listening(&network, "client");

    let nobody = client
        .make_sub_channel(SubChannelOptions::new("nobody"))
        .unwrap();
    let error = nobody
        .request(RequestOptions::new())
        .send("echo", "", "")
        .await
        .unwrap_err();
    assert_eq!(error.error_type(), "tchannel.no-peer-available");

    let error = nobody
        .request(
            RequestOptions::new()
                .with_host("127.0.0.1:1")
                .with_retry_flags(RetryFlags::never()),
        )
        .send("echo", "", "")
        .await
        .unwrap_err();
    assert_eq!(error.error_type(), "tchannel.no-connection-available");
    assert!(client.peers().get("127.0.0.1:1").is_none());
}

#[tokio::test]
async fn test_requests_after_close_fail_locally() {
    let network = MemoryNetwork::new();
    let client = tchannel::TChannel::new(
        tchannel::ChannelConfig::new("client"),
        Arc::new(network.clone()),
    )
    .unwrap();
    let sub = service_client(&client, "server", "127.0.0.1:4040");
    client.close().unwrap();

    let error = sub
        .request(RequestOptions::new())
        .send("echo", "", "")
        .await
        .unwrap_err();
    assert_eq!(error.error_type(), "tchannel.local.reset");
    assert!(client.close().is_err());
}
