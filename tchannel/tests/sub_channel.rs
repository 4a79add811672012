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

//! Sub-channels and Hyperbahn client channels.

mod common;

use common::{listening, within};
use std::sync::Arc;
use tchannel::channel::{OutgoingResponse, RequestDefaults, SubChannelOptions, handler_fn};
use tchannel::hyperbahn::{ClientChannelOptions, HyperbahnClient, HyperbahnClientOptions};
use tchannel::request::RequestOptions;
use tchannel::transport::MemoryNetwork;
use tchannel::{ChannelState, TChannelError};

#[tokio::test]
async fn test_sub_channels_share_the_top_channel_peers() {
    let network = MemoryNetwork::new();
    let (channel, _, _) = listening(&network, "client");

    let a = channel
        .make_sub_channel(SubChannelOptions::new("a").with_peer("127.0.0.1:4040"))
        .unwrap();
    let b = channel
        .make_sub_channel(SubChannelOptions::new("b").with_peer("127.0.0.1:4041"))
        .unwrap();

    assert_eq!(a.peers().host_ports(), ["127.0.0.1:4040"]);
    assert_eq!(b.peers().host_ports(), ["127.0.0.1:4041"]);
    assert_eq!(channel.peers().len(), 2);
    assert!(a.peers().get("127.0.0.1:4041").is_none());
    assert!(Arc::ptr_eq(
        &a.peers().get("127.0.0.1:4040").unwrap(),
        &channel.peers().get("127.0.0.1:4040").unwrap()
    ));
    assert!(a.top_channel().unwrap().ptr_eq(&channel));
    assert!(Arc::ptr_eq(&channel.sub_channel("a").unwrap(), &a));
}

#[tokio::test]
async fn test_make_sub_channel_validates_and_memoizes() {
    let network = MemoryNetwork::new();
    let (channel, _, _) = listening(&network, "client");

    let error = channel
        .make_sub_channel(SubChannelOptions::default())
        .unwrap_err();
    assert_eq!(error, TChannelError::invalid_argument("must pass serviceName"));

    let first = channel
        .make_sub_channel(SubChannelOptions::new("svc"))
        .unwrap();
    let second = channel
        .make_sub_channel(SubChannelOptions::new("svc").with_peer("127.0.0.1:4040"))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.peers().len(), 1);

    channel.close().unwrap();
    assert_eq!(channel.state(), ChannelState::Closed);
    let error = channel
        .make_sub_channel(SubChannelOptions::new("other"))
        .unwrap_err();
    assert_eq!(error, TChannelError::Closed);
}

#[tokio::test]
async fn test_hyperbahn_client_channel_calls_through_router() {
    let network = MemoryNetwork::new();
    let (router, router_host_port, _) = listening(&network, "router");
    router
        .make_sub_channel(SubChannelOptions::new("hello-bob"))
        .unwrap()
        .register(
            "hello",
            handler_fn(|request| async move {
                let caller = request.headers.get("cn").cloned().unwrap_or_default();
                Ok(OutgoingResponse::ok("", format!("hello {caller}")))
            }),
        );

    let (channel, _, _) = listening(&network, "hello-alice");
    let hyperbahn = HyperbahnClient::new(
        channel.clone(),
        HyperbahnClientOptions::new("hello-alice", "hello-alice").with_router(router_host_port),
    )
    .unwrap();

    let error = hyperbahn
        .get_client_channel(ClientChannelOptions::default())
        .unwrap_err();
    assert!(error.is_invalid_argument());
    assert_eq!(error.to_string(), "invalid argument: must pass serviceName");

    let bob = hyperbahn
        .get_client_channel(
            ClientChannelOptions::new("hello-bob").with_request_defaults(RequestDefaults::new()),
        )
        .unwrap();
    assert!(bob.top_channel().unwrap().ptr_eq(&channel));
    assert_eq!(bob.peers().host_ports(), hyperbahn.routers());

    let response = within(bob.request(RequestOptions::new()).send("hello", "", ""))
        .await
        .unwrap();
    assert_eq!(response.arg3_str(), "hello hello-alice");
}
