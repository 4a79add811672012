//! Latency benchmarks for tchannel
//!
//! Measures request round-trip latency over the in-process network:
//! - Echo round trip with different payload sizes
//! - Echo round trip while the server drains with the service exempt

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::sync::Arc;
use tchannel::channel::{
    ChannelConfig, OutgoingResponse, SubChannel, SubChannelOptions, TChannel, handler_fn,
};
use tchannel::connection::DrainOptions;
use tchannel::request::{RequestOptions, RetryFlags};
use tchannel::transport::MemoryNetwork;

struct Pair {
    server: TChannel,
    _client: TChannel,
    sub: Arc<SubChannel>,
}

fn echo_pair(network: &MemoryNetwork) -> Pair {
    let server = TChannel::new(ChannelConfig::new("server"), Arc::new(network.clone())).unwrap();
    let host_port = server
        .listen(network.bind("127.0.0.1:0").unwrap())
        .unwrap();
    server
        .make_sub_channel(SubChannelOptions::new("bench"))
        .unwrap()
        .register(
            "echo",
            handler_fn(|request| async move { Ok(OutgoingResponse::ok(request.arg2, request.arg3)) }),
        );

    let client = TChannel::new(ChannelConfig::new("client"), Arc::new(network.clone())).unwrap();
    let sub = client
        .make_sub_channel(SubChannelOptions::new("bench").with_peer(host_port))
        .unwrap();
    Pair {
        server,
        _client: client,
        sub,
    }
}

/// Benchmark echo round trip latency
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_round_trip");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for size in [16usize, 1024, 16384] {
        let pair = rt.block_on(async { echo_pair(&MemoryNetwork::new()) });
        let payload = vec![7u8; size];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{size}bytes")),
            &payload,
            |b, payload| {
                b.to_async(&rt).iter(|| async {
                    pair.sub
                        .request(RequestOptions::new().with_retry_flags(RetryFlags::never()))
                        .send("echo", "", payload.clone())
                        .await
                        .unwrap()
                });
            },
        );
    }
    group.finish();
}

/// Benchmark exempt traffic through a draining server
fn bench_exempt_while_draining(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let pair = rt.block_on(async {
        let pair = echo_pair(&MemoryNetwork::new());
        pair.sub
            .request(RequestOptions::new())
            .send("echo", "", "warmup")
            .await
            .unwrap();
        pair.server.set_drain_exempt(|request| request.service == "bench");
        pair.server.drain(DrainOptions::new("bench")).await;
        pair
    });

    c.bench_function("latency_exempt_while_draining", |b| {
        b.to_async(&rt).iter(|| async {
            pair.sub
                .request(RequestOptions::new().with_retry_flags(RetryFlags::never()))
                .send("echo", "", "mess1")
                .await
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_round_trip, bench_exempt_while_draining);
criterion_main!(benches);
