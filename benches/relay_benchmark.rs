//! Performance benchmarks for cache-relay
//!
//! This benchmark suite measures:
//! - Request classification
//! - Cache store operations (put, get hit/miss) across payload sizes
//! - End-to-end Cache-First hits and Network-First fetches
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use cache_relay::backend::InMemoryBackend;
use cache_relay::origin::InMemoryOrigin;
use cache_relay::strategy::classify;
use cache_relay::{
    CacheEntry, CacheStore, LifecycleController, RelayConfig, Request, RequestKey, Response,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

// ============================================================================
// Group 1: Classification
// ============================================================================

fn classification_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let prefixes = vec!["/api/".to_string(), "/graphql".to_string()];

    let requests = [
        ("document", Request::navigate("https://example.com/docs/intro").expect("request")),
        ("dynamic", Request::get("https://example.com/api/items?page=2").expect("request")),
        ("static", Request::get("https://example.com/assets/app.js").expect("request")),
    ];

    for (name, request) in requests.iter() {
        group.bench_function(*name, |b| {
            b.iter(|| classify(black_box(request), black_box(&prefixes)))
        });
    }

    group.bench_function("request_key", |b| {
        let request = Request::get("https://example.com/calc?x=1&y=2").expect("request");
        b.iter(|| RequestKey::from_request(black_box(&request)))
    });

    group.finish();
}

// ============================================================================
// Group 2: Cache Store
// ============================================================================

fn store_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_store");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    let key = RequestKey::from_request(&Request::get("https://example.com/app.js").expect("request"));

    for size in [100, 1_000, 10_000, 100_000].iter() {
        let entry = CacheEntry::from_response(&Response::ok(vec![1u8; *size])).expect("entry");

        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("put", size), &entry, |b, entry| {
                let store = CacheStore::new(InMemoryBackend::new());
                store.open("app-v1.0.0");

                b.to_async(&rt).iter(|| async {
                    store
                        .put("app-v1.0.0", black_box(&key), black_box(entry))
                        .await
                        .expect("Failed to put")
                });
            });

        group
            .throughput(Throughput::Bytes(*size as u64))
            .bench_with_input(BenchmarkId::new("get_hit", size), &entry, |b, entry| {
                let store = CacheStore::new(InMemoryBackend::new());
                store.open("app-v1.0.0");
                rt.block_on(async {
                    store
                        .put("app-v1.0.0", &key, entry)
                        .await
                        .expect("Failed to put");
                });

                b.to_async(&rt)
                    .iter(|| async { store.get("app-v1.0.0", black_box(&key)).await });
            });
    }

    group.bench_function("get_miss", |b| {
        let store = CacheStore::new(InMemoryBackend::new());
        store.open("app-v1.0.0");

        b.to_async(&rt)
            .iter(|| async { store.get("app-v1.0.0", black_box(&key)).await });
    });

    group.finish();
}

// ============================================================================
// Group 3: End-to-end relay
// ============================================================================

fn relay_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("relay");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    let origin = InMemoryOrigin::new();
    origin.insert("https://example.com/", Response::ok("<h1>home</h1>"));
    origin.insert("https://example.com/offline.html", Response::ok("offline"));
    origin.insert("https://example.com/app.js", Response::ok(vec![b'x'; 10_000]));
    origin.insert("https://example.com/api/items", Response::ok("[1,2,3]"));

    let config = RelayConfig::default()
        .with_scope("https://example.com/")
        .with_precache(["/", "/app.js", "/offline.html"]);
    let relay = LifecycleController::new(config, CacheStore::new(InMemoryBackend::new()), origin)
        .expect("Failed to create controller");
    rt.block_on(async {
        relay.install().await.expect("Failed to install");
        relay.activate().await.expect("Failed to activate");
    });

    let asset = Request::get("https://example.com/app.js").expect("request");
    group.bench_function("cache_first_hit", |b| {
        b.to_async(&rt).iter(|| async {
            let served = relay.fetch(black_box(&asset)).await;
            relay.wait_for_refreshes().await;
            served
        });
    });

    let api = Request::get("https://example.com/api/items").expect("request");
    group.bench_function("network_first_online", |b| {
        b.to_async(&rt)
            .iter(|| async { relay.fetch(black_box(&api)).await });
    });

    group.finish();
}

criterion_group!(
    benches,
    classification_benchmarks,
    store_benchmarks,
    relay_benchmarks
);
criterion_main!(benches);
