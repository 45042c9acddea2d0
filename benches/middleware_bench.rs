use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use hello_api::middleware::rate_limit::{ManualClock, RateLimitStore, RateLimiter};
use hello_api::response::ApiResponse;
use hello_api::validation::schemas;
use serde_json::json;
use std::hint::black_box;
use tokio::runtime::Runtime;

fn benchmark_validation(c: &mut Criterion) {
    let create_user = schemas::create_user();
    let valid = json!({ "name": "  Ada Lovelace ", "email": "ada@example.com", "avatar": "https://example.com/a.png" });
    let invalid = json!({ "name": "", "email": "nope", "role": "admin" });
    let empty = json!({});

    let mut group = c.benchmark_group("validation");
    group.bench_function("create_user_valid", |b| {
        b.iter(|| black_box(create_user.validate(Some(black_box(&valid)), &empty, &empty)))
    });
    group.bench_function("create_user_invalid", |b| {
        b.iter(|| black_box(create_user.validate(Some(black_box(&invalid)), &empty, &empty)))
    });

    let list_users = schemas::list_users();
    let query = json!({ "page": "3", "limit": "25" });
    group.bench_function("pagination_query", |b| {
        b.iter(|| black_box(list_users.validate(None, black_box(&query), &empty)))
    });
    group.finish();
}

fn benchmark_rate_limit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("rate_limit");

    for clients in [1usize, 100, 10_000] {
        let store = RateLimitStore::with_clock(ManualClock::new(0));
        let limiter = RateLimiter::custom(store, u32::MAX, 60_000);
        let ids: Vec<String> = (0..clients).map(|i| format!("10.0.{}.{}", i / 256, i % 256)).collect();
        let mut next = 0usize;

        group.bench_with_input(BenchmarkId::new("check", clients), &clients, |b, _| {
            b.iter(|| {
                next = (next + 1) % ids.len();
                rt.block_on(limiter.check(black_box(&ids[next])))
            })
        });
    }
    group.finish();
}

fn benchmark_envelope(c: &mut Criterion) {
    let users: Vec<_> = (0..10).map(|i| json!({ "id": i, "name": format!("user{}", i) })).collect();
    c.bench_function("envelope_paginated_serialize", |b| {
        b.iter(|| {
            let res = ApiResponse::success("Users retrieved", Some(json!(users)), None).with_pagination(2, 10, 25);
            black_box(serde_json::to_vec(&res).unwrap())
        })
    });
}

criterion_group!(benches, benchmark_validation, benchmark_rate_limit, benchmark_envelope);
criterion_main!(benches);
