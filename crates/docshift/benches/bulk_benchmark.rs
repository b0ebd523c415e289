//! Benchmarks for bulk assembly and per-page transforms.
//!
//! Run with: cargo bench -p docshift

#![allow(clippy::pedantic)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::collections::HashMap;

use docshift::bulk::{BulkAction, BulkRequest, BulkResponse, BulkTarget};
use docshift::{DocumentTransform, FieldMapper, Hit};

fn sample_hits(count: usize) -> Vec<Hit> {
    (0..count)
        .map(|i| {
            Hit::new(
                format!("doc-{}", i),
                json!({
                    "title": format!("Document {}", i),
                    "body": "lorem ipsum dolor sit amet ".repeat(8),
                    "tags": ["a", "b", "c"],
                    "views": i,
                }),
            )
        })
        .collect()
}

/// Benchmark NDJSON encoding of one page
fn bench_bulk_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_encode_by_page_size");
    for size in [10, 100, 1000] {
        let hits = sample_hits(size);
        group.bench_with_input(BenchmarkId::new("page_size", size), &hits, |b, hits| {
            b.iter(|| {
                let mut request = BulkRequest::new();
                for hit in hits {
                    let target = BulkTarget {
                        index: "dst",
                        doc_type: "doc",
                        id: Some(&hit.id),
                    };
                    request
                        .push(BulkAction::Create, &target, &hit.source)
                        .expect("encode");
                }
                black_box(request.into_body())
            })
        });
    }
    group.finish();
}

/// Benchmark decoding a bulk response with partial failures
fn bench_bulk_response_decode(c: &mut Criterion) {
    let items: Vec<_> = (0..1000)
        .map(|i| {
            if i % 10 == 0 {
                json!({"create": {"_index": "dst", "_id": format!("doc-{}", i), "status": 409,
                    "error": {"type": "version_conflict_engine_exception", "reason": "exists"}}})
            } else {
                json!({"create": {"_index": "dst", "_id": format!("doc-{}", i), "status": 201,
                    "result": "created"}})
            }
        })
        .collect();
    let raw = json!({"took": 12, "errors": true, "items": items}).to_string();

    c.bench_function("bulk_response_decode_1000", |b| {
        b.iter(|| {
            let response: BulkResponse = serde_json::from_str(&raw).expect("decode");
            black_box(response.failed_items().count())
        })
    });
}

/// Benchmark a page-wide concurrent field rename
fn bench_page_transform(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mapper = FieldMapper::new(HashMap::from([
        ("title".to_string(), "name".to_string()),
        ("views".to_string(), "view_count".to_string()),
    ]));
    let hits = sample_hits(1000);

    c.bench_function("field_mapper_page_1000", |b| {
        b.to_async(&runtime).iter(|| async {
            let out = futures::future::try_join_all(
                hits.iter().cloned().map(|hit| mapper.transform(hit)),
            )
            .await
            .expect("transform");
            black_box(out)
        })
    });
}

criterion_group!(
    benches,
    bench_bulk_encode,
    bench_bulk_response_decode,
    bench_page_transform
);
criterion_main!(benches);
