//! Benchmarks for the search pipeline.
//!
//! Measures the ranker alone and the full fetch-score-sort-truncate path
//! over seeded in-memory stores of increasing size.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::print_stderr)]

use chrono::{DateTime, Duration, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lectern::storage::{NewApp, NewBlogPost, NewWebinar};
use lectern::{
    AppStage, ContentKind, ContentStore, PublishStatus, SearchHit, SearchRequest, SearchService,
    SqliteStore, StatusSignal, score,
};
use std::hint::black_box;
use std::sync::Arc;

fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_750_000_000, 0).unwrap()
}

/// Seeds a store with `rows` items per kind, a third of them matching
/// "coding" in a text column.
fn seeded_store(rows: usize) -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    let now = fixed_now();

    for i in 0..rows {
        let topic = if i % 3 == 0 { "coding" } else { "sampling" };

        store
            .add_blog_post(
                &NewBlogPost::new(
                    format!("Post {i} on {topic}"),
                    format!("post-{i}"),
                    format!("Long-form notes about {topic} practice."),
                )
                .with_status(PublishStatus::Published)
                .with_created_at(now - Duration::days((i % 120) as i64)),
            )
            .expect("insert post");

        store
            .add_webinar(
                &NewWebinar::new(format!("Webinar {i}"))
                    .with_description(format!("A session about {topic}."))
                    .with_created_at(now - Duration::days((i % 120) as i64)),
            )
            .expect("insert webinar");

        store
            .add_app(
                &NewApp::new(format!("App {i}"))
                    .with_description(format!("Helps with {topic} workflows."))
                    .with_stage(AppStage::Beta)
                    .with_created_at(now - Duration::days((i % 120) as i64)),
            )
            .expect("insert app");
    }

    store
}

fn bench_ranker(c: &mut Criterion) {
    let now = fixed_now();
    let hit = SearchHit::new(
        1,
        ContentKind::Blog,
        "Qualitative coding basics",
        now - Duration::days(3),
        StatusSignal::publication("published"),
    )
    .with_excerpt("A practical walkthrough of qualitative coding.");

    c.bench_function("score_single_hit", |b| {
        b.iter(|| score(black_box(&hit), black_box("qualitative coding"), now));
    });
}

fn bench_search_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_pipeline");

    for rows in [100usize, 1_000] {
        let service = SearchService::new(
            Arc::new(seeded_store(rows)) as Arc<dyn ContentStore>
        );
        let request = SearchRequest::new("coding").with_limit(10);

        group.bench_with_input(
            BenchmarkId::from_parameter(rows),
            &request,
            |b, request| {
                b.iter(|| service.search(black_box(request)).expect("search"));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ranker, bench_search_pipeline);
criterion_main!(benches);
