//! End-to-end search tests over a real `SQLite` store, plus HTTP API tests
//! for the search routes.
#![allow(
    clippy::panic,
    clippy::too_many_lines,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]

use chrono::{Duration, Utc};
use lectern::storage::{NewApp, NewBlogPost, NewWebinar};
use lectern::{
    AppStage, ContentKind, ContentStore, KindFilters, PublishStatus, SearchRequest, SearchService,
    SqliteStore,
};
use std::sync::Arc;

/// Seeds the store with the cross-kind fixture used by most tests here.
///
/// One published and one draft blog post, an active and an inactive webinar,
/// and a beta app, all mentioning "qualitative research" somewhere.
fn seeded_store() -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    let now = Utc::now();

    store
        .add_blog_post(
            &NewBlogPost::new(
                "Qualitative Research Basics",
                "qualitative-research-basics",
                "A full introduction to designing a qualitative study.",
            )
            .with_status(PublishStatus::Published)
            .with_created_at(now - Duration::days(2)),
        )
        .expect("insert published post");

    store
        .add_blog_post(
            &NewBlogPost::new(
                "Qualitative Research Draft Notes",
                "qualitative-research-draft",
                "Unfinished notes, not yet public.",
            )
            .with_created_at(now - Duration::days(1)),
        )
        .expect("insert draft post");

    store
        .add_webinar(
            &NewWebinar::new("Survey Design Clinic")
                .with_description("Includes a segment on qualitative research questions.")
                .with_created_at(now - Duration::days(60)),
        )
        .expect("insert active webinar");

    store
        .add_webinar(
            &NewWebinar::new("Qualitative Research Retired Session")
                .with_active(false)
                .with_created_at(now - Duration::days(400)),
        )
        .expect("insert inactive webinar");

    store
        .add_app(
            &NewApp::new("Interview Toolkit")
                .with_description("A tool for qualitative research interviews.")
                .with_stage(AppStage::Beta)
                .with_created_at(now - Duration::days(3)),
        )
        .expect("insert beta app");

    store
}

fn service(store: SqliteStore) -> SearchService {
    SearchService::new(Arc::new(store) as Arc<dyn ContentStore>)
}

#[test]
fn test_search_ranks_title_match_above_description_match() {
    let service = service(seeded_store());

    let response = service
        .search(&SearchRequest::new("qualitative research"))
        .expect("search");

    // Blog: title match (10) + recency within 7 days (2) + published (2) = 14.
    // App: description match (5) + recency (2) + beta (2) = 9.
    // Webinar: description match (5) + active (2) = 7, no recency.
    assert_eq!(response.total, 3);
    assert_eq!(response.results[0].hit.title, "Qualitative Research Basics");
    assert_eq!(response.results[0].relevance, 14);
    assert_eq!(response.results[1].hit.title, "Interview Toolkit");
    assert_eq!(response.results[1].relevance, 9);
    assert_eq!(response.results[2].hit.title, "Survey Design Clinic");
    assert_eq!(response.results[2].relevance, 7);
}

#[test]
fn test_search_excludes_drafts_and_inactive_content() {
    let service = service(seeded_store());

    let response = service
        .search(&SearchRequest::new("qualitative"))
        .expect("search");

    let titles: Vec<&str> = response
        .results
        .iter()
        .map(|s| s.hit.title.as_str())
        .collect();
    assert!(!titles.contains(&"Qualitative Research Draft Notes"));
    assert!(!titles.contains(&"Qualitative Research Retired Session"));
}

#[test]
fn test_search_short_query_is_empty_success() {
    let service = service(seeded_store());

    let response = service.search(&SearchRequest::new("q")).expect("search");
    assert_eq!(response.total, 0);
    assert!(response.results.is_empty());

    let response = service.search(&SearchRequest::new("   ")).expect("search");
    assert_eq!(response.total, 0);
}

#[test]
fn test_search_kind_filters_restrict_results() {
    let service = service(seeded_store());

    let filters = KindFilters {
        blogs: false,
        webinars: false,
        apps: true,
    };
    let response = service
        .search(&SearchRequest::new("qualitative").with_filters(filters))
        .expect("search");

    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].hit.kind, ContentKind::App);
    assert_eq!(response.filters, filters);
}

#[test]
fn test_search_limit_truncates_across_kinds() {
    let service = service(seeded_store());

    let response = service
        .search(&SearchRequest::new("qualitative research").with_limit(2))
        .expect("search");

    assert_eq!(response.total, 2);
    // Truncation keeps the top-ranked results
    assert_eq!(response.results[0].hit.title, "Qualitative Research Basics");
    assert_eq!(response.results[1].hit.title, "Interview Toolkit");
}

#[test]
fn test_suggestions_match_public_titles_only() {
    let service = service(seeded_store());

    let suggestions = service.suggest("qualitative").expect("suggest").suggestions;

    assert_eq!(suggestions, vec!["Qualitative Research Basics"]);
}

#[test]
fn test_stats_count_public_content() {
    let service = service(seeded_store());

    let stats = service.stats().expect("stats");
    assert_eq!(stats.total_blogs, 1);
    assert_eq!(stats.total_webinars, 1);
    assert_eq!(stats.total_apps, 1);
    assert_eq!(stats.total_content, 3);
}

#[test]
fn test_search_over_on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("lectern.db");

    {
        let store = SqliteStore::new(&db_path).expect("create store");
        store
            .add_blog_post(
                &NewBlogPost::new(
                    "Qualitative Research Basics",
                    "qualitative-research-basics",
                    "A full introduction to designing a qualitative study.",
                )
                .with_status(PublishStatus::Published),
            )
            .expect("insert post");
    }

    // A fresh connection sees the committed rows
    let service = service(SqliteStore::new(&db_path).expect("reopen store"));
    let response = service
        .search(&SearchRequest::new("qualitative research"))
        .expect("search");

    assert_eq!(response.total, 1);
    assert_eq!(response.results[0].hit.title, "Qualitative Research Basics");
}

#[test]
fn test_search_results_serialize_with_flat_hit_fields() {
    let service = service(seeded_store());

    let response = service
        .search(&SearchRequest::new("qualitative research"))
        .expect("search");
    let json = serde_json::to_value(&response).expect("serialize response");

    let first = &json["results"][0];
    assert_eq!(first["type"], "blog");
    assert_eq!(first["title"], "Qualitative Research Basics");
    assert_eq!(first["relevance"], 14);
    assert_eq!(first["status"], "published");
    assert_eq!(json["total"], 3);
    assert_eq!(json["query"], "qualitative research");
}

#[cfg(feature = "http")]
mod http_api_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use lectern::http::{AppState, JwtAuthenticator, JwtConfig, RateLimitConfig, router};
    use lectern::mail::{DeliveryReceipt, MailTransport};
    use lectern::{Error, NotifyService, Recipient, Result, SearchHit};
    use tower::ServiceExt;

    const TEST_SECRET: &str = "a-very-long-signing-key-that-is-at-least-32-chars";

    struct AcceptingTransport;

    impl MailTransport for AcceptingTransport {
        fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<DeliveryReceipt> {
            Ok(DeliveryReceipt {
                message_id: format!("mid-{to}"),
            })
        }
    }

    /// Store stub whose every query fails, as when the database file is gone.
    struct FailingStore;

    impl FailingStore {
        fn unavailable<T>() -> Result<T> {
            Err(Error::StoreUnavailable {
                cause: "disk I/O error at offset 4096".to_string(),
            })
        }
    }

    impl ContentStore for FailingStore {
        fn fetch_public_hits(
            &self,
            _kind: ContentKind,
            _query_text: &str,
            _limit: usize,
        ) -> Result<Vec<SearchHit>> {
            Self::unavailable()
        }

        fn suggest_titles(
            &self,
            _kind: ContentKind,
            _query_text: &str,
            _limit: usize,
        ) -> Result<Vec<String>> {
            Self::unavailable()
        }

        fn count_public(&self, _kind: ContentKind) -> Result<u64> {
            Self::unavailable()
        }

        fn approved_recipients(&self, _app_id: i64) -> Result<Vec<Recipient>> {
            Self::unavailable()
        }
    }

    fn router_over(store: Arc<dyn ContentStore>, rate_limit: RateLimitConfig) -> axum::Router {
        let state = AppState::new(
            Arc::new(SearchService::new(Arc::clone(&store))),
            Arc::new(NotifyService::new(store, Arc::new(AcceptingTransport))),
            JwtAuthenticator::new(&JwtConfig::new(TEST_SECRET)),
            rate_limit,
        );
        router(state)
    }

    fn test_router(rate_limit: RateLimitConfig) -> axum::Router {
        router_over(Arc::new(seeded_store()), rate_limit)
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .expect("request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = serde_json::from_slice(&bytes).expect("parse body");
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/health",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "OK");
    }

    #[tokio::test]
    async fn test_search_endpoint_returns_ranked_results() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/search?q=qualitative%20research",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 3);
        assert_eq!(json["results"][0]["title"], "Qualitative Research Basics");
    }

    #[tokio::test]
    async fn test_search_endpoint_short_query_is_http_success() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/search?q=a",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 0);
        assert_eq!(json["results"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_search_endpoint_excludes_kind_param_false() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/search?q=qualitative&blogs=false&webinars=false",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["results"][0]["type"], "app");
    }

    #[tokio::test]
    async fn test_suggestions_endpoint() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/search/suggestions?q=qualitative",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["suggestions"],
            serde_json::json!(["Qualitative Research Basics"])
        );
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (status, json) = get_json(
            test_router(RateLimitConfig::default()),
            "/api/search/stats",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totalContent"], 3);
    }

    #[tokio::test]
    async fn test_store_failure_is_masked_as_generic_500() {
        let (status, json) = get_json(
            router_over(Arc::new(FailingStore), RateLimitConfig::default()),
            "/api/search?q=qualitative",
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        // The body never echoes the backend cause
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429_when_exhausted() {
        let app = test_router(RateLimitConfig::default().with_max_requests(2));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
                .await
                .expect("request");
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rate_limit_budget_is_per_client() {
        let app = test_router(RateLimitConfig::default().with_max_requests(1));
        let request = |ip: &str| {
            Request::get("/api/health")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(request("10.0.0.1")).await.expect("request");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(request("10.0.0.1")).await.expect("request");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // A different client keeps its own budget
        let response = app.oneshot(request("10.0.0.2")).await.expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = test_router(RateLimitConfig::default());
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .expect("request");

        let headers = response.headers();
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    }
}
