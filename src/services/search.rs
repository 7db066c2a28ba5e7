//! Cross-kind search pipeline.
//!
//! One request fans out to the store once per included kind, scores the
//! merged candidates against a single clock reading, and returns the top
//! slice. A store failure on any kind fails the whole request; the pipeline
//! never serves partial cross-kind results.

use crate::Result;
use crate::models::{
    ContentKind, ContentStats, MAX_SUGGESTIONS, SUGGESTIONS_PER_KIND, ScoredHit, SearchRequest,
    SearchResponse, Suggestions,
};
use crate::services::relevance::score;
use crate::storage::ContentStore;
use chrono::Utc;
use std::cmp::Reverse;
use std::sync::Arc;

/// Queries shorter than this are answered empty without touching the store.
const MIN_QUERY_CHARS: usize = 2;

/// Service for searching public content.
///
/// Encapsulates the fetch, score, sort, and truncate pipeline over a
/// [`ContentStore`].
pub struct SearchService {
    store: Arc<dyn ContentStore>,
}

impl SearchService {
    /// Creates a new search service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Runs a search request.
    ///
    /// The query is trimmed first; anything shorter than two characters
    /// returns an empty response without a store round trip. Included kinds
    /// are fetched in blog, webinar, app order, each capped at the request
    /// limit, then the merged list is scored, sorted by relevance
    /// descending, and truncated to the limit. The sort is stable, so tied
    /// hits keep their fetch order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if any kind's fetch fails.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let text = request.text.trim();
        if text.chars().count() < MIN_QUERY_CHARS {
            return Ok(SearchResponse::empty(text, request.filters));
        }

        let now = Utc::now();
        let mut scored = Vec::new();
        for kind in request.filters.kinds() {
            let hits = self.store.fetch_public_hits(kind, text, request.limit)?;
            scored.extend(hits.into_iter().map(|hit| ScoredHit {
                relevance: score(&hit, text, now),
                hit,
            }));
        }

        // sort_by_key is stable: ties keep kind-major fetch order
        scored.sort_by_key(|s| Reverse(s.relevance));
        scored.truncate(request.limit);

        let total = scored.len();
        tracing::debug!(
            query_len = text.chars().count(),
            limit = request.limit,
            results = total,
            "search completed"
        );

        Ok(SearchResponse {
            results: scored,
            total,
            query: text.to_string(),
            filters: request.filters,
        })
    }

    /// Returns title suggestions for a partial query.
    ///
    /// All kinds contribute up to [`SUGGESTIONS_PER_KIND`] titles in blog,
    /// webinar, app order; duplicates are dropped keeping the first
    /// occurrence, and the result is capped at [`MAX_SUGGESTIONS`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if any kind's title query
    /// fails.
    pub fn suggest(&self, query_text: &str) -> Result<Suggestions> {
        let text = query_text.trim();
        if text.chars().count() < MIN_QUERY_CHARS {
            return Ok(Suggestions::default());
        }

        let mut suggestions: Vec<String> = Vec::new();
        for kind in ContentKind::ALL {
            for title in self.store.suggest_titles(kind, text, SUGGESTIONS_PER_KIND)? {
                if !suggestions.contains(&title) {
                    suggestions.push(title);
                }
            }
        }
        suggestions.truncate(MAX_SUGGESTIONS);

        Ok(Suggestions { suggestions })
    }

    /// Returns counts of publicly visible content.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if any count query fails.
    pub fn stats(&self) -> Result<ContentStats> {
        let total_blogs = self.store.count_public(ContentKind::Blog)?;
        let total_webinars = self.store.count_public(ContentKind::Webinar)?;
        let total_apps = self.store.count_public(ContentKind::App)?;

        Ok(ContentStats {
            total_blogs,
            total_webinars,
            total_apps,
            total_content: total_blogs + total_webinars + total_apps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KindFilters, Recipient, SearchHit, StatusSignal};
    use crate::{Error, Result};
    use chrono::{DateTime, Duration};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store stub with canned rows per kind.
    ///
    /// Like the real store it applies the limit itself; matching is the
    /// store's job, so the stub returns its rows for any query.
    #[derive(Default)]
    struct StubStore {
        blogs: Vec<SearchHit>,
        webinars: Vec<SearchHit>,
        apps: Vec<SearchHit>,
        fail_kind: Option<ContentKind>,
        fetch_calls: AtomicUsize,
    }

    impl StubStore {
        fn rows(&self, kind: ContentKind) -> &[SearchHit] {
            match kind {
                ContentKind::Blog => &self.blogs,
                ContentKind::Webinar => &self.webinars,
                ContentKind::App => &self.apps,
            }
        }
    }

    impl ContentStore for StubStore {
        fn fetch_public_hits(
            &self,
            kind: ContentKind,
            _query_text: &str,
            limit: usize,
        ) -> Result<Vec<SearchHit>> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_kind == Some(kind) {
                return Err(Error::StoreUnavailable {
                    cause: "stub outage".to_string(),
                });
            }
            Ok(self.rows(kind).iter().take(limit).cloned().collect())
        }

        fn suggest_titles(
            &self,
            kind: ContentKind,
            _query_text: &str,
            limit: usize,
        ) -> Result<Vec<String>> {
            if self.fail_kind == Some(kind) {
                return Err(Error::StoreUnavailable {
                    cause: "stub outage".to_string(),
                });
            }
            Ok(self
                .rows(kind)
                .iter()
                .take(limit)
                .map(|hit| hit.title.clone())
                .collect())
        }

        fn count_public(&self, kind: ContentKind) -> Result<u64> {
            Ok(self.rows(kind).len() as u64)
        }

        fn approved_recipients(&self, _app_id: i64) -> Result<Vec<Recipient>> {
            Ok(Vec::new())
        }
    }

    fn old_date() -> DateTime<Utc> {
        Utc::now() - Duration::days(100)
    }

    fn blog(id: i64, title: &str) -> SearchHit {
        SearchHit::new(
            id,
            ContentKind::Blog,
            title,
            old_date(),
            StatusSignal::publication("published"),
        )
    }

    fn webinar(id: i64, title: &str) -> SearchHit {
        SearchHit::new(
            id,
            ContentKind::Webinar,
            title,
            old_date(),
            StatusSignal::Active(true),
        )
    }

    fn app(id: i64, title: &str) -> SearchHit {
        SearchHit::new(
            id,
            ContentKind::App,
            title,
            old_date(),
            StatusSignal::stage("development"),
        )
    }

    fn service(store: StubStore) -> SearchService {
        SearchService::new(Arc::new(store))
    }

    #[test]
    fn test_short_query_skips_store() {
        let store = StubStore {
            blogs: vec![blog(1, "anything")],
            ..StubStore::default()
        };
        let calls = Arc::new(store);
        let service = SearchService::new(Arc::clone(&calls) as Arc<dyn ContentStore>);

        let response = service.search(&SearchRequest::new("  a  ")).unwrap();

        assert_eq!(response.total, 0);
        assert!(response.results.is_empty());
        assert_eq!(response.query, "a");
        assert_eq!(calls.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_results_sorted_by_relevance_desc() {
        // "coding basics" matches the query in the title; "misc notes" does
        // not match at all
        let service = service(StubStore {
            blogs: vec![blog(1, "misc notes"), blog(2, "coding basics")],
            webinars: vec![webinar(3, "coding basics")],
            ..StubStore::default()
        });

        let response = service.search(&SearchRequest::new("coding")).unwrap();

        assert_eq!(response.total, 3);
        assert_eq!(response.results[0].hit.id, 2);
        assert_eq!(response.results[1].hit.id, 3);
        assert_eq!(response.results[2].hit.id, 1);
        assert!(response.results[0].relevance >= response.results[1].relevance);
    }

    #[test]
    fn test_ties_keep_kind_fetch_order() {
        // Identical titles and zero status weight produce equal scores for
        // the webinar and app rows
        let service = service(StubStore {
            webinars: vec![SearchHit::new(
                10,
                ContentKind::Webinar,
                "coding clinic",
                old_date(),
                StatusSignal::Active(false),
            )],
            apps: vec![app(20, "coding clinic")],
            ..StubStore::default()
        });

        let response = service.search(&SearchRequest::new("coding")).unwrap();

        assert_eq!(response.results[0].relevance, response.results[1].relevance);
        assert_eq!(response.results[0].hit.id, 10);
        assert_eq!(response.results[1].hit.id, 20);
    }

    #[test]
    fn test_limit_truncates_merged_results() {
        let service = service(StubStore {
            blogs: vec![blog(1, "qualitative a"), blog(2, "qualitative b")],
            webinars: vec![webinar(3, "qualitative c")],
            apps: vec![app(4, "qualitative d")],
            ..StubStore::default()
        });

        let request = SearchRequest::new("qualitative").with_limit(2);
        let response = service.search(&request).unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.results.len(), 2);
    }

    #[test]
    fn test_excluded_kind_not_fetched() {
        let store = StubStore {
            blogs: vec![blog(1, "coding")],
            webinars: vec![webinar(2, "coding")],
            apps: vec![app(3, "coding")],
            ..StubStore::default()
        };
        let store = Arc::new(store);
        let service = SearchService::new(Arc::clone(&store) as Arc<dyn ContentStore>);

        let filters = KindFilters {
            webinars: false,
            ..KindFilters::default()
        };
        let request = SearchRequest::new("coding").with_filters(filters);
        let response = service.search(&request).unwrap();

        assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 2);
        assert!(
            response
                .results
                .iter()
                .all(|s| s.hit.kind != ContentKind::Webinar)
        );
        assert_eq!(response.filters, filters);
    }

    #[test]
    fn test_store_failure_fails_whole_search() {
        let service = service(StubStore {
            blogs: vec![blog(1, "coding")],
            fail_kind: Some(ContentKind::App),
            ..StubStore::default()
        });

        let err = service.search(&SearchRequest::new("coding")).unwrap_err();

        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }

    #[test]
    fn test_suggestions_deduped_and_capped() {
        let service = service(StubStore {
            blogs: vec![
                blog(1, "Coding 101"),
                blog(2, "Coding 102"),
                blog(3, "Coding 103"),
            ],
            webinars: vec![webinar(4, "Coding 101"), webinar(5, "Coding live")],
            apps: vec![app(6, "Coder"), app(7, "Coding desk")],
            ..StubStore::default()
        });

        let suggestions = service.suggest("coding").unwrap().suggestions;

        // "Coding 101" appears once, at its first position
        assert_eq!(
            suggestions,
            vec!["Coding 101", "Coding 102", "Coding 103", "Coding live", "Coder"]
        );
    }

    #[test]
    fn test_suggestions_short_query_empty() {
        let service = service(StubStore::default());
        assert!(service.suggest("c").unwrap().suggestions.is_empty());
    }

    #[test]
    fn test_stats_totals() {
        let service = service(StubStore {
            blogs: vec![blog(1, "a"), blog(2, "b")],
            webinars: vec![webinar(3, "c")],
            apps: vec![app(4, "d"), app(5, "e"), app(6, "f")],
            ..StubStore::default()
        });

        let stats = service.stats().unwrap();

        assert_eq!(stats.total_blogs, 2);
        assert_eq!(stats.total_webinars, 1);
        assert_eq!(stats.total_apps, 3);
        assert_eq!(stats.total_content, 6);
    }
}
