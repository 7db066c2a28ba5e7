//! Search request/response types.

use crate::models::content::{ContentKind, SearchHit};
use serde::{Deserialize, Serialize};

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 10;

/// Upper bound on the per-request result limit accepted from callers.
pub const MAX_LIMIT: usize = 50;

/// Number of title suggestions fetched per kind.
pub const SUGGESTIONS_PER_KIND: usize = 3;

/// Overall cap on returned suggestions after de-duplication.
pub const MAX_SUGGESTIONS: usize = 5;

/// Per-kind inclusion flags, echoed back in responses.
///
/// A kind is searched unless its flag is turned off, matching the query
/// parameter convention where only an explicit `false` excludes a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindFilters {
    /// Include blog posts.
    pub blogs: bool,
    /// Include webinars.
    pub webinars: bool,
    /// Include apps.
    pub apps: bool,
}

impl Default for KindFilters {
    fn default() -> Self {
        Self {
            blogs: true,
            webinars: true,
            apps: true,
        }
    }
}

impl KindFilters {
    /// Returns whether the given kind is included.
    #[must_use]
    pub const fn includes(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Blog => self.blogs,
            ContentKind::Webinar => self.webinars,
            ContentKind::App => self.apps,
        }
    }

    /// The included kinds, in fetch order.
    #[must_use]
    pub fn kinds(&self) -> Vec<ContentKind> {
        ContentKind::ALL
            .into_iter()
            .filter(|kind| self.includes(*kind))
            .collect()
    }
}

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw query text; trimmed before matching.
    pub text: String,
    /// Per-kind inclusion flags.
    pub filters: KindFilters,
    /// Maximum number of results across all kinds.
    pub limit: usize,
}

impl SearchRequest {
    /// Creates a request with default filters and limit.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: KindFilters::default(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Sets the result limit (floored at 1).
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { 1 } else { limit };
        self
    }

    /// Sets the per-kind inclusion flags.
    #[must_use]
    pub const fn with_filters(mut self, filters: KindFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// A hit paired with its relevance score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredHit {
    /// The underlying hit, flattened into the same JSON object.
    #[serde(flatten)]
    pub hit: SearchHit,
    /// Additive relevance score.
    pub relevance: u32,
}

/// A complete search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Scored hits, sorted by relevance descending.
    pub results: Vec<ScoredHit>,
    /// Number of returned results.
    pub total: usize,
    /// The (trimmed) query text that was searched.
    pub query: String,
    /// The inclusion flags that were applied.
    pub filters: KindFilters,
}

impl SearchResponse {
    /// An empty response for short-circuited queries.
    #[must_use]
    pub fn empty(query: impl Into<String>, filters: KindFilters) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            query: query.into(),
            filters,
        }
    }
}

/// Title suggestions for a partial query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suggestions {
    /// De-duplicated titles, at most [`MAX_SUGGESTIONS`].
    pub suggestions: Vec<String>,
}

/// Counts of publicly visible content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    /// Published blog posts.
    pub total_blogs: u64,
    /// Active webinars.
    pub total_webinars: u64,
    /// Active apps.
    pub total_apps: u64,
    /// Sum of the above.
    pub total_content: u64,
}
