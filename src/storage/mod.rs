//! Content storage.
//!
//! The search and notify pipelines consume content through the
//! [`ContentStore`] trait; [`SqliteStore`] is the embedded implementation.

mod sqlite;

pub use sqlite::{NewApp, NewBlogPost, NewSignup, NewWebinar, SqliteStore};

use crate::Result;
use crate::models::{ContentKind, Recipient, SearchHit};

/// Read interface over publicly visible content.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn ContentStore>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Fetches filter to public rows server-side: published blog posts,
///   active webinars, active apps
/// - Query failures surface as [`crate::Error::StoreUnavailable`] so the
///   search layer can fail closed instead of returning partial results
pub trait ContentStore: Send + Sync {
    /// Fetches up to `limit` public rows of `kind` whose designated text
    /// columns contain `query_text` (case-insensitive substring), newest
    /// first.
    ///
    /// Matching columns: blog title/excerpt/content, webinar
    /// title/description, app name/description/target-audience.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the query fails.
    fn fetch_public_hits(
        &self,
        kind: ContentKind,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Fetches up to `limit` public titles of `kind` containing
    /// `query_text`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the query fails.
    fn suggest_titles(&self, kind: ContentKind, query_text: &str, limit: usize)
    -> Result<Vec<String>>;

    /// Counts public rows of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the query fails.
    fn count_public(&self, kind: ContentKind) -> Result<u64>;

    /// Resolves the approved early-access signups for an app, in signup
    /// order.
    ///
    /// An empty list is a valid return; the caller decides whether that is
    /// a not-found condition.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StoreUnavailable`] if the query fails.
    fn approved_recipients(&self, app_id: i64) -> Result<Vec<Recipient>>;
}
