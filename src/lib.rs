//! # Lectern
//!
//! Content search and notification backend for research-education platforms.
//!
//! Lectern is the headless core behind a content site: it ranks search
//! results across heterogeneous content kinds (blog posts, webinars, apps)
//! and runs personalized bulk-notification jobs against early-access signup
//! lists, with per-recipient failure accounting.
//!
//! ## Features
//!
//! - Cross-kind search with an additive relevance heuristic and stable
//!   ranking (ties keep fetch order)
//! - Title suggestions and public-content statistics
//! - Mail-merge rendering with a single-field personalization contract
//! - Sequential bulk notification with sent/failed/error bookkeeping
//! - Embedded SQLite content store
//! - Optional HTTP API (`http` feature, on by default) with JWT-guarded
//!   admin endpoints
//!
//! ## Example
//!
//! ```rust,ignore
//! use lectern::{SearchRequest, SearchService};
//!
//! let service = SearchService::new(store);
//! let response = service.search(&SearchRequest::new("qualitative research"))?;
//! for hit in &response.results {
//!     println!("[{}] {}", hit.relevance, hit.hit.title);
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
// Cannot be moved to function level. Current duplicates: reqwest/axum transitive deps.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod mail;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::LecternConfig;
pub use mail::{DeliveryReceipt, HttpMailer, MailTransport, render};
pub use models::{
    AppStage, ContentKind, ContentStats, KindFilters, NotificationJob, NotificationSummary,
    PublishStatus, Recipient, ScoredHit, SearchHit, SearchRequest, SearchResponse, SignupStatus,
    StatusSignal, Suggestions,
};
pub use services::{NotifyService, SearchService, score};
pub use storage::{ContentStore, SqliteStore};

/// Error type for lectern operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing subject/message, empty recipient list, malformed addresses or query params |
/// | `NotFound` | Unknown app id, zero approved signups for a notify target |
/// | `StoreUnavailable` | The content store cannot be reached or a query fails mid-search |
/// | `DeliveryFailed` | The mail transport rejects a single recipient (recovered inside the notifier) |
/// | `OperationFailed` | Config/file I/O errors, server startup failures |
/// | `Unauthorized` | Invalid/missing JWT on an admin endpoint |
/// | `FeatureNotEnabled` | HTTP serve requested without the `http` feature |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A notification job has an empty subject, message, or recipient list
    /// - A recipient address fails the structural email check
    /// - Query parameters cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist.
    ///
    /// Raised when:
    /// - A notify target app id is unknown
    /// - An app has no approved early-access signups
    #[error("not found: {0}")]
    NotFound(String),

    /// The content store is unreachable or a query failed.
    ///
    /// A search never returns partial cross-kind results: any store failure
    /// fails the whole request with this variant.
    #[error("content store unavailable: {cause}")]
    StoreUnavailable {
        /// The underlying cause.
        cause: String,
    },

    /// A single delivery attempt failed.
    ///
    /// Surfaced by mail transports; the bulk notifier recovers it locally
    /// (recorded and counted, never job-fatal).
    #[error("delivery to '{recipient}' failed: {cause}")]
    DeliveryFailed {
        /// The recipient address the transport rejected.
        recipient: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Config file parsing fails
    /// - Filesystem I/O errors occur
    /// - The HTTP server cannot bind or serve
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Authentication failed.
    ///
    /// Raised when:
    /// - JWT token is missing on an admin endpoint
    /// - JWT token is expired or invalid
    /// - The token's role claim does not grant the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

/// Result type alias for lectern operations.
pub type Result<T> = std::result::Result<T, Error>;
