//! Business logic services.
//!
//! Services orchestrate the content store and mail transport: relevance
//! scoring, the cross-kind search pipeline, and bulk notification jobs.

mod notify;
mod relevance;
mod search;

pub use notify::NotifyService;
pub use relevance::score;
pub use search::SearchService;
