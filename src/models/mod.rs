//! Data models for lectern.
//!
//! This module contains all the core data structures used throughout the system.

mod content;
mod notify;
mod search;

pub use content::{AppStage, ContentKind, PublishStatus, SearchHit, StatusSignal};
pub use notify::{
    DEFAULT_PERSONALIZATION_FIELD, DeliveryError, NotificationJob, NotificationSummary, Recipient,
    SignupStatus, is_valid_email,
};
pub use search::{
    ContentStats, DEFAULT_LIMIT, KindFilters, MAX_LIMIT, MAX_SUGGESTIONS, SUGGESTIONS_PER_KIND,
    ScoredHit, SearchRequest, SearchResponse, Suggestions,
};
