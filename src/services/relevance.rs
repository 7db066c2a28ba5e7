//! Additive relevance heuristic for cross-kind search.
//!
//! Every hit is scored independently against the query; the pipeline then
//! sorts by score. The heuristic is intentionally simple so editors can
//! predict why one result outranks another.
//!
//! # Scoring
//!
//! ```text
//! score(hit, query) = title_score + excerpt_score + recency_score + status_score
//!
//! title_score:   +10 if the title contains the query (case-insensitive)
//!                 +5 more if the title equals the query exactly
//! excerpt_score:  +5 if the excerpt contains the query
//! recency_score:  +1 if created within the last 30 days
//!                 +1 more if created within the last 7 days
//! status_score:   +2 published blog, +2 active webinar,
//!                 +3 released app, +2 beta app
//! ```
//!
//! Scores are unsigned; a hit that matches nothing scores 0. Two hits may
//! tie, and the pipeline keeps fetch order for ties rather than inventing a
//! secondary key.

use crate::models::{ContentKind, SearchHit, StatusSignal};
use chrono::{DateTime, Duration, Utc};

/// Title containing the query.
const TITLE_MATCH_WEIGHT: u32 = 10;

/// Title equal to the query, on top of [`TITLE_MATCH_WEIGHT`].
const EXACT_TITLE_BONUS: u32 = 5;

/// Excerpt containing the query.
const EXCERPT_MATCH_WEIGHT: u32 = 5;

/// Created within the last 30 days.
const RECENT_MONTH_BONUS: u32 = 1;

/// Created within the last 7 days, on top of [`RECENT_MONTH_BONUS`].
const RECENT_WEEK_BONUS: u32 = 1;

/// Published blog post.
const PUBLISHED_BLOG_BONUS: u32 = 2;

/// Active webinar.
const ACTIVE_WEBINAR_BONUS: u32 = 2;

/// Released app.
const RELEASED_APP_BONUS: u32 = 3;

/// Beta app.
const BETA_APP_BONUS: u32 = 2;

/// Scores one hit against a query.
///
/// Matching is case-insensitive. `now` is injected so a batch of hits is
/// scored against one clock reading; for a fixed `now` the function is a
/// pure function of its inputs.
///
/// Content dated in the future counts as recent: its age is negative, which
/// is inside every recency window.
#[must_use]
pub fn score(hit: &SearchHit, query: &str, now: DateTime<Utc>) -> u32 {
    let query = query.to_lowercase();
    let title = hit.title.to_lowercase();

    let mut score = 0;

    if title.contains(&query) {
        score += TITLE_MATCH_WEIGHT;
        if title == query {
            score += EXACT_TITLE_BONUS;
        }
    }

    if let Some(excerpt) = &hit.excerpt {
        if excerpt.to_lowercase().contains(&query) {
            score += EXCERPT_MATCH_WEIGHT;
        }
    }

    let age = now.signed_duration_since(hit.created_at);
    if age < Duration::days(30) {
        score += RECENT_MONTH_BONUS;
        if age < Duration::days(7) {
            score += RECENT_WEEK_BONUS;
        }
    }

    score += match (hit.kind, &hit.status) {
        (ContentKind::Blog, StatusSignal::Publication(status)) if status == "published" => {
            PUBLISHED_BLOG_BONUS
        },
        (ContentKind::Webinar, StatusSignal::Active(true)) => ACTIVE_WEBINAR_BONUS,
        (ContentKind::App, StatusSignal::Stage(stage)) if stage == "released" => RELEASED_APP_BONUS,
        (ContentKind::App, StatusSignal::Stage(stage)) if stage == "beta" => BETA_APP_BONUS,
        _ => 0,
    };

    score
}
