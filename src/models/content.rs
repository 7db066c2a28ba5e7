//! Content kinds and search hit shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The searchable content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Blog post.
    Blog,
    /// Webinar.
    Webinar,
    /// Research app.
    App,
}

impl ContentKind {
    /// All kinds, in fetch order.
    pub const ALL: [Self; 3] = [Self::Blog, Self::Webinar, Self::App];

    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Webinar => "webinar",
            Self::App => "app",
        }
    }

    /// Parses a kind from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "blog" | "blogs" => Some(Self::Blog),
            "webinar" | "webinars" => Some(Self::Webinar),
            "app" | "apps" => Some(Self::App),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blog publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Not yet visible.
    Draft,
    /// Publicly visible.
    Published,
    /// Retired from the public site.
    Archived,
}

impl PublishStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

/// App lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStage {
    /// In development.
    Development,
    /// Open beta.
    Beta,
    /// Generally available.
    Released,
}

impl AppStage {
    /// Returns the stage as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Beta => "beta",
            Self::Released => "released",
        }
    }
}

/// Kind-specific visibility/lifecycle signal carried on a hit.
///
/// Blogs carry a publication status string, webinars an active flag, apps a
/// lifecycle stage string. Serialized as the bare inner value so hit JSON
/// keeps the flat `status` field shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusSignal {
    /// Webinar active flag.
    Active(bool),
    /// Blog publication status (`draft`, `published`, `archived`).
    Publication(String),
    /// App lifecycle stage (`development`, `beta`, `released`).
    Stage(String),
}

impl StatusSignal {
    /// Publication status constructor.
    #[must_use]
    pub fn publication(status: impl Into<String>) -> Self {
        Self::Publication(status.into())
    }

    /// Lifecycle stage constructor.
    #[must_use]
    pub fn stage(stage: impl Into<String>) -> Self {
        Self::Stage(stage.into())
    }
}

/// One content record matched by a search query.
///
/// Constructed fresh per query from store rows; never persisted by the
/// search pipeline itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    /// Row id within its kind's table.
    pub id: i64,
    /// The content kind.
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Title (blog/webinar title, app name).
    pub title: String,
    /// Excerpt (blog excerpt, webinar/app description).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// URL slug (blog posts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Kind-specific status signal.
    pub status: StatusSignal,
}

impl SearchHit {
    /// Creates a new hit.
    #[must_use]
    pub fn new(
        id: i64,
        kind: ContentKind,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
        status: StatusSignal,
    ) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            excerpt: None,
            slug: None,
            created_at,
            status,
        }
    }

    /// Sets the excerpt.
    #[must_use]
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    /// Sets the slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}
