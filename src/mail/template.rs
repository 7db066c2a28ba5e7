//! Mail-merge rendering.
//!
//! Message templates carry `{{field}}` placeholders. Rendering substitutes
//! exactly one recipient field per pass; a missing or empty value falls back
//! to a neutral greeting so no recipient ever sees a raw placeholder for the
//! personalized field.

use crate::models::Recipient;
use regex::Regex;
use std::sync::LazyLock;

/// Greeting substituted when the personalization value is empty or absent.
const FALLBACK_VALUE: &str = "there";

/// Regex pattern for placeholder references: `{{field}}`.
static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z][A-Za-z0-9_]*)\}\}").unwrap_or_else(|_| unreachable!())
});

/// Renders a message template for one recipient.
///
/// Every literal `{{field}}` occurrence is replaced with the recipient's
/// value for `field`, or with `"there"` when the value is empty or absent.
/// Placeholders for other fields are left untouched.
///
/// Rendering is a plain substitution pass: applying it twice is a no-op as
/// long as field values do not themselves contain placeholders.
///
/// # Examples
///
/// ```rust
/// use lectern::{Recipient, render};
///
/// let ada = Recipient::new("ada@example.org").with_name("Ada");
/// assert_eq!(render("Hi {{name}}!", "name", &ada), "Hi Ada!");
///
/// let anon = Recipient::new("anon@example.org");
/// assert_eq!(render("Hi {{name}}!", "name", &anon), "Hi there!");
/// ```
#[must_use]
pub fn render(template: &str, field: &str, recipient: &Recipient) -> String {
    let placeholder = format!("{{{{{field}}}}}");
    let value = recipient.field(field).unwrap_or(FALLBACK_VALUE);
    template.replace(&placeholder, value)
}

/// Lists the distinct placeholder fields in a template, in first-seen order.
///
/// Used by the dry-run preview to warn about placeholders the renderer will
/// not substitute.
#[must_use]
pub fn placeholder_fields(template: &str) -> Vec<String> {
    let mut fields = Vec::new();
    for capture in PLACEHOLDER_PATTERN.captures_iter(template) {
        if let Some(field) = capture.get(1) {
            let field = field.as_str().to_string();
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }
    fields
}

/// A ready-to-send subject and body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailContent {
    /// Mail subject line.
    pub subject: String,
    /// Plain-text body, possibly still carrying `{{name}}` for per-recipient
    /// rendering.
    pub body: String,
}

/// Builds the early-access invitation for an app.
///
/// The body keeps its `{{name}}` placeholder; the notifier renders it per
/// recipient.
#[must_use]
pub fn early_access_invite(app_name: &str) -> MailContent {
    MailContent {
        subject: format!("Early Access Available: {app_name}"),
        body: format!(
            "Hi {{{{name}}}},\n\n\
             Early access is now open for {app_name}! As an approved early-access\n\
             member you can try it before the public launch, and your feedback\n\
             will shape the final release.\n\n\
             Sign in to get started. If anything is unclear, just reply to this\n\
             message and the team will help out.\n"
        ),
    }
}

/// Builds the launch announcement for an app.
#[must_use]
pub fn launch_announcement(app_name: &str) -> MailContent {
    MailContent {
        subject: format!("{app_name} is Now Live!"),
        body: format!(
            "Hi {{{{name}}}},\n\n\
             Great news: {app_name} has officially launched and is now available\n\
             to everyone. Thank you for your support during the early-access\n\
             phase.\n\n\
             Sign in to explore the full release. We are excited to see what you\n\
             build with {app_name}!\n"
        ),
    }
}
