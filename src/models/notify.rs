//! Notification job and accounting types.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Personalization field substituted by default.
pub const DEFAULT_PERSONALIZATION_FIELD: &str = "name";

/// One notification recipient.
///
/// Sourced externally (approved early-access signups); the notifier does not
/// own its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Delivery address.
    pub email: String,
    /// Display name used for personalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Recipient {
    /// Creates a recipient with no display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Looks up a personalization field by name.
    ///
    /// Empty values count as absent so the renderer's fallback applies.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&str> {
        let value = match field {
            "name" => self.name.as_deref(),
            "email" => Some(self.email.as_str()),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Email validation helper.
///
/// Structural check only: one `@`, non-empty local part, dotted domain with
/// non-empty labels.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }

    domain_parts
        .iter()
        .all(|part| !part.is_empty() && !part.chars().any(char::is_whitespace))
}

/// Early-access signup review status.
///
/// Only [`SignupStatus::Approved`] signups are resolved into notification
/// recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupStatus {
    /// Awaiting review.
    Pending,
    /// Cleared for notifications.
    Approved,
    /// Declined.
    Rejected,
}

impl SignupStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bulk-notification job.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Mail subject, shared across recipients.
    pub subject: String,
    /// Message template containing a `{{name}}`-style placeholder.
    pub message: String,
    /// Recipients, processed strictly in this order.
    pub recipients: Vec<Recipient>,
    /// Which recipient field feeds the placeholder.
    pub personalization_field: String,
}

impl NotificationJob {
    /// Creates a job with the default personalization field.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        message: impl Into<String>,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            recipients,
            personalization_field: DEFAULT_PERSONALIZATION_FIELD.to_string(),
        }
    }

    /// Overrides the personalization field.
    #[must_use]
    pub fn with_personalization_field(mut self, field: impl Into<String>) -> Self {
        self.personalization_field = field.into();
        self
    }

    /// Checks the job's preconditions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty subject, empty message,
    /// empty recipient list, or a structurally invalid recipient address.
    /// No delivery is attempted once any precondition fails.
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(Error::InvalidInput("subject is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(Error::InvalidInput("message is required".to_string()));
        }
        if self.recipients.is_empty() {
            return Err(Error::InvalidInput(
                "recipient list is empty".to_string(),
            ));
        }
        for recipient in &self.recipients {
            if !is_valid_email(&recipient.email) {
                return Err(Error::InvalidInput(format!(
                    "invalid recipient address: {}",
                    recipient.email
                )));
            }
        }
        Ok(())
    }
}

/// Per-recipient delivery error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryError {
    /// The address that failed.
    pub email: String,
    /// Transport error message.
    pub error_message: String,
}

/// Final accounting for one bulk job.
///
/// All-sent and all-failed are both normal outcomes; the job itself only
/// errors on precondition failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    /// Deliveries the transport accepted.
    pub sent_count: usize,
    /// Deliveries the transport rejected.
    pub failed_count: usize,
    /// One entry per failed recipient, in processing order.
    pub errors: Vec<DeliveryError>,
}

impl NotificationSummary {
    /// Creates an empty summary.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sent_count: 0,
            failed_count: 0,
            errors: Vec::new(),
        }
    }

    /// Records one accepted delivery.
    pub const fn record_sent(&mut self) {
        self.sent_count += 1;
    }

    /// Records one rejected delivery.
    pub fn record_failure(&mut self, email: impl Into<String>, message: impl Into<String>) {
        self.failed_count += 1;
        self.errors.push(DeliveryError {
            email: email.into(),
            error_message: message.into(),
        });
    }

    /// Total recipients processed.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.sent_count + self.failed_count
    }
}
