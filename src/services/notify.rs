//! Bulk notification jobs.
//!
//! One job notifies the approved early-access list of an app. Deliveries
//! run strictly in recipient order; each recipient is rendered and sent
//! independently, and a delivery failure is recorded without stopping the
//! loop. The job itself only fails on precondition violations, never on
//! delivery outcomes, so an all-failed run is still a completed job.

use crate::mail::{MailTransport, render};
use crate::models::{NotificationJob, NotificationSummary, Recipient};
use crate::storage::ContentStore;
use crate::{Error, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Service for bulk notification jobs.
///
/// Resolves recipients through a [`ContentStore`] and delivers through a
/// [`MailTransport`].
pub struct NotifyService {
    store: Arc<dyn ContentStore>,
    transport: Arc<dyn MailTransport>,
}

impl NotifyService {
    /// Creates a new notify service.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, transport: Arc<dyn MailTransport>) -> Self {
        Self { store, transport }
    }

    /// Resolves the approved early-access recipients for an app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the app has no approved signups, or
    /// [`Error::StoreUnavailable`] if the lookup fails.
    pub fn resolve_recipients(&self, app_id: i64) -> Result<Vec<Recipient>> {
        let recipients = self.store.approved_recipients(app_id)?;
        if recipients.is_empty() {
            return Err(Error::NotFound(
                "no approved early access users found for this app".to_string(),
            ));
        }
        Ok(recipients)
    }

    /// Notifies the approved early-access list of an app.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the app has no approved signups,
    /// [`Error::StoreUnavailable`] if the lookup fails, or
    /// [`Error::InvalidInput`] if the job preconditions fail.
    pub fn notify_app_signups(
        &self,
        app_id: i64,
        subject: &str,
        message: &str,
    ) -> Result<NotificationSummary> {
        let recipients = self.resolve_recipients(app_id)?;
        let job = NotificationJob::new(subject, message, recipients);
        self.run(&job)
    }

    /// Runs one bulk job.
    ///
    /// Preconditions are checked up front; if any fails, no delivery is
    /// attempted. After that the job cannot fail: each recipient is
    /// rendered and sent in order, and the summary accounts for every one
    /// of them exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the job preconditions fail.
    pub fn run(&self, job: &NotificationJob) -> Result<NotificationSummary> {
        job.validate()?;

        let job_id = Uuid::new_v4();
        tracing::info!(
            job_id = %job_id,
            recipients = job.recipients.len(),
            "notification job started"
        );

        let mut summary = NotificationSummary::new();
        for recipient in &job.recipients {
            let body = render(&job.message, &job.personalization_field, recipient);
            match self.transport.send(&recipient.email, &job.subject, &body) {
                Ok(receipt) => {
                    metrics::counter!("notify_deliveries_total", "status" => "sent").increment(1);
                    tracing::debug!(
                        job_id = %job_id,
                        recipient = %recipient.email,
                        message_id = %receipt.message_id,
                        "delivery accepted"
                    );
                    summary.record_sent();
                },
                Err(e) => {
                    // Record the transport cause alone; the address is
                    // already carried next to it in the summary entry
                    let cause = match e {
                        Error::DeliveryFailed { cause, .. } => cause,
                        other => other.to_string(),
                    };
                    metrics::counter!("notify_deliveries_total", "status" => "failed").increment(1);
                    tracing::warn!(
                        job_id = %job_id,
                        recipient = %recipient.email,
                        error = %cause,
                        "delivery failed"
                    );
                    summary.record_failure(&recipient.email, cause);
                },
            }
        }

        tracing::info!(
            job_id = %job_id,
            sent = summary.sent_count,
            failed = summary.failed_count,
            "notification job finished"
        );

        Ok(summary)
    }
}
