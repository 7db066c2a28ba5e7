//! Mail delivery backend trait and HTTP implementation.
//!
//! # Error Handling
//!
//! A transport reports exactly one outcome per recipient. Retries are not
//! performed here; the bulk notifier records each failure and moves on, so
//! an internal retry would skew its accounting.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default provider request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Proof that a provider accepted one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider-assigned message id (locally generated if the provider
    /// returns none).
    pub message_id: String,
}

/// Trait for mail delivery backends.
///
/// This trait allows for different delivery implementations (HTTP provider,
/// recording stubs for testing). One call delivers one message.
pub trait MailTransport: Send + Sync {
    /// Delivers one message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeliveryFailed`] if the provider rejects the message
    /// or cannot be reached.
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<DeliveryReceipt>;
}

/// Success body returned by the provider.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    id: Option<String>,
}

/// HTTP mail provider backend using reqwest.
///
/// Posts one JSON message per delivery:
///
/// ```json
/// {"from": "...", "to": "...", "subject": "...", "text": "..."}
/// ```
///
/// authenticated with a bearer API key.
#[derive(Debug)]
pub struct HttpMailer {
    /// HTTP client with connection pooling.
    client: reqwest::blocking::Client,
    /// Provider send endpoint.
    endpoint: String,
    /// Provider API key.
    api_key: SecretString,
    /// Sender address.
    from: String,
}

impl HttpMailer {
    /// Creates a new HTTP mailer.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        from: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self::with_timeout(endpoint, from, api_key, DEFAULT_TIMEOUT)
    }

    /// Creates a new HTTP mailer with a custom request timeout.
    #[must_use]
    pub fn with_timeout(
        endpoint: impl Into<String>,
        from: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("Lectern/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            from: from.into(),
        }
    }

    /// Returns the configured sender address.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from
    }
}

fn delivery_failed(recipient: &str, cause: String) -> Error {
    Error::DeliveryFailed {
        recipient: recipient.to_string(),
        cause,
    }
}

impl MailTransport for HttpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<DeliveryReceipt> {
        let start = Instant::now();
        let payload = serde_json::json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&payload)
            .send()
            .map_err(|e| delivery_failed(to, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        metrics::histogram!("mail_provider_request_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            metrics::counter!(
                "mail_provider_errors_total",
                "status" => status.as_u16().to_string()
            )
            .increment(1);
            return Err(delivery_failed(to, format!("HTTP {} response", status.as_u16())));
        }

        let message_id = response
            .json::<ProviderResponse>()
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(DeliveryReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FixedTransport;

    impl MailTransport for FixedTransport {
        fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<DeliveryReceipt> {
            Ok(DeliveryReceipt {
                message_id: "fixed".to_string(),
            })
        }
    }

    #[test]
    fn test_provider_response_parses_id() {
        let parsed: ProviderResponse = serde_json::from_str(r#"{"id":"msg-7"}"#).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("msg-7"));
    }

    #[test]
    fn test_provider_response_tolerates_missing_id() {
        let parsed: ProviderResponse = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(parsed.id, None);
    }

    #[test]
    fn test_transport_usable_as_trait_object() {
        let transport: Arc<dyn MailTransport> = Arc::new(FixedTransport);
        let receipt = transport.send("a@b.co", "s", "b").unwrap();
        assert_eq!(receipt.message_id, "fixed");
    }

    #[test]
    fn test_mailer_keeps_sender_address() {
        let mailer = HttpMailer::new(
            "https://mail.invalid/send",
            "news@example.org",
            SecretString::from("key"),
        );
        assert_eq!(mailer.from_address(), "news@example.org");
    }
}
