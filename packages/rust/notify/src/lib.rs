//! Operator notifications for failed validations and minor-customer reviews.
//!
//! A [`Notification`] is built from the onboarding outcome and handed to a
//! [`Notifier`]. Two transports exist:
//! - [`WebhookNotifier`]: POSTs the notification as JSON
//! - [`LogNotifier`]: writes it to the tracing log
//!
//! [`Transport::from_config`] picks the webhook when `notify.webhook_url` is
//! set and falls back to the log otherwise.

use std::future::Future;
use std::time::Duration;

use ekyc_shared::{EkycError, NotifyConfig, Result, mask_id, validate_notify};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

/// Placeholder used when no phone number was supplied.
pub const NO_PHONE: &str = "N/A";

const USER_AGENT: &str = concat!("ekyc/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// What the operator is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The registry did not confirm the document.
    ValidationFailure,
    /// A minor's onboarding was routed to human review.
    MinorReview,
}

/// A message for the onboarding operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Registry validation failed for this customer.
    pub fn validation_failure(
        recipient: &str,
        name: &str,
        id_number: &str,
        phone: Option<&str>,
        reason: &str,
    ) -> Self {
        let body = format!(
            "Dear Operator,\n\n\
             The eKYC validation for the following customer has FAILED:\n\n\
             Name: {name}\n\
             Identity number: {id}\n\
             Reason: {reason}\n\
             Phone: {phone}\n\n\
             Please review manually.\n",
            id = mask_id(id_number),
            phone = phone.unwrap_or(NO_PHONE),
        );
        Self {
            kind: NotificationKind::ValidationFailure,
            recipient: recipient.to_string(),
            subject: format!("eKYC validation failure for {name}"),
            body,
        }
    }

    /// Onboarding of a minor needs a human decision.
    pub fn minor_review(
        recipient: &str,
        name: &str,
        dob: &str,
        id_number: &str,
        phone: Option<&str>,
        reason: &str,
    ) -> Self {
        let body = format!(
            "Dear Operator,\n\n\
             The customer onboarding for the following customer was stopped for review:\n\n\
             Name: {name}\n\
             Identity number: {id}\n\
             DOB: {dob}\n\
             Reason: {reason}\n\
             Phone: {phone}\n\n\
             A customer under the adult age cannot be onboarded automatically:\n\
             a. A human agent must review the case manually.\n\
             b. A parent or guardian must provide consent documentation.\n\
             c. The onboarding cannot be completed automatically.\n\
             d. The agent must update the customer record after approval.\n",
            id = mask_id(id_number),
            phone = phone.unwrap_or(NO_PHONE),
        );
        Self {
            kind: NotificationKind::MinorReview,
            recipient: recipient.to_string(),
            subject: format!("Customer onboarding needs review for {name}"),
            body,
        }
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Delivers notifications to an operator.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Notifier> Notifier for &T {
    fn send(&self, notification: &Notification) -> impl Future<Output = Result<()>> + Send {
        (**self).send(notification)
    }
}

/// Posts notifications as JSON to a webhook.
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EkycError::Notify(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    #[instrument(skip_all, fields(kind = ?notification.kind, url = %self.url))]
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .map_err(|e| EkycError::Notify(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EkycError::Notify(format!("webhook returned HTTP {status}")));
        }
        info!(recipient = %notification.recipient, "notification delivered");
        Ok(())
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// The transport selected from configuration.
pub enum Transport {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl Transport {
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        validate_notify(config)?;
        match &config.webhook_url {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| EkycError::config(format!("invalid notify.webhook_url: {e}")))?;
                Ok(Self::Webhook(WebhookNotifier::new(
                    url,
                    Duration::from_secs(config.timeout_secs),
                )?))
            }
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for Transport {
    async fn send(&self, notification: &Notification) -> Result<()> {
        match self {
            Self::Webhook(n) => n.send(notification).await,
            Self::Log(n) => n.send(notification).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample() -> Notification {
        Notification::minor_review(
            "ops@example.com",
            "Ravi Verma",
            "01/01/2010",
            "444455556666",
            None,
            "Customer is 15 years old",
        )
    }

    #[test]
    fn minor_review_lists_review_steps() {
        let n = sample();
        assert_eq!(n.kind, NotificationKind::MinorReview);
        assert!(n.subject.contains("Ravi Verma"));
        assert!(n.body.contains("parent or guardian"));
        assert!(n.body.contains("Phone: N/A"));
        assert!(n.body.contains("XXXXXXXX6666"));
        assert!(!n.body.contains("444455556666"));
    }

    #[test]
    fn validation_failure_carries_reason_and_phone() {
        let n = Notification::validation_failure(
            "ops@example.com",
            "Asha Verma",
            "111122223333",
            Some("9840821235"),
            "Name or DOB mismatch",
        );
        assert_eq!(n.kind, NotificationKind::ValidationFailure);
        assert!(n.body.contains("Reason: Name or DOB mismatch"));
        assert!(n.body.contains("Phone: 9840821235"));
    }

    #[tokio::test]
    async fn webhook_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "kind": "minor_review",
                "recipient": "ops@example.com"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();
        notifier.send(&sample()).await.expect("delivered");
    }

    #[tokio::test]
    async fn webhook_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5)).unwrap();
        let err = notifier.send(&sample()).await.unwrap_err();
        assert!(matches!(err, EkycError::Notify(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn log_transport_without_webhook() {
        let transport = Transport::from_config(&NotifyConfig::default()).unwrap();
        assert!(matches!(transport, Transport::Log(_)));
        transport.send(&sample()).await.expect("logged");
    }

    #[test]
    fn invalid_webhook_url_rejected() {
        let config = NotifyConfig {
            webhook_url: Some("not a url".into()),
            ..NotifyConfig::default()
        };
        assert!(Transport::from_config(&config).is_err());
    }
}
