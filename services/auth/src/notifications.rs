//! Notifications sent to influencers when their approval status changes

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::{ApprovalStatus, StatusChange};

pub const STATUS_UPDATED_SUBJECT: &str = "Your influencer account status has been updated";

const APPROVED_BODY: &str = "Congratulations! Your influencer account has been approved.\n\n\
     You can now log in and start using our influencer features. Thank you for joining us!";

/// Upper bound on a single delivery attempt unless configured otherwise
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const REJECTED_BODY: &str = "We're sorry, your influencer account has been rejected.\n\n\
     If you believe this was a mistake, please contact customer support for help.";

/// A message addressed to one recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;

    /// How long a send may take before it is abandoned
    fn delivery_timeout(&self) -> Duration {
        DEFAULT_DELIVERY_TIMEOUT
    }
}

/// Notifier configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Endpoint receiving notifications as JSON; logged only when absent
    pub webhook_url: Option<String>,
    /// Sender address placed on every notification
    pub from_address: String,
    /// Deadline for one webhook delivery
    pub timeout: Duration,
}

impl NotifierConfig {
    /// Create a new NotifierConfig from environment variables
    ///
    /// # Environment Variables
    /// - `NOTIFIER_WEBHOOK_URL`: Webhook receiving notifications (optional)
    /// - `NOTIFIER_FROM_ADDRESS`: Sender address (default: no-reply@hearme.app)
    /// - `NOTIFIER_TIMEOUT_SECS`: Delivery deadline in seconds (default: 10)
    pub fn from_env() -> Self {
        let webhook_url = std::env::var("NOTIFIER_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let from_address = std::env::var("NOTIFIER_FROM_ADDRESS")
            .unwrap_or_else(|_| "no-reply@hearme.app".to_string());

        let timeout = std::env::var("NOTIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DELIVERY_TIMEOUT);

        NotifierConfig {
            webhook_url,
            from_address,
            timeout,
        }
    }

    /// Build the notifier this configuration describes
    pub fn build(&self) -> Result<Arc<dyn Notifier>> {
        Ok(match &self.webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), self.timeout)?),
            None => Arc::new(LogNotifier),
        })
    }
}

/// Writes notifications to the log instead of delivering them
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            to = %notification.to,
            subject = %notification.subject,
            "Notification (log delivery): {}",
            notification.body
        );
        Ok(())
    }
}

/// Posts notifications as JSON to a webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.client
            .post(&self.url)
            .json(notification)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn delivery_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Notification for a status change, if the change warrants one.
///
/// Only real transitions into `approved` or `rejected` are announced.
pub fn status_notification(change: &StatusChange, from_address: &str) -> Option<Notification> {
    if change.previous == change.current {
        return None;
    }

    let body = match change.current {
        ApprovalStatus::Approved => APPROVED_BODY,
        ApprovalStatus::Rejected => REJECTED_BODY,
        ApprovalStatus::Pending => return None,
    };

    Some(Notification {
        from: from_address.to_string(),
        to: change.email.clone(),
        subject: STATUS_UPDATED_SUBJECT.to_string(),
        body: body.to_string(),
    })
}

/// Announce a status change. Delivery problems, including a send outliving
/// the notifier's deadline, are logged and never returned.
///
/// Returns whether a notification was delivered.
pub async fn notify_status_change(
    notifier: &dyn Notifier,
    from_address: &str,
    change: &StatusChange,
) -> bool {
    let Some(notification) = status_notification(change, from_address) else {
        return false;
    };

    if notification.to.trim().is_empty() {
        warn!(
            "Influencer {} has no email; skipping notification",
            change.account_id
        );
        return false;
    }

    let deadline = notifier.delivery_timeout();
    match tokio::time::timeout(deadline, notifier.send(&notification)).await {
        Ok(Ok(())) => {
            info!("Sent {} notification to {}", change.current, notification.to);
            true
        }
        Ok(Err(e)) => {
            error!(
                "Failed to send influencer status notification to {}: {}",
                notification.to, e
            );
            false
        }
        Err(_) => {
            error!(
                "Gave up on influencer status notification to {} after {:?}",
                notification.to, deadline
            );
            false
        }
    }
}

/// Notifier recording every message, optionally failing each send
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub sent: tokio::sync::Mutex<Vec<Notification>>,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            anyhow::bail!("mail server unavailable");
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

/// Notifier whose sends never finish
#[cfg(test)]
pub(crate) struct StalledNotifier {
    pub timeout: Duration,
}

#[cfg(test)]
#[async_trait]
impl Notifier for StalledNotifier {
    async fn send(&self, _notification: &Notification) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    fn delivery_timeout(&self) -> Duration {
        self.timeout
    }
}
