use crate::models::{PayoutRecord, Submission};
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Workflow events forwarded to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    Approved {
        submission: Submission,
    },
    Rejected {
        submission: Submission,
        reason: String,
    },
    PaymentSent {
        submission: Submission,
        payout: PayoutRecord,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Approved { .. } => "approved",
            Notification::Rejected { .. } => "rejected",
            Notification::PaymentSent { .. } => "payment_sent",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::Approved { submission }
            | Notification::Rejected { submission, .. }
            | Notification::PaymentSent { submission, .. } => &submission.email,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            kind = notification.kind(),
            recipient = notification.recipient(),
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Posts notifications as JSON to the email function endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("Notification endpoint returned {}", response.status());
        }

        tracing::debug!(kind = notification.kind(), "Notification delivered");
        Ok(())
    }
}
