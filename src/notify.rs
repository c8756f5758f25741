//! # Notifications
//!
//! Outbound notifications for noteworthy events: high-scoring leads and perk
//! approval decisions. Delivery is an external collaborator, so the default
//! sink just logs and an optional webhook sink posts the event as JSON.
//! Notification is best-effort by contract and never fails the write that
//! triggered it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::NotifyConfig;
use crate::models::{lead, perk};

/// A notification-worthy event, serialized as the webhook payload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    HighScoreLead {
        lead_id: Uuid,
        name: String,
        email: String,
        lead_score: i32,
        perk_title: Option<String>,
    },
    PerkApproval {
        perk_id: Uuid,
        title: String,
        approval_status: String,
        approval_note: Option<String>,
    },
}

impl NotifyEvent {
    pub fn high_score_lead(lead: &lead::Model) -> Self {
        Self::HighScoreLead {
            lead_id: lead.id,
            name: lead.name.clone(),
            email: lead.email.clone(),
            lead_score: lead.lead_score,
            perk_title: lead.perk_title.clone(),
        }
    }

    pub fn perk_approval(perk: &perk::Model) -> Self {
        Self::PerkApproval {
            perk_id: perk.id,
            title: perk.title.clone(),
            approval_status: perk.approval_status.clone(),
            approval_note: perk.approval_note.clone(),
        }
    }
}

/// Delivery sink for [`NotifyEvent`]s.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short sink name for startup logging.
    fn name(&self) -> &'static str;

    async fn send(&self, event: &NotifyEvent) -> Result<()>;
}

/// Default sink when no webhook is configured. Events land in the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, event: &NotifyEvent) -> Result<()> {
        info!(?event, "Notification event");
        Ok(())
    }
}

/// Posts events as JSON to the configured webhook URL.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout_ms: u64) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");
        Self { http_client, url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, event: &NotifyEvent) -> Result<()> {
        let response = self
            .http_client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("notification webhook request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("notification webhook returned HTTP {}", status);
        }
        Ok(())
    }
}

/// Select the sink the config describes.
pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.timeout_ms)),
        None => Arc::new(LogNotifier),
    }
}

/// Deliver an event without letting delivery problems escape. Failures are
/// logged and counted, never returned.
pub async fn notify_best_effort(notifier: &Arc<dyn Notifier>, event: NotifyEvent) {
    match notifier.send(&event).await {
        Ok(()) => {
            counter!("notifications_sent_total", "sink" => notifier.name()).increment(1);
        }
        Err(err) => {
            warn!(error = ?err, sink = notifier.name(), "Failed to deliver notification");
            counter!("notifications_failed_total", "sink" => notifier.name()).increment(1);
        }
    }
}
