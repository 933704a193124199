use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

/// Structured summary of one sync run, delivered to the configured webhook
/// and mirrored into the change log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub action: String,
    pub added_count: usize,
    pub removed_count: usize,
    pub updated_count: usize,
    pub timestamp: DateTime<Utc>,
}

pub async fn send_summary(webhook_url: &str, summary: &RunSummary) -> Result<()> {
    let client = Client::new();
    let response = client
        .post(webhook_url)
        .json(summary)
        .send()
        .await
        .context("Failed to send run summary webhook")?;

    if response.status().is_success() {
        info!("Sent run summary notification ({})", summary.action);
        Ok(())
    } else {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!("Summary webhook failed with status {}: {}", status, error_text);
        Err(anyhow::anyhow!("Summary webhook failed: {} - {}", status, error_text))
    }
}
