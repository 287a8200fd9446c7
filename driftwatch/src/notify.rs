//! Run summary and the notification collaborator.
//!
//! The coordinator builds one [`RunSummary`] per run and hands it to a
//! [`Notifier`] exactly once. The built-in [`WebhookNotifier`] posts a
//! formatted status card as JSON; delivery failure is the caller's to log,
//! never fatal to the run.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::json;

use crate::config::WebhookConfig;
use crate::error::{NotifyError, Result};

/// One failed device: identity plus the captured error text.
#[derive(Debug, Clone)]
pub struct DeviceFailure {
    pub host: String,
    pub error: String,
}

/// Aggregate outcome of one run. Entry order within the failed/differing
/// lists is not significant.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Devices dispatched to a known dialect driver.
    pub devices_attempted: usize,

    /// Devices whose capture succeeded and was diffed.
    pub devices_compared: usize,

    /// Devices whose capture failed, with error text.
    pub failed: Vec<DeviceFailure>,

    /// Hosts whose configuration materially changed.
    pub differing: Vec<String>,
}

impl RunSummary {
    pub fn devices_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn devices_with_diff(&self) -> usize {
        self.differing.len()
    }

    pub fn failed_hosts(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.host.clone()).collect()
    }

    /// Fold a worker's partial summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.devices_attempted += other.devices_attempted;
        self.devices_compared += other.devices_compared;
        self.failed.extend(other.failed);
        self.differing.extend(other.differing);
    }

    /// Per-device failure detail for the error log.
    pub fn failure_detail(&self) -> String {
        let mut out = String::new();
        for failure in &self.failed {
            out.push_str(&format!(
                "Error host: {}\nError: {}\n",
                failure.host, failure.error
            ));
        }
        out
    }

    /// The human-readable status message the notification carries.
    pub fn format_status(&self, timestamp: &str) -> String {
        let mut out = format!("{timestamp}\n");

        if self.failed.is_empty() {
            out.push_str(&format!(
                "Configuration backup succeeded: {} devices backed up.\n",
                self.devices_attempted
            ));
        } else {
            out.push_str(&format!(
                "Configuration backup incomplete: {} devices attempted, {} failed.\n",
                self.devices_attempted,
                self.devices_failed()
            ));
            out.push_str(&format!("Failed hosts: {}\n", self.failed_hosts().join(", ")));
        }

        if self.differing.is_empty() {
            out.push_str(&format!(
                "Drift check complete: {} devices compared, no differences.\n",
                self.devices_compared
            ));
        } else {
            out.push_str(&format!(
                "Configuration drift detected: {} devices compared, {} with differences.\n",
                self.devices_compared,
                self.devices_with_diff()
            ));
            out.push_str(&format!("Differing hosts: {}\n", self.differing.join(", ")));
        }

        out
    }
}

/// Consumes the run summary and emits a status message somewhere.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &RunSummary, timestamp: &str) -> Result<()>;
}

/// Posts the status card to a JSON webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    title: String,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(NotifyError::Http)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            title: config.title.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, summary: &RunSummary, timestamp: &str) -> Result<()> {
        let payload = json!({
            "title": self.title,
            "timestamp": timestamp,
            "text": summary.format_status(timestamp),
            "backup": {
                "attempted": summary.devices_attempted,
                "failed": summary.devices_failed(),
                "failed_hosts": summary.failed_hosts(),
            },
            "drift": {
                "compared": summary.devices_compared,
                "differing": summary.devices_with_diff(),
                "differing_hosts": summary.differing,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(NotifyError::Http)?;
        response.error_for_status().map_err(NotifyError::Http)?;
        debug!("notification delivered to {}", self.endpoint);
        Ok(())
    }
}
