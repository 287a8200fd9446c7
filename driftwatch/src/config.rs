//! Run configuration.
//!
//! Everything tunable — output locations, worker pool size, timeouts, the
//! pagination probe budget, and the noise/ignore pattern sets — lives in
//! one structure handed to the coordinator at start-up. Credentials come
//! from the inventory, never from here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::dialect::CaptureSettings;
use crate::error::{ConfigError, Result};

/// Full run configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Root directory for per-device snapshot/report trees.
    pub output_root: PathBuf,

    /// Appended run log.
    pub run_log: PathBuf,

    /// Appended per-device failure log.
    pub error_log: PathBuf,

    /// Worker pool size for device processing.
    pub worker_count: usize,

    /// Connection establishment timeout, seconds.
    pub connect_timeout_secs: u64,

    /// Per-read marker timeout, seconds.
    pub read_timeout_secs: u64,

    /// Bound on one device's whole capture/diff cycle, seconds.
    pub device_timeout_secs: u64,

    /// Maximum blank continuation probes before paged output is accepted
    /// as complete.
    pub pagination_probe_budget: usize,

    /// Volatile-line patterns blanked before any diff. Each pattern's first
    /// capture group is the stable prefix kept in place of the line.
    pub volatile_patterns: Vec<String>,

    /// Lines suppressed by the baseline comparison (matched by substring).
    pub baseline_ignore: Vec<String>,

    /// Optional webhook notification target.
    pub webhook: Option<WebhookConfig>,
}

/// Webhook notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint the JSON status card is POSTed to.
    pub endpoint: String,

    /// Card title.
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Configuration backup".to_string()
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("devices"),
            run_log: PathBuf::from("config.log"),
            error_log: PathBuf::from("error.log"),
            worker_count: 4,
            connect_timeout_secs: 20,
            read_timeout_secs: 30,
            device_timeout_secs: 180,
            pagination_probe_budget: 50,
            volatile_patterns: vec![
                r"(?m)^(\s*password \d ).*$".to_string(),
                r"(?m)^(ntp clock-period ).*$".to_string(),
                r"(?m)^(System Up Time).*$".to_string(),
                r"(?m)^(Current Time).*$".to_string(),
            ],
            baseline_ignore: vec![
                "Building configuration...".to_string(),
                "Current configuration".to_string(),
                "Last configuration change".to_string(),
                "NVRAM config last updated".to_string(),
                "---- More (q/Q to quit) ----".to_string(),
                "exit".to_string(),
            ],
            webhook: None,
        }
    }
}

impl DriftConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// The settings handed to dialect drivers.
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            probe_budget: self.pagination_probe_budget,
        }
    }

    /// Bound on one device's whole cycle.
    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_carry_noise_sets() {
        let config = DriftConfig::default();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.pagination_probe_budget, 50);
        assert!(config
            .baseline_ignore
            .iter()
            .any(|l| l.contains("Building configuration")));
        assert!(config
            .volatile_patterns
            .iter()
            .any(|p| p.contains("ntp clock-period")));
    }

    #[test]
    fn test_load_partial_toml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "output_root = \"/var/lib/driftwatch\"\nworker_count = 8\n\n[webhook]\nendpoint = \"https://hooks.example/cfg\"\n"
        )
        .unwrap();

        let config = DriftConfig::load(file.path()).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/var/lib/driftwatch"));
        assert_eq!(config.worker_count, 8);
        // Untouched fields keep their defaults
        assert_eq!(config.pagination_probe_budget, 50);
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.endpoint, "https://hooks.example/cfg");
        assert_eq!(webhook.title, "Configuration backup");
    }
}
