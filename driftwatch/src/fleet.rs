//! Run coordinator: drives the fleet through one capture/diff cycle.
//!
//! Devices are drained by a bounded worker pool; each worker owns its
//! session exclusively for the duration of one device. Any per-device
//! failure is downgraded to a recorded entry and the run continues — a run
//! always completes and always produces a summary, even if every device
//! failed. Cancellation aborts in-flight devices before anything is
//! persisted for them.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::DriftConfig;
use crate::dialect::{CaptureSettings, DialectId, DialectRegistry};
use crate::diff::DiffEngine;
use crate::error::{DialectError, Result};
use crate::inventory::DeviceRecord;
use crate::notify::{DeviceFailure, RunSummary};
use crate::report::{self, ComparisonRow};
use crate::snapshot::SnapshotStore;
use crate::transport::SessionFactory;

/// Outcome of one device's successful cycle.
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub host: String,
    pub hostname: String,
    pub materially_changed: bool,
}

enum Outcome {
    Success(DeviceReport),
    Failed { host: String, error: String },
    Cancelled { host: String },
}

/// Shared state for one run, cloned into every worker.
struct RunContext {
    registry: DialectRegistry,
    factory: Arc<dyn SessionFactory>,
    settings: CaptureSettings,
    store: SnapshotStore,
    diff: DiffEngine,
    date: NaiveDate,
}

/// Iterates the inventory once and aggregates the run summary.
pub struct RunCoordinator {
    config: DriftConfig,
    factory: Arc<dyn SessionFactory>,
    cancel: CancellationToken,
}

impl RunCoordinator {
    pub fn new(config: DriftConfig, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            factory,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external cancellation token (operator abort).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process the whole inventory and return the run summary.
    ///
    /// Devices with an unknown dialect are skipped up front (logged, not
    /// counted as attempted). Everything else is dispatched to the worker
    /// pool; per-device errors land in the summary's failed list.
    pub async fn run(&self, devices: Vec<DeviceRecord>) -> Result<RunSummary> {
        let context = Arc::new(RunContext {
            registry: DialectRegistry::with_builtins(),
            factory: self.factory.clone(),
            settings: self.config.capture_settings(),
            store: SnapshotStore::new(self.config.output_root.clone()),
            diff: DiffEngine::new(
                &self.config.volatile_patterns,
                &self.config.baseline_ignore,
            )?,
            date: Local::now().date_naive(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.worker_count.max(1)));
        let device_timeout = self.config.device_timeout();

        let mut summary = RunSummary::default();
        let mut workers = JoinSet::new();

        for device in devices {
            let Some(dialect) = DialectId::parse(&device.dialect_id) else {
                warn!(
                    "unknown dialect '{}' for {}; device skipped",
                    device.dialect_id, device.host
                );
                continue;
            };
            summary.devices_attempted += 1;

            let context = context.clone();
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();

            workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Outcome::Failed {
                            host: device.host,
                            error: "worker pool shut down".to_string(),
                        };
                    }
                };

                let host = device.host.clone();
                if cancel.is_cancelled() {
                    return Outcome::Cancelled { host };
                }

                tokio::select! {
                    _ = cancel.cancelled() => Outcome::Cancelled { host },
                    result = tokio::time::timeout(
                        device_timeout,
                        process_device(device, dialect, context.as_ref()),
                    ) => match result {
                        Err(_) => Outcome::Failed {
                            host,
                            error: format!("device cycle exceeded {device_timeout:?}"),
                        },
                        Ok(Ok(report)) => Outcome::Success(report),
                        Ok(Err(e)) => Outcome::Failed {
                            host,
                            error: e.to_string(),
                        },
                    },
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => fold(&mut summary, outcome),
                Err(e) => error!("device worker panicked: {e}"),
            }
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        if let Err(e) = report::append_run_log(&self.config.run_log, &timestamp, &summary) {
            error!("failed to append run log: {e}");
        }
        if let Err(e) =
            report::append_error_log(&self.config.error_log, &timestamp, &summary.failure_detail())
        {
            error!("failed to append error log: {e}");
        }

        Ok(summary)
    }
}

fn fold(summary: &mut RunSummary, outcome: Outcome) {
    match outcome {
        Outcome::Success(report) => {
            summary.devices_compared += 1;
            if report.materially_changed {
                info!(
                    "configuration drift on {} ({})",
                    report.hostname, report.host
                );
                summary.differing.push(report.host);
            }
        }
        Outcome::Failed { host, error } => {
            warn!("capture failed for {host}: {error}");
            summary.failed.push(DeviceFailure { host, error });
        }
        Outcome::Cancelled { host } => {
            summary.failed.push(DeviceFailure {
                host,
                error: "run cancelled before completion".to_string(),
            });
        }
    }
}

/// One device's full cycle: capture, persist, diff, write artifacts.
///
/// Persistence happens only after the capture completes, so a failed or
/// cancelled capture never creates or overwrites a snapshot.
async fn process_device(
    device: DeviceRecord,
    dialect: DialectId,
    context: &RunContext,
) -> Result<DeviceReport> {
    let driver = context
        .registry
        .get(dialect)
        .ok_or_else(|| DialectError::UnknownDialect {
            id: device.dialect_id.clone(),
        })?;

    info!("capturing {} ({dialect})", device.host);
    let capture = driver
        .capture(&device, context.factory.as_ref(), &context.settings)
        .await?;

    let written = context
        .store
        .write(&capture.host, &capture.hostname, context.date, &capture.text)?;
    let previous_path =
        context
            .store
            .locate_previous(&capture.host, &capture.hostname, context.date)?;
    let previous_text = context.store.read(&previous_path)?;

    let analysis_dir = context.store.analysis_dir(&capture.hostname, &capture.host);
    let previous_label = previous_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let current_label = written
        .dated
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let html = context.diff.render_html(
        &previous_text,
        &capture.text,
        &previous_label,
        &current_label,
    );
    report::write_presentational(&analysis_dir, &html)?;

    let material = context.diff.material(&previous_text, &capture.text);
    report::write_material(&analysis_dir, &material)?;

    let baseline_diff = context.diff.baseline(&previous_text, &capture.text);
    report::append_comparison(
        &analysis_dir,
        &ComparisonRow::new(&written.dated, &previous_path, &baseline_diff),
    )?;

    Ok(DeviceReport {
        host: capture.host,
        hostname: capture.hostname,
        materially_changed: material.materially_changed,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use secrecy::SecretString;

    use super::*;
    use crate::transport::testing::{ScriptOutcome, ScriptedFactory, ScriptedSession};

    fn device(host: &str, dialect_id: &str) -> DeviceRecord {
        DeviceRecord {
            host: host.into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
            secret: None,
            dialect_id: dialect_id.into(),
        }
    }

    fn cisco_session(description: &str) -> ScriptedSession {
        let config = format!(
            "show running-config\r\nBuilding configuration...\n\nhostname SW1\ninterface Gi0/1\n description {description}\nend\nSW1#"
        );
        ScriptedSession::new(vec![b"terminal length 0\r\nSW1#", config.as_bytes()])
    }

    fn zyxel_session(vlan_name: &str) -> ScriptedSession {
        let config = format!(
            "show running-config\r\nvlan 10\n name {vlan_name}\nexit\nACC-SW#"
        );
        ScriptedSession::new(vec![
            config.as_bytes(),
            b"show system-information\r\nSystemName: ACC-SW\nACC-SW#",
        ])
    }

    fn config_for(dir: &std::path::Path) -> DriftConfig {
        DriftConfig {
            output_root: dir.join("devices"),
            run_log: dir.join("config.log"),
            error_log: dir.join("error.log"),
            ..DriftConfig::default()
        }
    }

    #[tokio::test]
    async fn test_first_run_mixed_dialects_with_unknown_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        factory.push("10.0.0.1", ScriptOutcome::Session(cisco_session("uplink")));
        factory.push("10.0.0.2", ScriptOutcome::Session(zyxel_session("users")));

        let coordinator = RunCoordinator::new(config_for(dir.path()), factory);
        let summary = coordinator
            .run(vec![
                device("10.0.0.1", "cisco_ios"),
                device("10.0.0.2", "zyxel_os"),
                device("10.0.0.3", "frobozz_os"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.devices_attempted, 2);
        assert_eq!(summary.devices_failed(), 0);
        assert_eq!(summary.devices_compared, 2);
        // First contact: diffed against the freshly written baseline
        assert!(summary.differing.is_empty());

        let cisco_baseline = dir
            .path()
            .join("devices/SW1 10.0.0.1/config/BaseLine SW1.txt");
        let zyxel_baseline = dir
            .path()
            .join("devices/ACC-SW 10.0.0.2/config/BaseLine ACC-SW.txt");
        assert!(cisco_baseline.exists());
        assert!(zyxel_baseline.exists());

        // Run log written
        assert!(fs::read_to_string(dir.path().join("config.log"))
            .unwrap()
            .contains("All config backups succeeded"));
    }

    #[tokio::test]
    async fn test_second_run_flags_only_the_changed_device() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        // First run establishes baselines
        factory.push("10.0.0.1", ScriptOutcome::Session(cisco_session("uplink")));
        factory.push("10.0.0.2", ScriptOutcome::Session(zyxel_session("users")));
        // Second run: cisco byte-identical, zyxel has one real line changed
        factory.push("10.0.0.1", ScriptOutcome::Session(cisco_session("uplink")));
        factory.push("10.0.0.2", ScriptOutcome::Session(zyxel_session("guests")));

        let config = config_for(dir.path());
        let inventory = vec![
            device("10.0.0.1", "cisco_ios"),
            device("10.0.0.2", "zyxel_os"),
        ];

        let coordinator = RunCoordinator::new(config.clone(), factory.clone());
        coordinator.run(inventory.clone()).await.unwrap();

        let coordinator = RunCoordinator::new(config, factory);
        let summary = coordinator.run(inventory).await.unwrap();

        assert_eq!(summary.devices_failed(), 0);
        assert_eq!(summary.differing, vec!["10.0.0.2".to_string()]);

        let change_file = dir
            .path()
            .join("devices/ACC-SW 10.0.0.2/analysis/Change.txt");
        let changes = fs::read_to_string(change_file).unwrap();
        assert!(changes.contains("-  name users"));
        assert!(changes.contains("+  name guests"));
        assert_eq!(changes.lines().count(), 2);

        // The unchanged device's change-file is empty
        let quiet_file = dir.path().join("devices/SW1 10.0.0.1/analysis/Change.txt");
        assert_eq!(fs::read_to_string(quiet_file).unwrap(), "");

        // Baseline still holds the first capture
        let baseline = dir
            .path()
            .join("devices/ACC-SW 10.0.0.2/config/BaseLine ACC-SW.txt");
        assert!(fs::read_to_string(baseline).unwrap().contains("name users"));
    }

    #[tokio::test]
    async fn test_timeout_recorded_and_run_completes() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        factory.push("10.0.0.1", ScriptOutcome::ConnectTimeout);
        factory.push("10.0.0.2", ScriptOutcome::Session(zyxel_session("users")));

        let coordinator = RunCoordinator::new(config_for(dir.path()), factory);
        let summary = coordinator
            .run(vec![
                device("10.0.0.1", "cisco_ios"),
                device("10.0.0.2", "zyxel_os"),
            ])
            .await
            .unwrap();

        assert_eq!(summary.devices_attempted, 2);
        assert_eq!(summary.devices_failed(), 1);
        assert_eq!(summary.failed[0].host, "10.0.0.1");
        assert!(summary.failed[0].error.contains("timed out"));
        assert_eq!(summary.devices_compared, 1);

        // The failed device never got a snapshot directory
        let entries: Vec<_> = fs::read_dir(dir.path().join("devices"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["ACC-SW 10.0.0.2".to_string()]);

        // Error log captured the failure detail
        let errors = fs::read_to_string(dir.path().join("error.log")).unwrap();
        assert!(errors.contains("Error host: 10.0.0.1"));
    }

    #[tokio::test]
    async fn test_cancelled_run_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let factory = Arc::new(ScriptedFactory::new());
        factory.push("10.0.0.1", ScriptOutcome::Session(cisco_session("uplink")));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator =
            RunCoordinator::new(config_for(dir.path()), factory).with_cancellation(cancel);
        let summary = coordinator
            .run(vec![device("10.0.0.1", "cisco_ios")])
            .await
            .unwrap();

        assert_eq!(summary.devices_compared, 0);
        assert_eq!(summary.devices_failed(), 1);
        assert!(!dir.path().join("devices").exists());
    }
}
