//! Snapshot store: dated configuration captures plus a per-device baseline.
//!
//! Layout (kept byte-compatible with the fleet's existing archives):
//!
//! ```text
//! <root>/<hostname> <host>/config/BaseLine <hostname>.txt
//! <root>/<hostname> <host>/config/<YYYY-MM-DD> <hostname>.txt
//! <root>/<hostname> <host>/analysis/...            (report artifacts)
//! ```
//!
//! The baseline is written once, on first contact, and never touched
//! again; dated files are overwritten when the same date is captured
//! twice. Diffs only ever compare today against yesterday or, lacking a
//! yesterday file, against the baseline.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};

use crate::error::{Result, StoreError};

/// Per-device dated snapshot storage.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

/// Paths produced by a successful write.
#[derive(Debug, Clone)]
pub struct WrittenSnapshot {
    /// The dated capture written this run.
    pub dated: PathBuf,

    /// The device's baseline file.
    pub baseline: PathBuf,

    /// Whether this run created the baseline (first contact).
    pub baseline_created: bool,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding everything for one device.
    pub fn device_dir(&self, hostname: &str, host: &str) -> PathBuf {
        self.root.join(format!("{hostname} {host}"))
    }

    /// Directory holding the device's snapshots.
    pub fn config_dir(&self, hostname: &str, host: &str) -> PathBuf {
        self.device_dir(hostname, host).join("config")
    }

    /// Directory holding the device's report artifacts.
    pub fn analysis_dir(&self, hostname: &str, host: &str) -> PathBuf {
        self.device_dir(hostname, host).join("analysis")
    }

    fn baseline_path(&self, hostname: &str, host: &str) -> PathBuf {
        self.config_dir(hostname, host)
            .join(format!("BaseLine {hostname}.txt"))
    }

    fn dated_path(&self, hostname: &str, host: &str, date: NaiveDate) -> PathBuf {
        self.config_dir(hostname, host)
            .join(format!("{date} {hostname}.txt"))
    }

    /// Persist a capture.
    ///
    /// On first contact the capture doubles as the baseline (written as a
    /// copy before the dated file). Re-writing the same date overwrites the
    /// dated file only.
    pub fn write(
        &self,
        host: &str,
        hostname: &str,
        date: NaiveDate,
        text: &str,
    ) -> Result<WrittenSnapshot> {
        let config_dir = self.config_dir(hostname, host);
        fs::create_dir_all(&config_dir).map_err(|e| io_error(&config_dir, e))?;

        let baseline = self.baseline_path(hostname, host);
        let baseline_created = !baseline.exists();
        if baseline_created {
            fs::write(&baseline, text).map_err(|e| io_error(&baseline, e))?;
            info!("baseline established for {hostname} ({host})");
        }

        let dated = self.dated_path(hostname, host, date);
        fs::write(&dated, text).map_err(|e| io_error(&dated, e))?;
        debug!("snapshot written: {}", dated.display());

        Ok(WrittenSnapshot {
            dated,
            baseline,
            baseline_created,
        })
    }

    /// Find the snapshot to diff today's capture against: yesterday's file
    /// if present, else the baseline.
    pub fn locate_previous(
        &self,
        host: &str,
        hostname: &str,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        if let Some(yesterday) = date.pred_opt() {
            let path = self.dated_path(hostname, host, yesterday);
            if path.exists() {
                return Ok(path);
            }
        }

        let baseline = self.baseline_path(hostname, host);
        if baseline.exists() {
            return Ok(baseline);
        }

        Err(StoreError::NoPriorSnapshot {
            host: host.to_string(),
        }
        .into())
    }

    /// Read a snapshot back.
    pub fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| io_error(path, e).into())
    }
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_write_creates_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let written = store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v1\n")
            .unwrap();
        assert!(written.baseline_created);
        assert_eq!(store.read(&written.baseline).unwrap(), "config v1\n");
        assert_eq!(store.read(&written.dated).unwrap(), "config v1\n");
    }

    #[test]
    fn test_baseline_immutable_after_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v1\n")
            .unwrap();
        let written = store
            .write("10.0.0.1", "SW1", date("2026-08-08"), "config v2\n")
            .unwrap();

        assert!(!written.baseline_created);
        assert_eq!(store.read(&written.baseline).unwrap(), "config v1\n");
        assert_eq!(store.read(&written.dated).unwrap(), "config v2\n");
    }

    #[test]
    fn test_same_date_overwrites_dated_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v1\n")
            .unwrap();
        let written = store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v1b\n")
            .unwrap();

        assert_eq!(store.read(&written.baseline).unwrap(), "config v1\n");
        assert_eq!(store.read(&written.dated).unwrap(), "config v1b\n");
    }

    #[test]
    fn test_locate_previous_prefers_yesterday() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .write("10.0.0.1", "SW1", date("2026-08-06"), "config v1\n")
            .unwrap();
        store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v2\n")
            .unwrap();

        let prev = store
            .locate_previous("10.0.0.1", "SW1", date("2026-08-07"))
            .unwrap();
        assert!(prev.to_string_lossy().contains("2026-08-06"));
    }

    #[test]
    fn test_locate_previous_falls_back_to_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .write("10.0.0.1", "SW1", date("2026-08-07"), "config v1\n")
            .unwrap();

        let prev = store
            .locate_previous("10.0.0.1", "SW1", date("2026-08-07"))
            .unwrap();
        assert!(prev.to_string_lossy().contains("BaseLine"));
    }

    #[test]
    fn test_locate_previous_without_anything_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let err = store
            .locate_previous("10.0.0.1", "SW1", date("2026-08-07"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Store(StoreError::NoPriorSnapshot { .. })
        ));
    }
}
