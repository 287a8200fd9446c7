//! Report artifacts: per-pair diff documents, the cumulative comparison
//! record, and the run/error logs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::diff::{BaselineDiff, MaterialDiff};
use crate::error::{ReportError, Result};
use crate::notify::RunSummary;

/// File names inside a device's analysis directory.
pub const PRESENTATIONAL_FILE: &str = "result.html";
pub const MATERIAL_FILE: &str = "Change.txt";
pub const COMPARISON_FILE: &str = "result.csv";

/// One row of the cumulative comparison record.
#[derive(Debug, Serialize)]
pub struct ComparisonRow {
    /// The capture that was compared.
    pub comparison: String,

    /// What it was compared against.
    pub baseline: String,

    /// Lines present in the capture only.
    pub additional: String,

    /// Lines present in the reference only.
    pub missing: String,
}

impl ComparisonRow {
    /// Build a row from a baseline diff and the two file names.
    pub fn new(comparison: &Path, baseline: &Path, diff: &BaselineDiff) -> Self {
        Self {
            comparison: file_name(comparison),
            baseline: file_name(baseline),
            additional: diff.additional.join("\n"),
            missing: diff.missing.join("\n"),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write the presentational diff document, replacing last run's.
pub fn write_presentational(analysis_dir: &Path, html: &str) -> Result<()> {
    let path = analysis_dir.join(PRESENTATIONAL_FILE);
    fs::create_dir_all(analysis_dir).map_err(|e| io_error(analysis_dir, e))?;
    fs::write(&path, html).map_err(|e| io_error(&path, e))?;
    Ok(())
}

/// Write the material change-file, replacing last run's.
pub fn write_material(analysis_dir: &Path, diff: &MaterialDiff) -> Result<()> {
    let path = analysis_dir.join(MATERIAL_FILE);
    fs::create_dir_all(analysis_dir).map_err(|e| io_error(analysis_dir, e))?;
    fs::write(&path, diff.to_text()).map_err(|e| io_error(&path, e))?;
    Ok(())
}

/// Append a row to the cumulative comparison record, writing the header
/// exactly when the file is first created.
pub fn append_comparison(analysis_dir: &Path, row: &ComparisonRow) -> Result<()> {
    let path = analysis_dir.join(COMPARISON_FILE);
    fs::create_dir_all(analysis_dir).map_err(|e| io_error(analysis_dir, e))?;

    let new_file = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| io_error(&path, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(new_file)
        .from_writer(file);
    writer.serialize(row).map_err(ReportError::Csv)?;
    writer.flush().map_err(|e| io_error(&path, e))?;
    Ok(())
}

/// Append the framed, timestamped run entry to the run log.
pub fn append_run_log(path: &Path, timestamp: &str, summary: &RunSummary) -> Result<()> {
    let mut entry = String::new();

    if summary.devices_failed() == 0 {
        entry.push_str(&format!(
            "All config backups succeeded! {} devices backed up.\n",
            summary.devices_attempted
        ));
    } else {
        entry.push_str(&format!(
            "Config backup incomplete! {} devices attempted, {} failed.\n",
            summary.devices_attempted,
            summary.devices_failed()
        ));
        entry.push_str(&format!("\tFailed hosts: {}\n", summary.failed_hosts().join(", ")));
    }

    if summary.devices_with_diff() == 0 {
        entry.push_str(&format!(
            "No configuration differences. {} devices compared.\n",
            summary.devices_compared
        ));
    } else {
        entry.push_str(&format!(
            "Configuration drift detected! {} devices compared, {} with differences.\n",
            summary.devices_compared,
            summary.devices_with_diff()
        ));
        entry.push_str(&format!(
            "\tDiffering hosts: {}\n",
            summary.differing.join(", ")
        ));
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error(path, e))?;
    writeln!(file, "{:=^70}", format!(" {timestamp} ")).map_err(|e| io_error(path, e))?;
    file.write_all(entry.as_bytes()).map_err(|e| io_error(path, e))?;
    Ok(())
}

/// Append per-device failure detail to the error log. No entry is written
/// for a clean run.
pub fn append_error_log(path: &Path, timestamp: &str, detail: &str) -> Result<()> {
    if detail.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error(path, e))?;
    writeln!(file, "{:=^50}", format!(" {timestamp} ")).map_err(|e| io_error(path, e))?;
    file.write_all(detail.as_bytes()).map_err(|e| io_error(path, e))?;
    file.write_all(b"\n").map_err(|e| io_error(path, e))?;
    Ok(())
}

fn io_error(path: &Path, source: io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DeviceFailure;

    #[test]
    fn test_comparison_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let row = ComparisonRow {
            comparison: "2026-08-07 SW1.txt".into(),
            baseline: "BaseLine SW1.txt".into(),
            additional: "snmp-server community new".into(),
            missing: String::new(),
        };

        append_comparison(dir.path(), &row).unwrap();
        append_comparison(dir.path(), &row).unwrap();

        let content = fs::read_to_string(dir.path().join(COMPARISON_FILE)).unwrap();
        assert_eq!(content.matches("comparison,baseline").count(), 1);
        assert_eq!(content.matches("2026-08-07 SW1.txt").count(), 2);
    }

    #[test]
    fn test_run_log_framed_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.log");

        let mut summary = RunSummary::default();
        summary.devices_attempted = 3;
        summary.devices_compared = 2;
        summary.failed.push(DeviceFailure {
            host: "10.0.0.9".into(),
            error: "Connect timed out after 20s".into(),
        });
        summary.differing.push("10.0.0.1".into());

        append_run_log(&path, "2026-08-07 06:00:00", &summary).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("=== 2026-08-07 06:00:00 ==="));
        assert!(content.contains("3 devices attempted, 1 failed"));
        assert!(content.contains("Failed hosts: 10.0.0.9"));
        assert!(content.contains("Differing hosts: 10.0.0.1"));
    }

    #[test]
    fn test_error_log_skipped_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.log");
        append_error_log(&path, "2026-08-07 06:00:00", "").unwrap();
        assert!(!path.exists());
    }
}
