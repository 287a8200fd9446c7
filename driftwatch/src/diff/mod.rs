//! Diff engine: three comparison passes over a snapshot pair.
//!
//! 1. A presentational side-by-side document for human review (unfiltered).
//! 2. A material line diff with known-noise lines suppressed; a non-empty
//!    result is what flips a device's drift verdict.
//! 3. A baseline line-set comparison against a configurable ignore list,
//!    reporting added and missing lines.
//!
//! All passes run over normalized text: configured volatile patterns
//! (password hashes, clock drift counters, uptime lines) have their
//! variable tails removed first so cosmetic churn never reads as drift.

mod baseline;
mod material;
mod render;

pub use baseline::BaselineDiff;
pub use material::MaterialDiff;

use regex::Regex;

use crate::error::{DiffError, Result};

/// Compiled diff configuration shared across a run.
pub struct DiffEngine {
    volatile: Vec<Regex>,
    ignore: Vec<String>,
}

impl DiffEngine {
    /// Compile the volatile-line patterns and keep the baseline ignore list.
    ///
    /// Each volatile pattern should capture the stable prefix of the line it
    /// matches; normalization rewrites the line to just that prefix. A
    /// pattern without a capture group removes its whole match.
    pub fn new(volatile_patterns: &[String], ignore: &[String]) -> Result<Self> {
        let volatile = volatile_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(DiffError::InvalidPattern)?;
        Ok(Self {
            volatile,
            ignore: ignore.to_vec(),
        })
    }

    /// Blank the volatile tails out of `text`.
    pub fn normalize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.volatile {
            out = pattern.replace_all(&out, "${1}").into_owned();
        }
        out
    }

    /// Material diff between two snapshots (normalized first).
    pub fn material(&self, old: &str, new: &str) -> MaterialDiff {
        material::material_diff(&self.normalize(old), &self.normalize(new))
    }

    /// Baseline line-set comparison (normalized first).
    pub fn baseline(&self, baseline: &str, current: &str) -> BaselineDiff {
        baseline::baseline_diff(
            &self.normalize(baseline),
            &self.normalize(current),
            &self.ignore,
        )
    }

    /// Side-by-side HTML document for human review. Unfiltered by design:
    /// reviewers see everything, including the noise the material pass
    /// suppresses.
    pub fn render_html(&self, old: &str, new: &str, old_label: &str, new_label: &str) -> String {
        render::render_html(old, new, old_label, new_label)
    }
}
