//! Baseline comparison: line-set subtraction with an ignore list.

use std::collections::HashSet;

/// Lines present on one side of a baseline/capture pair but not the other.
#[derive(Debug, Clone, Default)]
pub struct BaselineDiff {
    /// Lines in the capture that the baseline does not contain.
    pub additional: Vec<String>,

    /// Baseline lines missing from the capture.
    pub missing: Vec<String>,
}

impl BaselineDiff {
    pub fn is_empty(&self) -> bool {
        self.additional.is_empty() && self.missing.is_empty()
    }
}

/// Compare capture lines against baseline lines as sets, ordered by first
/// appearance, ignoring blank lines and lines containing an ignore entry.
pub fn baseline_diff(baseline: &str, current: &str, ignore: &[String]) -> BaselineDiff {
    let base_lines = significant_lines(baseline, ignore);
    let cur_lines = significant_lines(current, ignore);

    let base_set: HashSet<&str> = base_lines.iter().map(String::as_str).collect();
    let cur_set: HashSet<&str> = cur_lines.iter().map(String::as_str).collect();

    BaselineDiff {
        additional: cur_lines
            .iter()
            .filter(|l| !base_set.contains(l.as_str()))
            .cloned()
            .collect(),
        missing: base_lines
            .iter()
            .filter(|l| !cur_set.contains(l.as_str()))
            .cloned()
            .collect(),
    }
}

/// Trimmed, deduplicated, ignore-filtered lines in order of appearance.
fn significant_lines(text: &str, ignore: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            !ignore
                .iter()
                .any(|entry| !entry.trim().is_empty() && line.contains(entry.trim()))
        })
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignore() -> Vec<String> {
        vec![
            "Building configuration...".to_string(),
            "Current configuration".to_string(),
            "exit".to_string(),
        ]
    }

    #[test]
    fn test_identical_is_empty() {
        let text = "hostname SW1\ninterface Gi0/1\n";
        assert!(baseline_diff(text, text, &ignore()).is_empty());
    }

    #[test]
    fn test_ignored_lines_suppressed() {
        let baseline = "Building configuration...\nhostname SW1\n";
        let current = "Current configuration : 4189 bytes\nhostname SW1\n";
        assert!(baseline_diff(baseline, current, &ignore()).is_empty());
    }

    #[test]
    fn test_added_and_missing_reported() {
        let baseline = "hostname SW1\nsnmp-server community old\n";
        let current = "hostname SW1\nsnmp-server community new\n";
        let diff = baseline_diff(baseline, current, &ignore());
        assert_eq!(diff.additional, vec!["snmp-server community new"]);
        assert_eq!(diff.missing, vec!["snmp-server community old"]);
    }
}
