//! Material diff: the line-level change set that decides drift.

use similar::{ChangeTag, TextDiff};

/// Filtered line-level change set between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct MaterialDiff {
    /// Surviving changed lines, each prefixed `- ` or `+ `.
    pub lines: Vec<String>,

    /// True when at least one real change survived the noise filter.
    pub materially_changed: bool,
}

impl MaterialDiff {
    /// Render the surviving lines, one per row, for the change-file.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Compute the material diff.
///
/// Only inserted and deleted lines are considered, and known noise is
/// dropped in a single filter pass: comment-marker-only lines (`!`), a
/// lone `end`, and blank lines.
pub fn material_diff(old: &str, new: &str) -> MaterialDiff {
    let diff = TextDiff::from_lines(old, new);

    let lines: Vec<String> = diff
        .iter_all_changes()
        .filter_map(|change| {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => return None,
            };
            let content = change.value().trim_end_matches(['\r', '\n']);
            Some(format!("{sign} {content}"))
        })
        .filter(|line| is_material(line))
        .collect();

    MaterialDiff {
        materially_changed: !lines.is_empty(),
        lines,
    }
}

/// Whether a signed diff line represents a real configuration change.
fn is_material(line: &str) -> bool {
    let content = line[1..].trim();
    if content.is_empty() {
        return false;
    }
    if content == "end" {
        return false;
    }
    if content.starts_with('!') {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_diff_is_empty() {
        let text = "hostname SW1\ninterface Gi0/1\nend\n";
        let diff = material_diff(text, text);
        assert!(diff.lines.is_empty());
        assert!(!diff.materially_changed);
    }

    #[test]
    fn test_single_real_change_survives() {
        let old = "hostname SW1\ninterface Gi0/1\n description uplink\nend\n";
        let new = "hostname SW1\ninterface Gi0/1\n description downlink\nend\n";
        let diff = material_diff(old, new);
        assert!(diff.materially_changed);
        assert_eq!(
            diff.lines,
            vec!["-  description uplink", "+  description downlink"]
        );
    }

    #[test]
    fn test_noise_only_changes_filtered() {
        let old = "hostname SW1\n!\nend\n";
        let new = "hostname SW1\n! Last updated by pager\n\nend\n\n";
        let diff = material_diff(old, new);
        assert!(!diff.materially_changed, "noise survived: {:?}", diff.lines);
    }

    #[test]
    fn test_lone_end_and_blank_filtered() {
        let old = "hostname SW1\n";
        let new = "hostname SW1\nend\n   \n";
        let diff = material_diff(old, new);
        assert!(!diff.materially_changed);
    }

    #[test]
    fn test_empty_capture_is_total_removal() {
        let old = "hostname SW1\ninterface Gi0/1\n";
        let diff = material_diff(old, "");
        assert!(diff.materially_changed);
        assert_eq!(diff.lines.len(), 2);
        assert!(diff.lines.iter().all(|l| l.starts_with('-')));
    }
}
