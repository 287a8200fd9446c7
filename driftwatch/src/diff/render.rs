//! Side-by-side HTML rendering of a snapshot pair.

use similar::{ChangeTag, TextDiff};

const STYLE: &str = "\
table.diff { border-collapse: collapse; font-family: monospace; width: 100%; }\n\
table.diff td { padding: 1px 6px; vertical-align: top; white-space: pre-wrap; width: 50%; }\n\
tr.del td:first-child { background-color: #ffdddd; }\n\
tr.ins td:last-child { background-color: #ddffdd; }\n\
th { text-align: left; border-bottom: 1px solid #888; }";

/// Render the full, unfiltered side-by-side diff document.
pub fn render_html(old: &str, new: &str, old_label: &str, new_label: &str) -> String {
    let diff = TextDiff::from_lines(old, new);

    let mut rows = String::new();
    for change in diff.iter_all_changes() {
        let value = change.value().trim_end_matches(['\r', '\n']);
        let (left, right, class) = match change.tag() {
            ChangeTag::Equal => (value, value, "eq"),
            ChangeTag::Delete => (value, "", "del"),
            ChangeTag::Insert => ("", value, "ins"),
        };
        rows.push_str(&format!(
            "<tr class=\"{class}\"><td>{}</td><td>{}</td></tr>\n",
            escape(left),
            escape(right)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>\n{STYLE}\n</style>\n</head>\n<body>\n\
         <table class=\"diff\">\n\
         <tr><th>{}</th><th>{}</th></tr>\n\
         {rows}</table>\n</body>\n</html>\n",
        escape(old_label),
        escape(new_label)
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_both_sides() {
        let html = render_html("a\nb\n", "a\nc\n", "yesterday", "today");
        assert!(html.contains("<th>yesterday</th>"));
        assert!(html.contains("tr class=\"del\""));
        assert!(html.contains("tr class=\"ins\""));
    }

    #[test]
    fn test_markup_escaped() {
        let html = render_html("<script>\n", "<script>\n", "a", "b");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
