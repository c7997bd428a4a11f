//! Wiki-style link markers embedded in note content.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static WIKI_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]\n]+)\]\]").expect("valid wiki link regex"));

/// Renders the marker appended to a note when it is linked to `target`.
pub fn link_marker(target: &str) -> String {
    format!("\n[[{target}]]\n")
}

/// Returns distinct marker targets in `content`, sorted.
pub fn marker_targets(content: &str) -> Vec<String> {
    WIKI_LINK_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|target| !target.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
