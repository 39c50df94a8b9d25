use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::normalize::CanonicalText;

pub const NO_LINE_CHANGES: &str = "No line changes.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: ChangeKind,
    pub line: String,
    pub count: usize,
}

impl DiffEntry {
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            ChangeKind::Added => "+ ",
            ChangeKind::Removed => "- ",
        };
        let suffix = if self.count > 1 {
            format!(" x{}", self.count)
        } else {
            String::new()
        };
        format!("{prefix}{}{suffix}", self.line)
    }
}

/// Outcome of comparing two canonical texts. `Unchanged` is a sentinel
/// distinct from an empty entry list so renderers can special-case it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffReport {
    Unchanged,
    Changed(Vec<DiffEntry>),
}

impl DiffReport {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, DiffReport::Unchanged)
    }

    pub fn render(&self) -> String {
        match self {
            DiffReport::Unchanged => NO_LINE_CHANGES.to_string(),
            DiffReport::Changed(entries) => entries
                .iter()
                .map(DiffEntry::render)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Multiset line diff: insensitive to reordering, sensitive to line
/// presence and occurrence count. Distinct lines are visited in
/// lexicographic order.
pub fn diff_lines(old: &CanonicalText, new: &CanonicalText) -> DiffReport {
    if old == new {
        return DiffReport::Unchanged;
    }
    if old.is_empty() && new.is_empty() {
        return DiffReport::Unchanged;
    }

    let old_counts = line_counts(old);
    let new_counts = line_counts(new);

    let mut lines = BTreeSet::new();
    lines.extend(old_counts.keys().copied());
    lines.extend(new_counts.keys().copied());

    let mut entries = Vec::new();
    for line in lines {
        let old_count = old_counts.get(line).copied().unwrap_or(0);
        let new_count = new_counts.get(line).copied().unwrap_or(0);
        if new_count > old_count {
            entries.push(DiffEntry {
                kind: ChangeKind::Added,
                line: line.to_string(),
                count: new_count - old_count,
            });
        } else if old_count > new_count {
            entries.push(DiffEntry {
                kind: ChangeKind::Removed,
                line: line.to_string(),
                count: old_count - new_count,
            });
        }
    }

    if entries.is_empty() {
        DiffReport::Unchanged
    } else {
        DiffReport::Changed(entries)
    }
}

fn line_counts(text: &CanonicalText) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for line in text.lines() {
        *counts.entry(line.as_str()).or_insert(0) += 1;
    }
    counts
}
