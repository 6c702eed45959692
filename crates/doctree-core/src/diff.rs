//! Line-level diff between two content versions
//!
//! Greedy comparison with a three-line resync lookahead on each side; lines
//! that fail to resync are reported as modifications. Good enough for human
//! review of markdown documents, not a minimal edit script.

use serde::{Deserialize, Serialize};

const RESYNC_LOOKAHEAD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Add,
    Delete,
    Modify,
    Equal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: DiffKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub from_version: u64,
    pub to_version: u64,
    pub lines: Vec<DiffLine>,
    pub summary: DiffSummary,
}

/// Compare two content bodies line by line
pub fn diff_content(old: &str, new: &str, from_version: u64, to_version: u64) -> DiffResult {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let lines = compute(&old_lines, &new_lines);
    let summary = summarize(&lines);

    DiffResult {
        from_version,
        to_version,
        lines,
        summary,
    }
}

fn compute(old: &[&str], new: &[&str]) -> Vec<DiffLine> {
    let mut result = Vec::new();
    let mut o = 0;
    let mut n = 0;

    while o < old.len() || n < new.len() {
        if o >= old.len() {
            result.push(added(new[n], n));
            n += 1;
        } else if n >= new.len() {
            result.push(deleted(old[o], o));
            o += 1;
        } else if old[o] == new[n] {
            result.push(DiffLine {
                kind: DiffKind::Equal,
                content: old[o].to_string(),
                old_line: Some(o + 1),
                new_line: Some(n + 1),
            });
            o += 1;
            n += 1;
        } else if let Some(skip) = resync(old[o], &new[n..]) {
            // old[o] reappears shortly in new: the lines before it were added
            for j in 0..skip {
                result.push(added(new[n + j], n + j));
            }
            n += skip;
        } else if let Some(skip) = resync(new[n], &old[o..]) {
            // new[n] reappears shortly in old: the lines before it were deleted
            for j in 0..skip {
                result.push(deleted(old[o + j], o + j));
            }
            o += skip;
        } else {
            result.push(DiffLine {
                kind: DiffKind::Modify,
                content: format!("- {}\n+ {}", old[o], new[n]),
                old_line: Some(o + 1),
                new_line: Some(n + 1),
            });
            o += 1;
            n += 1;
        }
    }

    result
}

/// Does `needle` appear within the next few lines of `haystack` (beyond the
/// first)? Returns how many lines precede the match.
fn resync(needle: &str, haystack: &[&str]) -> Option<usize> {
    (1..=RESYNC_LOOKAHEAD)
        .take_while(|&i| i < haystack.len())
        .find(|&i| haystack[i] == needle)
}

fn added(content: &str, index: usize) -> DiffLine {
    DiffLine {
        kind: DiffKind::Add,
        content: content.to_string(),
        old_line: None,
        new_line: Some(index + 1),
    }
}

fn deleted(content: &str, index: usize) -> DiffLine {
    DiffLine {
        kind: DiffKind::Delete,
        content: content.to_string(),
        old_line: Some(index + 1),
        new_line: None,
    }
}

fn summarize(lines: &[DiffLine]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for line in lines {
        match line.kind {
            DiffKind::Add => summary.added += 1,
            DiffKind::Delete => summary.deleted += 1,
            DiffKind::Modify => summary.modified += 1,
            DiffKind::Equal => {}
        }
    }
    summary.total = summary.added + summary.deleted + summary.modified;
    summary
}
