//! Content-addressed index of source lines used to find duplicated runs.
//!
//! ## Algorithm
//!
//! **Feeding:** every analyzed line is normalized (whitespace removed) and
//! fingerprinted with FNV-1a. Occurrences are appended to a per-fingerprint
//! list behind a mutex, so any number of workers can feed one tracker.
//!
//! **Raw groups:** fingerprints seen only once are dropped. The remaining
//! occurrences are swept in `(file, line)` order and adjacent ones merge
//! into runs, whatever their fingerprints.
//!
//! **Relating:** for each raw run, all occurrences of its fingerprints are
//! swept again. Runs elsewhere with the same fingerprint sequence and the
//! same length are its copies. The copy with the smallest
//! `(file_path, line_number)` becomes the primary group and the others its
//! `related_groups`; every member is then claimed so it is reported once.
mod groups;
pub mod hashing;
pub mod report;

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub use groups::find_line_groups;
use hashing::{fnv1a, is_trivial, normalize};

/// One occurrence of a line (or run of lines) in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSource {
    pub file_path: String,
    pub line_number: usize,
    pub line_count: usize,
    pub author_name: String,
    pub author_email: String,
    pub commit_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub line_hash: u64,
}

/// A run of adjacent duplicated lines and the runs that copy it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineGroup {
    pub file_path: String,
    pub line_number: usize,
    pub line_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_groups: Vec<LineGroup>,
    #[serde(skip)]
    pub line_hashes: Vec<u64>,
}

type GroupKey = (String, usize, usize);

impl LineGroup {
    fn starting_at(source: &LineSource) -> Self {
        Self {
            file_path: source.file_path.clone(),
            line_number: source.line_number,
            line_count: source.line_count,
            related_groups: Vec::new(),
            line_hashes: vec![source.line_hash],
        }
    }

    /// Last line covered by the group (inclusive).
    pub fn end(&self) -> usize {
        self.line_number + self.line_count - 1
    }

    fn key(&self) -> GroupKey {
        (self.file_path.clone(), self.line_number, self.line_count)
    }
}

/// Thread-safe duplicate line index.
#[derive(Debug, Default)]
pub struct DuplicateLineTracker {
    lines: Mutex<HashMap<u64, Vec<LineSource>>>,
    keep_trivial: bool,
}

impl DuplicateLineTracker {
    /// Tracker that skips trivial lines (see [`hashing::is_trivial`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that indexes every line, however short.
    pub fn with_trivial_lines() -> Self {
        Self {
            keep_trivial: true,
            ..Self::default()
        }
    }

    /// Record `content` at `source`.
    ///
    /// Returns the number of occurrences of that fingerprint after the
    /// insert and whether it is now duplicated, or `None` when the line was
    /// ignored as trivial.
    pub fn add_line(&self, content: &str, mut source: LineSource) -> Option<(usize, bool)> {
        let normalized = normalize(content);
        if !self.keep_trivial && is_trivial(&normalized) {
            return None;
        }
        source.line_hash = fnv1a(&normalized);
        source.line_count = source.line_count.max(1);
        Some(self.insert(source))
    }

    fn insert(&self, source: LineSource) -> (usize, bool) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let occurrences = lines.entry(source.line_hash).or_default();
        occurrences.push(source);
        (occurrences.len(), occurrences.len() > 1)
    }

    /// Number of distinct fingerprints recorded.
    pub fn fingerprint_count(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Group duplicated lines into primary groups with their related copies.
    /// Groups shorter than `min_duplicate_lines` are discarded.
    pub fn group_lines(&self, min_duplicate_lines: usize) -> Vec<LineGroup> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);

        let mut duplicated: Vec<LineSource> = lines
            .values()
            .filter(|occurrences| occurrences.len() > 1)
            .flatten()
            .cloned()
            .collect();
        let raw_groups = find_line_groups(&mut duplicated);

        let mut claimed: HashSet<GroupKey> = HashSet::new();
        let mut result = Vec::new();

        for group in raw_groups {
            if claimed.contains(&group.key()) {
                continue;
            }

            let mut sources = occurrences_of(&lines, &group.line_hashes);
            let mut members: Vec<LineGroup> = find_line_groups(&mut sources)
                .into_iter()
                .filter(|candidate| {
                    candidate.line_count == group.line_count
                        && candidate.line_hashes == group.line_hashes
                        && candidate.key() != group.key()
                        && !claimed.contains(&candidate.key())
                })
                .collect();

            claimed.insert(group.key());
            claimed.extend(members.iter().map(LineGroup::key));

            if members.is_empty() || group.line_count < min_duplicate_lines {
                continue;
            }

            members.push(group);
            members.sort_by(|a, b| {
                a.file_path
                    .cmp(&b.file_path)
                    .then(a.line_number.cmp(&b.line_number))
            });
            let mut primary = members.remove(0);
            primary.related_groups = members;
            result.push(primary);
        }

        result.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line_number.cmp(&b.line_number))
        });
        result
    }
}

/// Every recorded occurrence of the given fingerprints, each position once.
fn occurrences_of(lines: &HashMap<u64, Vec<LineSource>>, hashes: &[u64]) -> Vec<LineSource> {
    let mut seen: HashSet<GroupKey> = HashSet::new();
    let mut sources = Vec::new();
    for hash in hashes {
        for source in lines.get(hash).into_iter().flatten() {
            let key = (
                source.file_path.clone(),
                source.line_number,
                source.line_count,
            );
            if seen.insert(key) {
                sources.push(source.clone());
            }
        }
    }
    sources
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
