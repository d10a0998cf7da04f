use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::git::CommitInfo;

/// Author identity: name plus email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}###{}", self.name, self.email)
    }
}

/// Line counters for one author (or for a whole result).
///
/// `changes` always equals the sum of the four own/other counters; the
/// `*_received` counters are credited to the author whose line someone
/// else modified and overlap with that someone's `changes`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinesTouched {
    pub new: i64,
    pub changes: i64,
    pub refactor_own: i64,
    pub refactor_other: i64,
    pub refactor_received: i64,
    pub churn_own: i64,
    pub churn_other: i64,
    pub churn_received: i64,
    pub age_days_sum: f64,
}

impl LinesTouched {
    /// Lines this author wrote: new plus changed.
    pub fn touched(&self) -> i64 {
        self.new + self.changes
    }

    pub fn refactor(&self) -> i64 {
        self.refactor_own + self.refactor_other
    }

    pub fn churn(&self) -> i64 {
        self.churn_own + self.churn_other
    }

    /// Ranking score: new work and refactoring count up, churn counts down.
    pub fn score(&self) -> i64 {
        self.new + 3 * self.refactor_other + 2 * self.refactor_own
            - 2 * self.churn_own
            - 4 * self.churn_received
    }

    /// Average age in days of the lines changed, if any were.
    pub fn average_age_days(&self) -> Option<f64> {
        (self.changes > 0).then(|| self.age_days_sum / self.changes as f64)
    }
}

impl AddAssign<&LinesTouched> for LinesTouched {
    fn add_assign(&mut self, other: &LinesTouched) {
        self.new += other.new;
        self.changes += other.changes;
        self.refactor_own += other.refactor_own;
        self.refactor_other += other.refactor_other;
        self.refactor_received += other.refactor_received;
        self.churn_own += other.churn_own;
        self.churn_other += other.churn_other;
        self.churn_received += other.churn_received;
        self.age_days_sum += other.age_days_sum;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTouched {
    pub name: String,
    pub lines: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorLines {
    pub author_name: String,
    pub author_email: String,
    pub lines_touched: LinesTouched,
    /// Most touched first.
    pub files_touched: Vec<FileTouched>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangesResult {
    pub total_commits: usize,
    pub total_files: usize,
    pub skipped_files: usize,
    pub total_lines_touched: LinesTouched,
    pub authors: Vec<AuthorLines>,
    pub since_commit: Option<CommitInfo>,
    pub until_commit: Option<CommitInfo>,
}

impl ChangesResult {
    pub fn is_empty(&self) -> bool {
        self.total_commits == 0
    }

    #[cfg(test)]
    pub fn author(&self, name: &str) -> Option<&AuthorLines> {
        self.authors.iter().find(|a| a.author_name == name)
    }
}

/// Per-author counters for one `(commit, file)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileChanges {
    pub commit_id: String,
    pub path: String,
    pub authors: BTreeMap<Author, LinesTouched>,
}

impl FileChanges {
    pub fn new(commit_id: &str, path: &str) -> Self {
        Self {
            commit_id: commit_id.to_string(),
            path: path.to_string(),
            authors: BTreeMap::new(),
        }
    }

    /// Apply `update` to the counters of `author`.
    pub fn credit(&mut self, author: &Author, update: impl FnOnce(&mut LinesTouched)) {
        match self.authors.get_mut(author) {
            Some(lines) => update(lines),
            None => {
                let mut lines = LinesTouched::default();
                update(&mut lines);
                self.authors.insert(author.clone(), lines);
            }
        }
    }

    #[cfg(test)]
    pub fn total(&self) -> LinesTouched {
        let mut total = LinesTouched::default();
        for lines in self.authors.values() {
            total += lines;
        }
        total
    }
}
