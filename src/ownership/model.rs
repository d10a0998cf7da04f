use serde::{Deserialize, Serialize};

use crate::dups::LineGroup;
use crate::git::CommitInfo;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorOwnership {
    pub author_name: String,
    pub author_email: String,
    pub owned_lines_total: i64,
    pub owned_lines_age_days_sum: f64,
    /// Lines of this author inside copies (related groups). Lines of the
    /// primary group are counted in `owned_lines_duplicate_original` only.
    pub owned_lines_duplicate: i64,
    /// Lines of this author inside primary duplicate groups.
    pub owned_lines_duplicate_original: i64,
    /// Copies made by other authors of lines this author owns.
    pub owned_lines_duplicate_original_others: i64,
}

impl AuthorOwnership {
    pub fn average_age_days(&self) -> f64 {
        if self.owned_lines_total == 0 {
            0.0
        } else {
            self.owned_lines_age_days_sum / self.owned_lines_total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipResult {
    pub commit: CommitInfo,
    pub total_files: usize,
    pub skipped_files: usize,
    pub total_lines: i64,
    pub total_lines_duplicated: i64,
    pub lines_age_days_sum: f64,
    /// Most lines first.
    pub authors: Vec<AuthorOwnership>,
    pub duplicate_line_groups: Vec<LineGroup>,
}

impl OwnershipResult {
    /// Result with no files, for a commit where nothing qualified.
    #[cfg(test)]
    pub fn empty(commit: CommitInfo) -> Self {
        Self {
            commit,
            total_files: 0,
            skipped_files: 0,
            total_lines: 0,
            total_lines_duplicated: 0,
            lines_age_days_sum: 0.0,
            authors: Vec::new(),
            duplicate_line_groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_lines == 0
    }

    pub fn average_age_days(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.lines_age_days_sum / self.total_lines as f64
        }
    }

    #[cfg(test)]
    pub fn author(&self, name: &str) -> Option<&AuthorOwnership> {
        self.authors.iter().find(|a| a.author_name == name)
    }
}
