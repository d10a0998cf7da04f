//! Per-file change classification.
//!
//! The file is blamed at the commit and at the previous commit that
//! touched it, and the diff between both revisions says which lines
//! moved. Every source line of a change or delete hunk is attributed to
//! the author of that line in the previous blame:
//!
//! | line age         | same author   | other author                                |
//! |------------------|---------------|---------------------------------------------|
//! | > threshold      | `refactor_own`| `refactor_other` + victim `refactor_received` |
//! | <= threshold     | `churn_own`   | `churn_other` + victim `churn_received`       |
//!
//! Added lines, and surplus destination lines of a growing change, are
//! `new` for the author the destination blame names.

use tracing::{debug, warn};

use super::model::{Author, FileChanges};
use crate::diff::{self, DiffOp, Hunk};
use crate::error::{Error, Result};
use crate::git::{BlameLine, CommitInfo, Git};

/// Files above this size are not classified.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 80_000;
/// Lines older than this (21 days) count as refactor instead of churn.
pub const DEFAULT_REFACTOR_AGE_HOURS: i64 = 504;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy)]
pub struct ClassifyOptions {
    pub max_file_size: u64,
    pub refactor_age_hours: i64,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            refactor_age_hours: DEFAULT_REFACTOR_AGE_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Recovered structural failure: deleted, binary, too big or unblameable.
    Skipped,
    Classified(FileChanges),
}

/// Classify the lines `commit_id` touched in `path`.
///
/// Structural problems yield [`FileOutcome::Skipped`]; anything else
/// (failing git invocations, timeouts) is returned as an error.
pub fn classify_file(
    git: &Git,
    commit_id: &str,
    path: &str,
    opts: &ClassifyOptions,
) -> Result<FileOutcome> {
    match git.tree_file_size(commit_id, path) {
        Ok(size) if size <= opts.max_file_size => {}
        Ok(size) => {
            debug!(path, size, "skipping file above size limit");
            return Ok(FileOutcome::Skipped);
        }
        Err(err) => {
            debug!(path, commit_id, error = %err, "file absent at commit");
            return Ok(FileOutcome::Skipped);
        }
    }

    if git.is_binary(commit_id, path)? {
        debug!(path, "skipping binary file");
        return Ok(FileOutcome::Skipped);
    }

    let commit = git.commit_info(commit_id)?;
    let dst_blame = match git.blame(commit_id, path) {
        Ok(blame) => blame,
        Err(err) => {
            warn!(path, commit_id, error = %err, "cannot blame file");
            return Ok(FileOutcome::Skipped);
        }
    };

    let mut changes = FileChanges::new(commit_id, path);

    let Some(prev) = git.previous_touching_commit(commit_id, path)? else {
        for line in &dst_blame {
            changes.credit(&author_of(line), |lines| lines.new += 1);
        }
        return Ok(FileOutcome::Classified(changes));
    };

    let src_blame = match git.blame(&prev, path) {
        Ok(blame) => blame,
        Err(err) => {
            warn!(path, prev, error = %err, "cannot blame previous revision");
            return Ok(FileOutcome::Skipped);
        }
    };
    let hunks = match git.diff_file_revisions(path, &prev, commit_id) {
        Ok(hunks) => hunks,
        Err(err) => {
            warn!(path, prev, commit_id, error = %err, "cannot diff revisions");
            return Ok(FileOutcome::Skipped);
        }
    };

    match classify_hunks(
        &mut changes,
        &commit,
        &src_blame,
        &dst_blame,
        &hunks,
        opts.refactor_age_hours,
    ) {
        Ok(()) => Ok(FileOutcome::Classified(changes)),
        Err(err) => {
            warn!(path, commit_id, error = %err, "diff does not match blame");
            debug!(hunks = %diff::format(&hunks), "rejected diff");
            Ok(FileOutcome::Skipped)
        }
    }
}

/// Credit the lines of `hunks` into `changes`. Fails when a hunk points
/// outside either blame.
pub fn classify_hunks(
    changes: &mut FileChanges,
    commit: &CommitInfo,
    src_blame: &[BlameLine],
    dst_blame: &[BlameLine],
    hunks: &[Hunk],
    refactor_age_hours: i64,
) -> Result<()> {
    let committer = Author::new(&commit.author_name, &commit.author_email);

    for hunk in hunks {
        if hunk.op == DiffOp::Add {
            let Some(first) = hunk.dst_lines.first() else {
                continue;
            };
            let added = hunk.dst_lines.len() as i64;
            changes.credit(&author_of(line_at(dst_blame, first.number)?), |lines| {
                lines.new += added
            });
            continue;
        }

        // one author for the whole change hunk: the first destination line's
        let dst_author = match hunk.op {
            DiffOp::Delete => committer.clone(),
            _ => {
                let first = hunk
                    .dst_lines
                    .first()
                    .ok_or_else(|| Error::Parse("change hunk without destination lines".into()))?;
                author_of(line_at(dst_blame, first.number)?)
            }
        };

        for src in &hunk.src_lines {
            let src_line = line_at(src_blame, src.number)?;
            let age = commit.date - src_line.author_date;
            let refactor = age.num_hours() > refactor_age_hours;
            let own = src_line.author_name == commit.author_name;

            changes.credit(&dst_author, |lines| {
                lines.changes += 1;
                lines.age_days_sum += age.num_seconds() as f64 / SECONDS_PER_DAY;
                match (refactor, own) {
                    (true, true) => lines.refactor_own += 1,
                    (true, false) => lines.refactor_other += 1,
                    (false, true) => lines.churn_own += 1,
                    (false, false) => lines.churn_other += 1,
                }
            });
            if !own {
                changes.credit(&author_of(src_line), |lines| {
                    if refactor {
                        lines.refactor_received += 1;
                    } else {
                        lines.churn_received += 1;
                    }
                });
            }
        }

        if hunk.op == DiffOp::Change && hunk.dst_lines.len() > hunk.src_lines.len() {
            for dst in &hunk.dst_lines[hunk.src_lines.len()..] {
                changes.credit(&author_of(line_at(dst_blame, dst.number)?), |lines| {
                    lines.new += 1
                });
            }
        }
    }
    Ok(())
}

fn author_of(line: &BlameLine) -> Author {
    Author::new(&line.author_name, &line.author_email)
}

/// Blame entry for 1-based `number`.
fn line_at(blame: &[BlameLine], number: usize) -> Result<&BlameLine> {
    number
        .checked_sub(1)
        .and_then(|idx| blame.get(idx))
        .ok_or_else(|| {
            Error::Parse(format!(
                "line {number} outside blame of {} lines",
                blame.len()
            ))
        })
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
