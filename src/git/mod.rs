//! Thin adapter over the `git` command line.
//!
//! Every query shells out through [`crate::exec`] with the adapter's
//! timeout and parses stdout with the helpers in [`porcelain`].
//! Repository discovery and revision checks go through `git2`.

pub mod porcelain;

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use git2::Repository;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::{self, Hunk};
use crate::error::{Error, Result};
use crate::exec;

/// Object id of the empty tree, used to diff a file against nothing.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const REV_LIST_FORMAT: &str = "--format=%H---%cI---%cN---%cE";
const SHOW_FORMAT: &str = "--format=%aN###<%aE>---%aI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub date: DateTime<FixedOffset>,
}

/// One surviving line of a file at some revision, with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub commit_id: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub text: String,
}

/// Handle on a repository work tree. Cheap to clone and safe to share
/// between worker threads.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
    timeout_secs: u64,
}

impl Git {
    /// Locate the repository containing `path` and make sure a `git`
    /// executable is available.
    pub fn discover(path: &Path, timeout_secs: u64) -> Result<Self> {
        let repo = Repository::discover(path)?;
        let root = repo
            .workdir()
            .ok_or_else(|| Error::Prerequisite("bare repositories are not supported".into()))?
            .to_path_buf();
        let git = Self { root, timeout_secs };
        git.run(&["--version"], &[0])?;
        Ok(git)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail with [`Error::BranchNotFound`] unless `rev` resolves to a commit.
    pub fn ensure_revision(&self, rev: &str) -> Result<()> {
        let repo = Repository::open(&self.root)?;
        repo.revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map(|_| ())
            .map_err(|_| Error::BranchNotFound(rev.to_string()))
    }

    fn run(&self, args: &[&str], allowed: &[i32]) -> Result<exec::ExecOutput> {
        let mut full = vec!["-c".to_string(), "core.quotepath=off".to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        exec::run(&self.root, "git", &full, self.timeout_secs, allowed)
    }

    fn stdout(&self, args: &[&str]) -> Result<String> {
        Ok(self.run(args, &[0])?.stdout)
    }

    /// Commit ids reachable from `branch`, newest first.
    pub fn list_commit_ids_by_date(
        &self,
        branch: &str,
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<String>> {
        let (since, until) = (date_arg("--since", since), date_arg("--until", until));
        let mut args = vec!["log", "--pretty=format:%H"];
        args.extend(since.iter().map(String::as_str));
        args.extend(until.iter().map(String::as_str));
        args.push(branch);
        Ok(porcelain::parse_lines(&self.stdout(&args)?))
    }

    pub fn list_commits_by_date(
        &self,
        branch: &str,
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
    ) -> Result<Vec<CommitInfo>> {
        self.rev_list(branch, since, until, None)
    }

    /// Commits in `(since_commit, until_commit]`. A missing `until_commit`
    /// means the tip of `branch`; a missing `since_commit` means the root.
    pub fn list_commit_ids_in_range(
        &self,
        branch: &str,
        since_commit: Option<&str>,
        until_commit: Option<&str>,
    ) -> Result<Vec<String>> {
        let tip = until_commit.unwrap_or(branch);
        let range = match since_commit {
            Some(since) => format!("{since}..{tip}"),
            None => tip.to_string(),
        };
        Ok(porcelain::parse_lines(
            &self.stdout(&["log", "--pretty=format:%H", &range])?,
        ))
    }

    /// Most recent commit on `branch` inside the date bounds.
    pub fn latest_commit(
        &self,
        branch: &str,
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
    ) -> Result<Option<CommitInfo>> {
        Ok(self.rev_list(branch, since, until, Some(1))?.into_iter().next())
    }

    fn rev_list(
        &self,
        branch: &str,
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
        limit: Option<usize>,
    ) -> Result<Vec<CommitInfo>> {
        let limit = limit.map(|n| n.to_string());
        let (since, until) = (date_arg("--since", since), date_arg("--until", until));
        let mut args = vec!["rev-list"];
        if let Some(n) = &limit {
            args.extend(["-n", n.as_str()]);
        }
        args.extend(since.iter().map(String::as_str));
        args.extend(until.iter().map(String::as_str));
        args.extend([REV_LIST_FORMAT, branch]);
        porcelain::parse_rev_list(&self.stdout(&args)?)
    }

    /// Every file path in the tree of `commit_id`.
    pub fn list_tree_paths(&self, commit_id: &str) -> Result<Vec<String>> {
        Ok(porcelain::parse_lines(&self.stdout(&[
            "ls-tree",
            "--name-only",
            "-r",
            commit_id,
        ])?))
    }

    /// Blob size of `path` at `commit_id`; fails when the path is absent.
    pub fn tree_file_size(&self, commit_id: &str, path: &str) -> Result<u64> {
        let out = self.stdout(&["ls-tree", "-r", "--long", commit_id, "--", path])?;
        porcelain::parse_tree_size(path, &out)
    }

    pub fn is_binary(&self, commit_id: &str, path: &str) -> Result<bool> {
        let out = self.stdout(&["diff", EMPTY_TREE, "--numstat", commit_id, "--", path])?;
        Ok(porcelain::numstat_is_binary(&out))
    }

    /// The last commit before `commit_id` that touched `path`, if any.
    pub fn previous_touching_commit(&self, commit_id: &str, path: &str) -> Result<Option<String>> {
        let out = self.run(
            &["rev-list", "--parents", "-n", "1", commit_id, "--", path],
            &[0, 128],
        )?;
        if out.code == 128 {
            debug!(commit_id, path, stderr = %out.stderr, "no earlier commit for path");
            return Ok(None);
        }
        Ok(porcelain::parse_parent(&out.stdout))
    }

    pub fn commit_info(&self, commit_id: &str) -> Result<CommitInfo> {
        let out = self.stdout(&["show", "-s", SHOW_FORMAT, commit_id])?;
        porcelain::parse_commit_info(commit_id, &out)
    }

    pub fn blame(&self, commit_id: &str, path: &str) -> Result<Vec<BlameLine>> {
        let out = self.stdout(&["blame", "--line-porcelain", commit_id, "--", path])?;
        porcelain::parse_blame(&out)
    }

    /// Normal-form diff of `path` between two revisions.
    pub fn diff_file_revisions(
        &self,
        path: &str,
        src_commit: &str,
        dst_commit: &str,
    ) -> Result<Vec<Hunk>> {
        // diff exits with 1 when the inputs differ
        let out = self.run(
            &[
                "difftool",
                "-x",
                "diff",
                "--no-prompt",
                src_commit,
                dst_commit,
                "--",
                path,
            ],
            &[0, 1],
        )?;
        debug!(path, src_commit, dst_commit, "diffed revisions");
        diff::parse(&out.stdout)
    }

    /// Paths touched by `commit_id`, against the empty tree for root commits.
    pub fn diff_tree_files(&self, commit_id: &str) -> Result<Vec<String>> {
        Ok(porcelain::parse_lines(&self.stdout(&[
            "diff-tree",
            "--no-commit-id",
            "--root",
            "--name-only",
            "-r",
            commit_id,
        ])?))
    }
}

fn date_arg(flag: &str, date: Option<DateTime<FixedOffset>>) -> Option<String> {
    date.map(|d| format!("{flag}={}", d.to_rfc3339()))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
