//! Change analysis: who added, refactored and churned which lines.
//!
//! Every `(commit, file)` pair in the range becomes a pipeline task; the
//! classifier turns it into per-author counters and the reducer folds
//! those into a [`ChangesResult`], dropping filtered authors.

pub mod classifier;
pub mod model;
pub mod report;

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, FixedOffset};
use crossbeam_channel::Sender;
use tracing::info;

use crate::cache;
use crate::config::{Format, Session};
use crate::error::{EXIT_EMPTY, Result};
use crate::filter::{AuthorFilter, Filters};
use crate::git::{CommitInfo, Git};
use crate::pipeline::{Pipeline, PipelineConfig, Task};
use crate::progress::{self, ProgressInfo};
use crate::report_helpers;
use crate::util;
use classifier::{ClassifyOptions, FileOutcome, classify_file};
pub use model::{Author, AuthorLines, ChangesResult, FileTouched, LinesTouched};

/// Start of the range when `--since` is blank.
pub const DEFAULT_SINCE: &str = "30 days ago";

#[derive(Debug, Clone)]
pub struct ChangesOptions {
    pub branch: String,
    pub filters: Filters,
    pub classify: ClassifyOptions,
    pub pipeline: PipelineConfig,
}

impl ChangesOptions {
    pub fn from_session(session: &Session) -> Self {
        Self {
            branch: session.settings.branch.clone(),
            filters: session.filters.clone(),
            classify: ClassifyOptions {
                max_file_size: session.settings.max_file_size_changes,
                ..ClassifyOptions::default()
            },
            pipeline: session.pipeline(),
        }
    }
}

/// Which commits to analyze.
#[derive(Debug, Clone)]
pub enum CommitRange {
    /// Commits on the branch between two dates (either end open).
    Dates {
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
    },
    /// Commits in `(since, until]`; `None` means the root or the tip.
    Commits {
        since: Option<CommitInfo>,
        until: Option<CommitInfo>,
    },
}

struct FileTask {
    commit_id: String,
    path: String,
}

impl Task for FileTask {
    fn describe(&self) -> String {
        format!("{} {}", &self.commit_id[..self.commit_id.len().min(8)], self.path)
    }
}

/// Analyze the changes of every commit in `range`.
#[tracing::instrument(skip_all, fields(branch = %opts.branch))]
pub fn analyze_changes(
    git: &Git,
    opts: &ChangesOptions,
    range: &CommitRange,
    progress: Option<Sender<ProgressInfo>>,
) -> Result<ChangesResult> {
    let (commit_ids, since_commit, until_commit) = resolve_range(git, &opts.branch, range)?;
    info!(commits = commit_ids.len(), "analyzing changes");

    let mut reducer = Reducer::new(&opts.filters.authors);
    Pipeline::new(opts.pipeline.clone())
        .with_progress(progress)
        .run(
            |sink| {
                for commit_id in &commit_ids {
                    for path in git.diff_tree_files(commit_id)? {
                        if opts.filters.files.matches(&path) {
                            sink.submit(FileTask {
                                commit_id: commit_id.clone(),
                                path,
                            })?;
                        }
                    }
                }
                Ok(())
            },
            |task: FileTask| classify_file(git, &task.commit_id, &task.path, &opts.classify),
            |outcome| reducer.add(outcome),
        )?;

    Ok(reducer.finish(since_commit, until_commit))
}

type ResolvedRange = (Vec<String>, Option<CommitInfo>, Option<CommitInfo>);

fn resolve_range(git: &Git, branch: &str, range: &CommitRange) -> Result<ResolvedRange> {
    match range {
        CommitRange::Dates { since, until } => {
            let ids = git.list_commit_ids_by_date(branch, *since, *until)?;
            let since_commit = match since {
                Some(date) => git.latest_commit(branch, None, Some(*date))?,
                None => None,
            };
            let until_commit = git.latest_commit(branch, None, *until)?;
            Ok((ids, since_commit, until_commit))
        }
        CommitRange::Commits { since, until } => {
            let ids = git.list_commit_ids_in_range(
                branch,
                since.as_ref().map(|c| c.id.as_str()),
                until.as_ref().map(|c| c.id.as_str()),
            )?;
            Ok((ids, since.clone(), until.clone()))
        }
    }
}

#[derive(Default)]
struct AuthorTotals {
    lines: LinesTouched,
    files: BTreeMap<String, i64>,
}

/// Folds per-file outcomes into result totals. Runs on one thread.
struct Reducer<'a> {
    authors_filter: &'a AuthorFilter,
    total: LinesTouched,
    authors: BTreeMap<Author, AuthorTotals>,
    commits: HashSet<String>,
    files: HashSet<String>,
    skipped: usize,
}

impl<'a> Reducer<'a> {
    fn new(authors_filter: &'a AuthorFilter) -> Self {
        Self {
            authors_filter,
            total: LinesTouched::default(),
            authors: BTreeMap::new(),
            commits: HashSet::new(),
            files: HashSet::new(),
            skipped: 0,
        }
    }

    fn add(&mut self, outcome: FileOutcome) {
        let changes = match outcome {
            FileOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            FileOutcome::Classified(changes) => changes,
        };

        let mut counted = false;
        for (author, lines) in &changes.authors {
            if !self.authors_filter.matches(&author.name, &author.email) {
                continue;
            }
            let totals = self.authors.entry(author.clone()).or_default();
            totals.lines += lines;
            self.total += lines;
            // received credits alone do not make a file touched
            if lines.touched() > 0 {
                *totals.files.entry(changes.path.clone()).or_default() += lines.touched();
                counted = true;
            }
        }
        if counted {
            self.commits.insert(changes.commit_id);
            self.files.insert(changes.path);
        }
    }

    fn finish(
        self,
        since_commit: Option<CommitInfo>,
        until_commit: Option<CommitInfo>,
    ) -> ChangesResult {
        let mut authors: Vec<AuthorLines> = self
            .authors
            .into_iter()
            .map(|(author, totals)| {
                let mut files_touched: Vec<FileTouched> = totals
                    .files
                    .into_iter()
                    .map(|(name, lines)| FileTouched { name, lines })
                    .collect();
                files_touched.sort_by(|a, b| b.lines.cmp(&a.lines).then(a.name.cmp(&b.name)));
                AuthorLines {
                    author_name: author.name,
                    author_email: author.email,
                    lines_touched: totals.lines,
                    files_touched,
                }
            })
            .collect();
        authors.sort_by(|a, b| {
            b.lines_touched
                .touched()
                .cmp(&a.lines_touched.touched())
                .then_with(|| a.author_name.cmp(&b.author_name))
                .then_with(|| a.author_email.cmp(&b.author_email))
        });

        ChangesResult {
            total_commits: self.commits.len(),
            total_files: self.files.len(),
            skipped_files: self.skipped,
            total_lines_touched: self.total,
            authors,
            since_commit,
            until_commit,
        }
    }
}

/// Cache key for a changes analysis over resolved commits.
pub fn cache_key(
    git: &Git,
    settings: &crate::config::Settings,
    since: Option<&CommitInfo>,
    until: Option<&CommitInfo>,
) -> String {
    let root = git.root().display().to_string();
    let max_size = settings.max_file_size_changes.to_string();
    cache::key(&[
        ("kind", "changes"),
        ("repo", &root),
        ("branch", &settings.branch),
        ("since", since.map_or("", |c| c.id.as_str())),
        ("until", until.map_or("", |c| c.id.as_str())),
        ("files", &settings.files),
        ("files_not", &settings.files_not),
        ("authors", &settings.authors),
        ("authors_not", &settings.authors_not),
        ("max_file_size", &max_size),
    ])
}

/// `gitwho changes`: analyze the commits between two human dates and
/// print the result. Returns the process exit code.
pub fn run(session: &Session, since: &str, until: &str) -> Result<i32> {
    let now = util::now();
    let since = util::parse_when(util::or_default(since, DEFAULT_SINCE), now)?;
    let until = util::parse_when(until, now)?;
    let git = &session.git;
    let branch = &session.settings.branch;

    // the cache key uses the commits at the bounds so cached results stay valid
    let since_commit = git.latest_commit(branch, None, Some(since))?;
    let until_commit = git.latest_commit(branch, None, Some(until))?;
    let opts = ChangesOptions::from_session(session);
    let range = CommitRange::Dates {
        since: Some(since),
        until: Some(until),
    };

    let result = match &until_commit {
        None => ChangesResult::default(),
        Some(_) => {
            let cache = session.cache();
            let key = cache_key(git, &session.settings, since_commit.as_ref(), until_commit.as_ref());
            cache::cached(cache.as_ref(), &key, || {
                progress::with_display(session.show_progress, |tx| {
                    analyze_changes(git, &opts, &range, Some(tx))
                })
            })?
        }
    };

    if result.is_empty() {
        println!("No changes found");
        return Ok(EXIT_EMPTY);
    }

    match session.format {
        Format::Full => print!("{}", report::format_full(&result)),
        Format::Short => print!("{}", report::format_short(&result)),
        Format::Json => report_helpers::print_json_stdout(&result)?,
        Format::Graph => return Ok(report::write_graph(&result)),
    }
    Ok(0)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
