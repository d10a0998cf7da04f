//! Ownership analysis: who wrote the lines that survive at one commit.
//!
//! Every file of the commit's tree is blamed on the worker pool. Each
//! non-blank line is credited to its author and fed to a shared
//! [`DuplicateLineTracker`]; once all files are in, the tracker groups the
//! duplicated runs and the reducer derives per-author duplication counts
//! from the owners of the grouped lines.

pub mod model;
pub mod report;

use std::collections::{BTreeMap, HashMap};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::cache;
use crate::changes::Author;
use crate::config::{Format, Session, Settings};
use crate::dups::{self, DuplicateLineTracker, LineGroup, LineSource};
use crate::error::{EXIT_EMPTY, Result};
use crate::filter::Filters;
use crate::git::{CommitInfo, Git};
use crate::pipeline::{Pipeline, PipelineConfig, Task};
use crate::progress::{self, ProgressInfo};
use crate::report_helpers;
use crate::util;
pub use model::{AuthorOwnership, OwnershipResult};

#[derive(Debug, Clone)]
pub struct OwnershipOptions {
    pub filters: Filters,
    /// Larger files are skipped.
    pub max_file_size: u64,
    pub min_dup_lines: usize,
    pub ignore_trivial_lines: bool,
    pub pipeline: PipelineConfig,
}

impl OwnershipOptions {
    pub fn from_session(session: &Session) -> Self {
        Self {
            filters: session.filters.clone(),
            max_file_size: session.settings.max_file_size_ownership,
            min_dup_lines: session.settings.min_dup_lines,
            ignore_trivial_lines: session.settings.ignore_trivial_lines,
            pipeline: session.pipeline(),
        }
    }
}

struct FileTask {
    path: String,
}

impl Task for FileTask {
    fn describe(&self) -> String {
        self.path.clone()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct OwnedLines {
    lines: i64,
    age_days_sum: f64,
}

struct FileOwnership {
    path: String,
    authors: BTreeMap<Author, OwnedLines>,
    /// Owner per line, by line number minus one; `None` for lines not counted.
    line_owners: Vec<Option<Author>>,
}

enum FileOutcome {
    Skipped,
    Owned(FileOwnership),
}

/// Attribute every surviving line at `commit` to its author.
#[tracing::instrument(skip_all, fields(commit = %commit.id))]
pub fn analyze_ownership(
    git: &Git,
    opts: &OwnershipOptions,
    commit: &CommitInfo,
    progress: Option<Sender<ProgressInfo>>,
) -> Result<OwnershipResult> {
    let tracker = if opts.ignore_trivial_lines {
        DuplicateLineTracker::new()
    } else {
        DuplicateLineTracker::with_trivial_lines()
    };
    let mut reducer = Reducer::default();

    Pipeline::new(opts.pipeline.clone())
        .with_progress(progress)
        .run(
            |sink| {
                for path in git.list_tree_paths(&commit.id)? {
                    if opts.filters.files.matches(&path) {
                        sink.submit(FileTask { path })?;
                    }
                }
                Ok(())
            },
            |task: FileTask| blame_file(git, opts, commit, &tracker, task.path),
            |outcome| reducer.add(outcome),
        )?;

    let groups = tracker.group_lines(opts.min_dup_lines);
    info!(
        files = reducer.files,
        fingerprints = tracker.fingerprint_count(),
        groups = groups.len(),
        "ownership analyzed"
    );
    Ok(reducer.finish(commit.clone(), groups))
}

fn blame_file(
    git: &Git,
    opts: &OwnershipOptions,
    commit: &CommitInfo,
    tracker: &DuplicateLineTracker,
    path: String,
) -> Result<FileOutcome> {
    match git.tree_file_size(&commit.id, &path) {
        Ok(size) if size <= opts.max_file_size => {}
        Ok(size) => {
            debug!(path, size, "skipping file above size limit");
            return Ok(FileOutcome::Skipped);
        }
        Err(err) => {
            debug!(path, error = %err, "no blob size");
            return Ok(FileOutcome::Skipped);
        }
    }
    if git.is_binary(&commit.id, &path)? {
        debug!(path, "skipping binary file");
        return Ok(FileOutcome::Skipped);
    }
    let blame = match git.blame(&commit.id, &path) {
        Ok(blame) => blame,
        Err(err) => {
            warn!(path, error = %err, "cannot blame file");
            return Ok(FileOutcome::Skipped);
        }
    };

    let mut file = FileOwnership {
        path,
        authors: BTreeMap::new(),
        line_owners: Vec::with_capacity(blame.len()),
    };
    for (idx, line) in blame.iter().enumerate() {
        if line.text.trim().is_empty()
            || !opts
                .filters
                .authors
                .matches(&line.author_name, &line.author_email)
        {
            file.line_owners.push(None);
            continue;
        }
        let author = Author::new(&line.author_name, &line.author_email);
        let owned = file.authors.entry(author.clone()).or_default();
        owned.lines += 1;
        owned.age_days_sum += (commit.date - line.author_date).num_days() as f64;

        tracker.add_line(
            &line.text,
            LineSource {
                file_path: file.path.clone(),
                line_number: idx + 1,
                line_count: 1,
                author_name: line.author_name.clone(),
                author_email: line.author_email.clone(),
                commit_date: line.author_date,
                line_hash: 0,
            },
        );
        file.line_owners.push(Some(author));
    }
    Ok(FileOutcome::Owned(file))
}

#[derive(Default)]
struct Reducer {
    authors: BTreeMap<Author, OwnedLines>,
    line_owners: HashMap<String, Vec<Option<Author>>>,
    files: usize,
    skipped: usize,
}

impl Reducer {
    fn add(&mut self, outcome: FileOutcome) {
        let file = match outcome {
            FileOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
            FileOutcome::Owned(file) => file,
        };
        self.files += 1;
        for (author, owned) in file.authors {
            let total = self.authors.entry(author).or_default();
            total.lines += owned.lines;
            total.age_days_sum += owned.age_days_sum;
        }
        self.line_owners.insert(file.path, file.line_owners);
    }

    fn finish(self, commit: CommitInfo, groups: Vec<LineGroup>) -> OwnershipResult {
        let mut authors: BTreeMap<Author, AuthorOwnership> = self
            .authors
            .iter()
            .map(|(author, owned)| {
                let record = AuthorOwnership {
                    author_name: author.name.clone(),
                    author_email: author.email.clone(),
                    owned_lines_total: owned.lines,
                    owned_lines_age_days_sum: owned.age_days_sum,
                    ..AuthorOwnership::default()
                };
                (author.clone(), record)
            })
            .collect();

        let owners = &self.line_owners;
        let mut duplicated = 0;
        for group in &groups {
            for offset in 0..group.line_count {
                if let Some(record) = owner_at(owners, group, offset).and_then(|a| authors.get_mut(a))
                {
                    record.owned_lines_duplicate_original += 1;
                }
            }
            for related in &group.related_groups {
                duplicated += related.line_count as i64;
                for offset in 0..related.line_count {
                    let copier = owner_at(owners, related, offset);
                    let original = owner_at(owners, group, offset);
                    if let Some(record) = copier.and_then(|a| authors.get_mut(a)) {
                        record.owned_lines_duplicate += 1;
                    }
                    if let Some(original) = original
                        && copier != Some(original)
                        && let Some(record) = authors.get_mut(original)
                    {
                        record.owned_lines_duplicate_original_others += 1;
                    }
                }
            }
        }

        let mut authors: Vec<AuthorOwnership> = authors.into_values().collect();
        authors.sort_by(|a, b| {
            b.owned_lines_total
                .cmp(&a.owned_lines_total)
                .then_with(|| a.author_name.cmp(&b.author_name))
                .then_with(|| a.author_email.cmp(&b.author_email))
        });

        OwnershipResult {
            commit,
            total_files: self.files,
            skipped_files: self.skipped,
            total_lines: self.authors.values().map(|o| o.lines).sum(),
            total_lines_duplicated: duplicated,
            lines_age_days_sum: self.authors.values().map(|o| o.age_days_sum).sum(),
            authors,
            duplicate_line_groups: groups,
        }
    }
}

fn owner_at<'a>(
    owners: &'a HashMap<String, Vec<Option<Author>>>,
    group: &LineGroup,
    offset: usize,
) -> Option<&'a Author> {
    let idx = (group.line_number + offset).checked_sub(1)?;
    owners.get(&group.file_path)?.get(idx)?.as_ref()
}

/// Cache key for an ownership analysis at `commit`.
pub fn cache_key(git: &Git, settings: &Settings, commit: &CommitInfo) -> String {
    let root = git.root().display().to_string();
    let min_dup_lines = settings.min_dup_lines.to_string();
    let max_size = settings.max_file_size_ownership.to_string();
    let trivial = settings.ignore_trivial_lines.to_string();
    cache::key(&[
        ("kind", "ownership"),
        ("repo", &root),
        ("commit", &commit.id),
        ("files", &settings.files),
        ("files_not", &settings.files_not),
        ("authors", &settings.authors),
        ("authors_not", &settings.authors_not),
        ("min_dup_lines", &min_dup_lines),
        ("max_file_size", &max_size),
        ("ignore_trivial_lines", &trivial),
    ])
}

/// Ownership at `commit`, served from the session cache when possible.
pub fn analyze_cached(session: &Session, commit: &CommitInfo) -> Result<OwnershipResult> {
    let opts = OwnershipOptions::from_session(session);
    let cache = session.cache();
    let key = cache_key(&session.git, &session.settings, commit);
    cache::cached(cache.as_ref(), &key, || {
        progress::with_display(session.show_progress, |tx| {
            analyze_ownership(&session.git, &opts, commit, Some(tx))
        })
    })
}

/// Analyze the latest commit on the branch at the human date `when`.
/// `None` when the branch has no commit that old or nothing qualified.
fn analyze_when(session: &Session, when: &str) -> Result<Option<OwnershipResult>> {
    let when = util::parse_when(when, util::now())?;
    let Some(commit) = session
        .git
        .latest_commit(&session.settings.branch, None, Some(when))?
    else {
        return Ok(None);
    };
    let result = analyze_cached(session, &commit)?;
    Ok((!result.is_empty()).then_some(result))
}

/// `gitwho ownership`. Returns the process exit code.
pub fn run(session: &Session, when: &str) -> Result<i32> {
    let Some(result) = analyze_when(session, when)? else {
        println!("No changes found");
        return Ok(EXIT_EMPTY);
    };
    match session.format {
        Format::Full => print!("{}", report::format_full(&result)),
        Format::Short => print!("{}", report::format_short(&result)),
        Format::Json => report_helpers::print_json_stdout(&result)?,
        Format::Graph => return Ok(report::write_graph(&result)),
    }
    Ok(0)
}

/// `gitwho duplicates`. Returns the process exit code.
pub fn run_duplicates(session: &Session, when: &str) -> Result<i32> {
    let Some(result) = analyze_when(session, when)? else {
        println!("No changes found");
        return Ok(EXIT_EMPTY);
    };
    let groups = &result.duplicate_line_groups;
    let metrics = dups::report::DuplicationMetrics::new(groups, result.total_lines as usize);
    match session.format {
        Format::Full | Format::Short => {
            print!("{}", dups::report::format_summary(&metrics));
            print!(
                "{}",
                dups::report::format_groups(groups, session.format == Format::Full)
            );
        }
        Format::Json => println!("{}", dups::report::format_json(&metrics, groups)?),
        Format::Graph => return Ok(report::write_duplicates_graph(&result)),
    }
    Ok(0)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
