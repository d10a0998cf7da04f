//! Time-series driver.
//!
//! The `[since, until)` range is cut into `period`-long windows. Each
//! window is resolved to the latest commit at its start and at its end;
//! windows that end before the first commit are dropped. The changes
//! series analyzes the commits in `(since_commit, until_commit]` of every
//! window, the ownership series takes a snapshot at every `until_commit`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset};
use tracing::{debug, info};

use crate::cache;
use crate::changes::{self, Author, ChangesOptions, ChangesResult, CommitRange, LinesTouched};
use crate::config::{Format, Session};
use crate::error::{EXIT_EMPTY, Error, Result};
use crate::git::{CommitInfo, Git};
use crate::ownership::{self, AuthorOwnership, OwnershipResult};
use crate::progress;
use crate::report_helpers::{self, BarChart, GraphPage, table};
use crate::util::{self, diff_perc_str, diff_str};

/// Upper bound on the number of windows in one run.
const MAX_WINDOWS: usize = 10_000;

/// Range and period used by `changes-timeseries` when left blank.
pub const CHANGES_SINCE: &str = "90 days ago";
pub const CHANGES_PERIOD: &str = "30 days";
/// Range and period used by `ownership-timeseries` when left blank.
pub const OWNERSHIP_SINCE: &str = "3 months ago";
pub const OWNERSHIP_PERIOD: &str = "2 weeks";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub since: DateTime<FixedOffset>,
    pub until: DateTime<FixedOffset>,
}

/// A window resolved to commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    /// `None` when the window starts before the first commit.
    pub since_commit: Option<CommitInfo>,
    pub until_commit: CommitInfo,
}

/// Consecutive windows covering `[since, until)`; the last one is cut at
/// `until`.
pub fn windows(
    since: DateTime<FixedOffset>,
    until: DateTime<FixedOffset>,
    period: Duration,
) -> Result<Vec<Window>> {
    if period <= Duration::zero() {
        return Err(Error::InvalidArgument("period must be positive".into()));
    }
    let mut windows = Vec::new();
    let mut start = since;
    while start < until {
        if windows.len() >= MAX_WINDOWS {
            return Err(Error::InvalidArgument(format!(
                "more than {MAX_WINDOWS} periods between since and until"
            )));
        }
        let end = (start + period).min(until);
        windows.push(Window { since: start, until: end });
        start = end;
    }
    Ok(windows)
}

/// Resolve every window to the latest commits on `branch` at its bounds.
/// The branch history is listed once and searched for each bound.
pub fn resolve_periods(git: &Git, branch: &str, windows: &[Window]) -> Result<Vec<Period>> {
    let Some(last_until) = windows.iter().map(|w| w.until).max() else {
        return Ok(Vec::new());
    };
    // newest first, as rev-list prints them
    let history = git.list_commits_by_date(branch, None, Some(last_until))?;
    let latest_at = |bound: DateTime<FixedOffset>| history.iter().find(|c| c.date <= bound).cloned();

    let mut periods = Vec::with_capacity(windows.len());
    for window in windows {
        let Some(until_commit) = latest_at(window.until) else {
            debug!(until = %window.until, "no commit before window end");
            continue;
        };
        periods.push(Period {
            since_commit: latest_at(window.since),
            until_commit,
        });
    }
    Ok(periods)
}

/// One changes result per period. Periods without commits get an empty
/// result instead of an analysis.
pub fn changes_timeseries(
    periods: &[Period],
    mut analyze: impl FnMut(&CommitRange) -> Result<ChangesResult>,
) -> Result<Vec<ChangesResult>> {
    let mut results = Vec::with_capacity(periods.len());
    for period in periods {
        let unchanged = period
            .since_commit
            .as_ref()
            .is_some_and(|since| since.id == period.until_commit.id);
        if unchanged {
            results.push(ChangesResult {
                since_commit: period.since_commit.clone(),
                until_commit: Some(period.until_commit.clone()),
                ..ChangesResult::default()
            });
            continue;
        }
        results.push(analyze(&CommitRange::Commits {
            since: period.since_commit.clone(),
            until: Some(period.until_commit.clone()),
        })?);
    }
    Ok(results)
}

/// One ownership snapshot per period, analyzing each distinct commit once.
pub fn ownership_timeseries(
    periods: &[Period],
    mut analyze: impl FnMut(&CommitInfo) -> Result<OwnershipResult>,
) -> Result<Vec<OwnershipResult>> {
    let mut results: Vec<OwnershipResult> = Vec::with_capacity(periods.len());
    for period in periods {
        let reusable = results
            .last()
            .filter(|prev| prev.commit.id == period.until_commit.id)
            .cloned();
        let result = match reusable {
            Some(prev) => prev,
            None => analyze(&period.until_commit)?,
        };
        results.push(result);
    }
    Ok(results)
}

fn day(commit: &CommitInfo) -> String {
    commit.date.format("%Y-%m-%d").to_string()
}

fn period_label(result: &ChangesResult) -> String {
    let since = result.since_commit.as_ref().map_or_else(|| "start".to_string(), day);
    let until = result.until_commit.as_ref().map_or_else(String::new, day);
    format!("{since} - {until}")
}

fn with_diff(cur: i64, prev: i64) -> String {
    format!("{cur}{}", diff_str(cur, prev))
}

fn with_perc(cur: i64, first: i64) -> String {
    format!("{}{}", cur - first, diff_perc_str(cur, first))
}

/// Per-period totals table, plus one table per author in `full` mode.
pub fn format_changes_table(results: &[ChangesResult], full: bool) -> String {
    let mut rows = Vec::with_capacity(results.len() + 1);
    let mut prev = ChangesResult::default();
    let mut sum = (0usize, 0usize, LinesTouched::default());
    for result in results {
        let cur = &result.total_lines_touched;
        let last = &prev.total_lines_touched;
        rows.push(vec![
            period_label(result),
            with_diff(result.total_commits as i64, prev.total_commits as i64),
            with_diff(result.total_files as i64, prev.total_files as i64),
            with_diff(cur.touched(), last.touched()),
            with_diff(cur.new, last.new),
            with_diff(cur.changes, last.changes),
        ]);
        sum.0 += result.total_commits;
        sum.1 += result.total_files;
        sum.2 += cur;
        prev = result.clone();
    }
    rows.push(vec![
        "Total".to_string(),
        sum.0.to_string(),
        sum.1.to_string(),
        sum.2.touched().to_string(),
        sum.2.new.to_string(),
        sum.2.changes.to_string(),
    ]);

    let mut out = String::from("\n");
    out.push_str(&table(
        &[
            "Period",
            "Commits",
            "Files touched",
            "Lines touched",
            "New lines",
            "Changed lines",
        ],
        &rows,
    ));
    if full {
        out.push_str(&format_changes_authors(results));
    }
    out
}

fn format_changes_authors(results: &[ChangesResult]) -> String {
    let mut by_author: BTreeMap<Author, Vec<(String, LinesTouched)>> = BTreeMap::new();
    for result in results {
        for author in &result.authors {
            by_author
                .entry(Author::new(&author.author_name, &author.author_email))
                .or_default()
                .push((period_label(result), author.lines_touched));
        }
    }

    let mut out = String::new();
    for (author, periods) in by_author {
        let mut rows = Vec::with_capacity(periods.len() + 1);
        let mut prev = LinesTouched::default();
        let mut sum = LinesTouched::default();
        for (label, lines) in &periods {
            rows.push(vec![
                label.clone(),
                with_diff(lines.touched(), prev.touched()),
                with_diff(lines.new, prev.new),
                with_diff(lines.changes, prev.changes),
            ]);
            sum += lines;
            prev = *lines;
        }
        rows.push(vec![
            "Total".to_string(),
            sum.touched().to_string(),
            sum.new.to_string(),
            sum.changes.to_string(),
        ]);
        out.push_str(&format!("\n{} {}\n", author.name, author.email));
        out.push_str(&table(
            &["Period", "Lines touched", "New lines", "Changed lines"],
            &rows,
        ));
    }
    out
}

/// Per-snapshot totals table closed by an `Inc/period` row, plus one table
/// per author in `full` mode.
pub fn format_ownership_table(results: &[OwnershipResult], full: bool) -> String {
    let mut rows = Vec::with_capacity(results.len() + 1);
    let mut prev: Option<&OwnershipResult> = None;
    for result in results {
        let (lines, dups, files) = prev.map_or((0, 0, 0), |p| {
            (p.total_lines, p.total_lines_duplicated, p.total_files as i64)
        });
        rows.push(vec![
            day(&result.commit),
            with_diff(result.total_lines, lines),
            with_diff(result.total_lines_duplicated, dups),
            with_diff(result.total_files as i64, files),
        ]);
        prev = Some(result);
    }
    if let (Some(first), Some(last)) = (results.first(), results.last()) {
        rows.push(vec![
            "Inc/period".to_string(),
            with_perc(last.total_lines, first.total_lines),
            with_perc(last.total_lines_duplicated, first.total_lines_duplicated),
            with_perc(last.total_files as i64, first.total_files as i64),
        ]);
    }

    let mut out = String::from("\n");
    out.push_str(&table(&["Date", "Lines", "Duplicates", "Files"], &rows));
    if full {
        out.push_str(&format_ownership_authors(results));
    }
    out
}

fn format_ownership_authors(results: &[OwnershipResult]) -> String {
    let mut by_author: BTreeMap<Author, Vec<(String, &AuthorOwnership)>> = BTreeMap::new();
    for result in results {
        for author in &result.authors {
            by_author
                .entry(Author::new(&author.author_name, &author.author_email))
                .or_default()
                .push((day(&result.commit), author));
        }
    }

    let mut out = String::new();
    for (author, snapshots) in by_author {
        let mut rows = Vec::with_capacity(snapshots.len() + 1);
        let mut prev = AuthorOwnership::default();
        for (date, owned) in &snapshots {
            rows.push(vec![
                date.clone(),
                with_diff(owned.owned_lines_total, prev.owned_lines_total),
                with_diff(owned.owned_lines_duplicate, prev.owned_lines_duplicate),
                with_diff(
                    owned.owned_lines_duplicate_original,
                    prev.owned_lines_duplicate_original,
                ),
            ]);
            prev = (*owned).clone();
        }
        if let (Some((_, first)), Some((_, last))) = (snapshots.first(), snapshots.last()) {
            rows.push(vec![
                "Inc/period".to_string(),
                with_perc(last.owned_lines_total, first.owned_lines_total),
                with_perc(last.owned_lines_duplicate, first.owned_lines_duplicate),
                with_perc(
                    last.owned_lines_duplicate_original,
                    first.owned_lines_duplicate_original,
                ),
            ]);
        }
        out.push_str(&format!("\n{} {}\n", author.name, author.email));
        out.push_str(&table(
            &[
                "Date",
                "Lines",
                "Duplicates (total)",
                "Duplicates (original)",
            ],
            &rows,
        ));
    }
    out
}

/// Windows for the given text bounds; blank `since` or `period` fall back
/// to the defaults.
fn parse_range(
    since: &str,
    until: &str,
    period: &str,
    defaults: (&str, &str),
) -> Result<Vec<Window>> {
    let now = util::now();
    windows(
        util::parse_when(util::or_default(since, defaults.0), now)?,
        util::parse_when(until, now)?,
        util::parse_period(util::or_default(period, defaults.1))?,
    )
}

/// `gitwho changes-timeseries`. Returns the process exit code.
pub fn run_changes(session: &Session, since: &str, until: &str, period: &str) -> Result<i32> {
    let git = &session.git;
    let windows = parse_range(since, until, period, (CHANGES_SINCE, CHANGES_PERIOD))?;
    let periods = resolve_periods(git, &session.settings.branch, &windows)?;
    info!(periods = periods.len(), "changes time series");

    let opts = ChangesOptions::from_session(session);
    let cache = session.cache();
    let results = progress::with_display(session.show_progress, |tx| {
        changes_timeseries(&periods, |range| {
            let CommitRange::Commits { since, until } = range else {
                return changes::analyze_changes(git, &opts, range, Some(tx.clone()));
            };
            let key = changes::cache_key(git, &session.settings, since.as_ref(), until.as_ref());
            cache::cached(cache.as_ref(), &key, || {
                changes::analyze_changes(git, &opts, range, Some(tx.clone()))
            })
        })
    })?;

    if results.iter().all(ChangesResult::is_empty) {
        println!("No changes found");
        return Ok(EXIT_EMPTY);
    }
    match session.format {
        Format::Full | Format::Short => {
            print!("{}", format_changes_table(&results, session.format == Format::Full));
        }
        Format::Json => report_helpers::print_json_stdout(&results)?,
        Format::Graph => {
            return Ok(report_helpers::emit_graph(&GraphPage {
                title: "Changes per period".to_string(),
                charts: vec![BarChart {
                    title: "Lines touched".to_string(),
                    bars: results
                        .iter()
                        .map(|r| (period_label(r), r.total_lines_touched.touched()))
                        .collect(),
                }],
                text: format_changes_table(&results, true),
            }));
        }
    }
    Ok(0)
}

/// `gitwho ownership-timeseries`. Returns the process exit code.
pub fn run_ownership(session: &Session, since: &str, until: &str, period: &str) -> Result<i32> {
    let periods = resolve_periods(
        &session.git,
        &session.settings.branch,
        &parse_range(since, until, period, (OWNERSHIP_SINCE, OWNERSHIP_PERIOD))?,
    )?;
    info!(periods = periods.len(), "ownership time series");

    let results = ownership_timeseries(&periods, |commit| ownership::analyze_cached(session, commit))?;
    if results.iter().all(OwnershipResult::is_empty) {
        println!("No changes found");
        return Ok(EXIT_EMPTY);
    }
    match session.format {
        Format::Full | Format::Short => {
            print!("{}", format_ownership_table(&results, session.format == Format::Full));
        }
        Format::Json => report_helpers::print_json_stdout(&results)?,
        Format::Graph => {
            return Ok(report_helpers::emit_graph(&GraphPage {
                title: "Ownership over time".to_string(),
                charts: vec![BarChart {
                    title: "Lines".to_string(),
                    bars: results
                        .iter()
                        .map(|r| (day(&r.commit), r.total_lines))
                        .collect(),
                }],
                text: format_ownership_table(&results, true),
            }));
        }
    }
    Ok(0)
}

#[cfg(test)]
#[path = "timeseries_test.rs"]
mod tests;
