use super::*;
use std::cell::Cell;

use crate::changes::AuthorLines;
use crate::filter::Filters;
use crate::pipeline::PipelineConfig;
use crate::testrepo::{BASE_EPOCH, ownership_repo};

const HOUR: i64 = 3600;

fn at(epoch: i64) -> DateTime<FixedOffset> {
    DateTime::from_timestamp(epoch, 0).unwrap().fixed_offset()
}

fn options() -> ChangesOptions {
    ChangesOptions {
        branch: "main".to_string(),
        filters: Filters::new(".*", "", ".*", "").unwrap(),
        classify: Default::default(),
        pipeline: PipelineConfig {
            num_workers: 2,
            buffer_size: 8,
        },
    }
}

#[test]
fn windows_cover_range() {
    let w = windows(at(0), at(5 * HOUR), Duration::hours(2)).unwrap();
    assert_eq!(w.len(), 3);
    assert_eq!(w[0], Window { since: at(0), until: at(2 * HOUR) });
    assert_eq!(w[2], Window { since: at(4 * HOUR), until: at(5 * HOUR) });
}

#[test]
fn windows_empty_when_reversed() {
    assert!(windows(at(HOUR), at(0), Duration::hours(1)).unwrap().is_empty());
}

#[test]
fn windows_reject_zero_period() {
    let err = windows(at(0), at(HOUR), Duration::zero()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn windows_reject_huge_counts() {
    assert!(windows(at(0), at(365 * 24 * HOUR), Duration::seconds(1)).is_err());
}

#[test]
fn blank_range_uses_defaults() {
    let changes = parse_range("", "now", " ", (CHANGES_SINCE, CHANGES_PERIOD)).unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].until - changes[0].since, Duration::days(30));

    let ownership = parse_range("", "", "", (OWNERSHIP_SINCE, OWNERSHIP_PERIOD)).unwrap();
    assert_eq!(ownership.len(), 7);
    assert_eq!(ownership[0].until - ownership[0].since, Duration::weeks(2));
}

#[test]
fn periods_empty_without_windows() {
    let (dir, _ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    assert!(resolve_periods(&git, "main", &[]).unwrap().is_empty());
}

fn fixture_periods(git: &Git) -> Vec<Period> {
    // the first two windows end before the first commit
    let w = windows(
        at(BASE_EPOCH - 9 * HOUR / 2),
        at(BASE_EPOCH + 11 * HOUR / 2),
        Duration::hours(2),
    )
    .unwrap();
    assert_eq!(w.len(), 5);
    resolve_periods(git, "main", &w).unwrap()
}

#[test]
fn periods_resolve_to_commits() {
    let (dir, ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    let periods = fixture_periods(&git);
    assert_eq!(periods.len(), 3);
    assert_eq!(periods[0].since_commit, None);
    assert_eq!(periods[0].until_commit.id, ids[1]);
    assert_eq!(periods[1].since_commit.as_ref().map(|c| c.id.as_str()), Some(ids[1].as_str()));
    assert_eq!(periods[1].until_commit.id, ids[3]);
    assert_eq!(periods[2].until_commit.id, ids[4]);
}

#[test]
fn changes_per_period() {
    let (dir, _ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    let periods = fixture_periods(&git);
    let opts = options();
    let results = changes_timeseries(&periods, |range| {
        changes::analyze_changes(&git, &opts, range, None)
    })
    .unwrap();

    let commits: Vec<usize> = results.iter().map(|r| r.total_commits).collect();
    assert_eq!(commits, [2, 2, 1]);
    let new: i64 = results.iter().map(|r| r.total_lines_touched.new).sum();
    assert_eq!(new, 8);
    assert_eq!(results[2].total_lines_touched.new, 5);
}

#[test]
fn unchanged_period_is_not_analyzed() {
    let (dir, ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    let w = windows(
        at(BASE_EPOCH + 9 * HOUR / 2),
        at(BASE_EPOCH + 11 * HOUR / 2),
        Duration::hours(1),
    )
    .unwrap();
    let periods = resolve_periods(&git, "main", &w).unwrap();
    assert_eq!(periods.len(), 1);

    let results =
        changes_timeseries(&periods, |_| panic!("nothing to analyze in this window")).unwrap();
    assert!(results[0].is_empty());
    assert_eq!(results[0].until_commit.as_ref().map(|c| c.id.clone()), Some(ids[4].clone()));
}

#[test]
fn ownership_per_period() {
    let (dir, _ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    let periods = fixture_periods(&git);
    let opts = ownership::OwnershipOptions {
        filters: Filters::default(),
        max_file_size: 30_000,
        min_dup_lines: 4,
        ignore_trivial_lines: true,
        pipeline: PipelineConfig {
            num_workers: 2,
            buffer_size: 8,
        },
    };
    let results = ownership_timeseries(&periods, |commit| {
        ownership::analyze_ownership(&git, &opts, commit, None)
    })
    .unwrap();
    let lines: Vec<i64> = results.iter().map(|r| r.total_lines).collect();
    assert_eq!(lines, [2, 2, 7]);
}

#[test]
fn ownership_reuses_same_commit() {
    let commit = CommitInfo {
        id: "abc".to_string(),
        author_name: "a".to_string(),
        author_email: "a@mail.com".to_string(),
        date: at(BASE_EPOCH),
    };
    let period = Period {
        since_commit: None,
        until_commit: commit.clone(),
    };
    let calls = Cell::new(0);
    let results = ownership_timeseries(&[period.clone(), period], |c| {
        calls.set(calls.get() + 1);
        Ok(OwnershipResult {
            total_lines: 3,
            ..OwnershipResult::empty(c.clone())
        })
    })
    .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].total_lines, 3);
}

fn commit_on(day: u32) -> CommitInfo {
    CommitInfo {
        id: format!("c{day}"),
        author_name: "alice".to_string(),
        author_email: "alice@mail.com".to_string(),
        date: DateTime::parse_from_rfc3339(&format!("2024-01-{day:02}T12:00:00+00:00")).unwrap(),
    }
}

fn changes_result(since: u32, until: u32, new: i64, changes: i64) -> ChangesResult {
    let lines = LinesTouched {
        new,
        changes,
        churn_own: changes,
        ..Default::default()
    };
    ChangesResult {
        total_commits: 1,
        total_files: 1,
        total_lines_touched: lines,
        authors: vec![AuthorLines {
            author_name: "alice".to_string(),
            author_email: "alice@mail.com".to_string(),
            lines_touched: lines,
            files_touched: Vec::new(),
        }],
        since_commit: Some(commit_on(since)),
        until_commit: Some(commit_on(until)),
        ..Default::default()
    }
}

#[test]
fn changes_table_rows() {
    let results = vec![changes_result(1, 8, 5, 0), changes_result(8, 15, 7, 3)];
    let out = format_changes_table(&results, false);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "");
    assert!(lines[1].starts_with("Period"));
    assert!(lines[3].starts_with("2024-01-01 - 2024-01-08"));
    assert!(lines[4].contains("10 (+5)"));
    let total: Vec<&str> = lines[5].split_whitespace().collect();
    assert_eq!(total, ["Total", "2", "2", "15", "12", "3"]);
    assert!(!out.contains("alice"));
}

#[test]
fn changes_table_full_adds_authors() {
    let results = vec![changes_result(1, 8, 5, 0), changes_result(8, 15, 7, 3)];
    let out = format_changes_table(&results, true);
    assert!(out.contains("\nalice alice@mail.com\n"));
}

fn snapshot(day: u32, lines: i64, dups: i64) -> OwnershipResult {
    OwnershipResult {
        total_files: 2,
        total_lines: lines,
        total_lines_duplicated: dups,
        authors: vec![AuthorOwnership {
            author_name: "alice".to_string(),
            author_email: "alice@mail.com".to_string(),
            owned_lines_total: lines,
            ..Default::default()
        }],
        ..OwnershipResult::empty(commit_on(day))
    }
}

#[test]
fn ownership_table_rows() {
    let results = vec![snapshot(1, 100, 10), snapshot(15, 150, 10)];
    let out = format_ownership_table(&results, false);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[1].starts_with("Date"));
    assert!(lines[3].starts_with("2024-01-01  100"));
    assert!(lines[4].starts_with("2024-01-15  150 (+50)"));
    assert!(lines[5].starts_with("Inc/period  50 (+50%)"));
    assert_eq!(lines.len(), 6);
}

#[test]
fn ownership_table_full_adds_authors() {
    let results = vec![snapshot(1, 100, 10), snapshot(15, 150, 10)];
    let out = format_ownership_table(&results, true);
    assert!(out.contains("\nalice alice@mail.com\n"));
    assert!(out.contains("Duplicates (original)"));
}
