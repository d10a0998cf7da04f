use super::*;
use chrono::{DateTime, Duration, FixedOffset};

use crate::changes::model::LinesTouched;
use crate::diff::LineText;
use crate::testrepo::{BASE_EPOCH, commit_as, create_test_repo, ownership_repo, remove_as};

fn at(hours_before: i64) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00+00:00").unwrap() - Duration::hours(hours_before)
}

fn commit_by(name: &str) -> CommitInfo {
    CommitInfo {
        id: "c0ffee".to_string(),
        author_name: name.to_string(),
        author_email: format!("{name}@mail.com"),
        date: at(0),
    }
}

fn blame_line(name: &str, hours_before: i64) -> BlameLine {
    BlameLine {
        commit_id: "feed".to_string(),
        author_name: name.to_string(),
        author_email: format!("{name}@mail.com"),
        author_date: at(hours_before),
        text: "x".to_string(),
    }
}

fn lines(numbers: &[usize]) -> Vec<LineText> {
    numbers
        .iter()
        .map(|&number| LineText {
            number,
            text: "x".to_string(),
        })
        .collect()
}

fn hunk(op: DiffOp, src: &[usize], dst: &[usize]) -> Hunk {
    Hunk {
        op,
        src_lines: lines(src),
        dst_lines: lines(dst),
        anchor: 0,
    }
}

fn counters(changes: &FileChanges, name: &str) -> LinesTouched {
    changes
        .authors
        .get(&Author::new(name, format!("{name}@mail.com")))
        .copied()
        .unwrap_or_default()
}

fn classify(
    commit: &CommitInfo,
    src: &[BlameLine],
    dst: &[BlameLine],
    hunks: &[Hunk],
) -> FileChanges {
    let mut changes = FileChanges::new(&commit.id, "f.rs");
    classify_hunks(&mut changes, commit, src, dst, hunks, DEFAULT_REFACTOR_AGE_HOURS).unwrap();
    changes
}

#[test]
fn added_lines_are_new_for_blamed_author() {
    let dst = vec![blame_line("alice", 100), blame_line("bob", 0), blame_line("bob", 0)];
    let changes = classify(
        &commit_by("bob"),
        &[],
        &dst,
        &[hunk(DiffOp::Add, &[], &[2, 3])],
    );
    assert_eq!(counters(&changes, "bob").new, 2);
    assert_eq!(changes.authors.len(), 1);
}

#[test]
fn recent_line_of_other_author_is_churn() {
    let src = vec![blame_line("alice", 1)];
    let dst = vec![blame_line("bob", 0)];
    let changes = classify(&commit_by("bob"), &src, &dst, &[hunk(DiffOp::Change, &[1], &[1])]);

    let bob = counters(&changes, "bob");
    assert_eq!(bob.changes, 1);
    assert_eq!(bob.churn_other, 1);
    assert_eq!(bob.new, 0);
    let alice = counters(&changes, "alice");
    assert_eq!(alice.churn_received, 1);
    assert_eq!(alice.touched(), 0);
}

#[test]
fn old_line_of_other_author_is_refactor() {
    let src = vec![blame_line("alice", 30 * 24)];
    let dst = vec![blame_line("bob", 0)];
    let changes = classify(&commit_by("bob"), &src, &dst, &[hunk(DiffOp::Change, &[1], &[1])]);

    let bob = counters(&changes, "bob");
    assert_eq!(bob.refactor_other, 1);
    assert_eq!(bob.age_days_sum, 30.0);
    assert_eq!(counters(&changes, "alice").refactor_received, 1);
}

#[test]
fn age_keeps_partial_hours() {
    let mut src_line = blame_line("alice", 36);
    src_line.author_date = src_line.author_date - Duration::minutes(30);
    let dst = vec![blame_line("bob", 0)];
    let changes = classify(&commit_by("bob"), &[src_line], &dst, &[hunk(DiffOp::Change, &[1], &[1])]);

    let bob = counters(&changes, "bob");
    assert_eq!(bob.churn_other, 1);
    assert!((bob.age_days_sum - 36.5 / 24.0).abs() < 1e-9);
}

#[test]
fn refactor_threshold_is_exclusive() {
    let src = vec![blame_line("bob", DEFAULT_REFACTOR_AGE_HOURS)];
    let dst = vec![blame_line("bob", 0)];
    let changes = classify(&commit_by("bob"), &src, &dst, &[hunk(DiffOp::Change, &[1], &[1])]);
    assert_eq!(counters(&changes, "bob").churn_own, 1);
}

#[test]
fn own_lines_credit_nobody_else() {
    let src = vec![blame_line("bob", 600), blame_line("bob", 2)];
    let dst = vec![blame_line("bob", 0), blame_line("bob", 0)];
    let changes = classify(
        &commit_by("bob"),
        &src,
        &dst,
        &[hunk(DiffOp::Change, &[1, 2], &[1, 2])],
    );
    let bob = counters(&changes, "bob");
    assert_eq!(bob.changes, 2);
    assert_eq!(bob.refactor_own, 1);
    assert_eq!(bob.churn_own, 1);
    assert_eq!(changes.authors.len(), 1);
}

#[test]
fn deleted_lines_go_to_committer() {
    let src = vec![blame_line("alice", 2), blame_line("alice", 2)];
    let dst = vec![blame_line("alice", 2)];
    let changes = classify(&commit_by("bob"), &src, &dst, &[hunk(DiffOp::Delete, &[2], &[])]);

    let bob = counters(&changes, "bob");
    assert_eq!(bob.changes, 1);
    assert_eq!(bob.churn_other, 1);
    assert_eq!(counters(&changes, "alice").churn_received, 1);
}

#[test]
fn growing_change_adds_new_lines() {
    let src = vec![blame_line("alice", 1)];
    let dst = vec![blame_line("bob", 0), blame_line("bob", 0), blame_line("bob", 0)];
    let changes = classify(
        &commit_by("bob"),
        &src,
        &dst,
        &[hunk(DiffOp::Change, &[1], &[1, 2, 3])],
    );
    let bob = counters(&changes, "bob");
    assert_eq!(bob.changes, 1);
    assert_eq!(bob.new, 2);
}

#[test]
fn changes_equal_sum_of_kinds() {
    let src = vec![blame_line("alice", 1), blame_line("bob", 900), blame_line("carol", 900)];
    let dst = vec![blame_line("bob", 0)];
    let changes = classify(
        &commit_by("bob"),
        &src,
        &dst,
        &[hunk(DiffOp::Change, &[1, 2, 3], &[1])],
    );
    let total = changes.total();
    assert_eq!(
        total.changes,
        total.refactor_own + total.refactor_other + total.churn_own + total.churn_other
    );
    assert_eq!(total.changes, 3);
}

#[test]
fn out_of_range_line_fails() {
    let dst = vec![blame_line("bob", 0)];
    let mut changes = FileChanges::new("c0ffee", "f.rs");
    let err = classify_hunks(
        &mut changes,
        &commit_by("bob"),
        &[],
        &dst,
        &[hunk(DiffOp::Add, &[], &[5])],
        DEFAULT_REFACTOR_AGE_HOURS,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

fn classify_repo(git: &Git, commit_id: &str, path: &str) -> FileChanges {
    match classify_file(git, commit_id, path, &ClassifyOptions::default()).unwrap() {
        FileOutcome::Classified(changes) => changes,
        FileOutcome::Skipped => panic!("{path} skipped at {commit_id}"),
    }
}

#[test]
fn classifies_fixture_history() {
    let (dir, ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();

    let c1 = classify_repo(&git, &ids[0], "file1");
    assert_eq!(counters(&c1, "author1").new, 1);

    let c2 = classify_repo(&git, &ids[1], "file1");
    let author2 = counters(&c2, "author2");
    assert_eq!((author2.new, author2.churn_other), (1, 1));
    assert_eq!(counters(&c2, "author1").churn_received, 1);

    let c3 = classify_repo(&git, &ids[2], "file1");
    let author1 = counters(&c3, "author1");
    assert_eq!((author1.new, author1.churn_other), (1, 1));
    assert_eq!(counters(&c3, "author2").churn_received, 1);

    let c4 = classify_repo(&git, &ids[3], "file1");
    let author1 = counters(&c4, "author1");
    assert_eq!((author1.new, author1.changes, author1.churn_own), (0, 1, 1));
    assert_eq!(c4.authors.len(), 1);

    let c5 = classify_repo(&git, &ids[4], "dir1/dir1.1/file2");
    assert_eq!(counters(&c5, "author3").new, 5);
}

#[test]
fn oversized_file_is_skipped() {
    let (dir, ids) = ownership_repo();
    let git = Git::discover(dir.path(), 30).unwrap();
    let opts = ClassifyOptions {
        max_file_size: 2,
        ..ClassifyOptions::default()
    };
    let outcome = classify_file(&git, &ids[4], "dir1/dir1.1/file2", &opts).unwrap();
    assert_eq!(outcome, FileOutcome::Skipped);
}

#[test]
fn deleted_file_is_skipped() {
    let (dir, repo) = create_test_repo();
    commit_as(&repo, "author1", &[("gone.txt", "one\ntwo\n")], "add", BASE_EPOCH);
    let removal = remove_as(&repo, "author2", "gone.txt", BASE_EPOCH + 60);
    let git = Git::discover(dir.path(), 30).unwrap();
    let outcome = classify_file(&git, &removal, "gone.txt", &ClassifyOptions::default()).unwrap();
    assert_eq!(outcome, FileOutcome::Skipped);
}

#[test]
fn binary_file_is_skipped() {
    let (dir, repo) = create_test_repo();
    let id = commit_as(&repo, "author1", &[("blob.bin", "ab\0cd\0ef")], "bin", BASE_EPOCH);
    let git = Git::discover(dir.path(), 30).unwrap();
    let outcome = classify_file(&git, &id, "blob.bin", &ClassifyOptions::default()).unwrap();
    assert_eq!(outcome, FileOutcome::Skipped);
}
