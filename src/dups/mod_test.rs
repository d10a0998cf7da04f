use super::*;
use std::sync::Arc;
use std::thread;

const LINES: [&str; 4] = [
    "let total_value = compute_total(items);",
    "let average_value = total_value / items.len();",
    "println!(\"average = {}\", average_value);",
    "return average_value * scale_factor;",
];

fn src(file: &str, line: usize) -> LineSource {
    LineSource {
        file_path: file.to_string(),
        line_number: line,
        line_count: 1,
        author_name: "author1".to_string(),
        author_email: "author1@mail.com".to_string(),
        commit_date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap(),
        line_hash: 0,
    }
}

fn hashed(hash: u64, file: &str, line: usize, count: usize) -> LineSource {
    LineSource {
        line_hash: hash,
        line_count: count,
        ..src(file, line)
    }
}

fn feed_block(tracker: &DuplicateLineTracker, file: &str, first_line: usize) {
    for (i, text) in LINES.iter().enumerate() {
        tracker.add_line(text, src(file, first_line + i));
    }
}

#[test]
fn find_line_groups_merges_adjacent_runs() {
    let mut sources = vec![
        hashed(1, "f1", 1, 1),
        hashed(2, "f1", 2, 2),
        hashed(1, "f1", 5, 4),
    ];
    let groups = find_line_groups(&mut sources);
    assert_eq!(groups.len(), 2);
    assert_eq!((groups[0].line_number, groups[0].line_count), (1, 3));
    assert_eq!(groups[0].line_hashes, vec![1, 2]);
    assert_eq!((groups[1].line_number, groups[1].line_count), (5, 4));
    assert_eq!(groups[1].line_hashes, vec![1]);
}

#[test]
fn find_line_groups_splits_by_file() {
    let mut sources = vec![hashed(1, "b", 2, 1), hashed(1, "a", 1, 1), hashed(2, "a", 2, 1)];
    let groups = find_line_groups(&mut sources);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].file_path, "a");
    assert_eq!(groups[0].line_count, 2);
    assert_eq!(groups[1].file_path, "b");
}

#[test]
fn add_line_reports_occurrences() {
    let tracker = DuplicateLineTracker::new();
    assert_eq!(tracker.add_line(LINES[0], src("a.rs", 1)), Some((1, false)));
    assert_eq!(
        tracker.add_line(&format!("\t{}  ", LINES[0]), src("b.rs", 9)),
        Some((2, true))
    );
    assert_eq!(tracker.fingerprint_count(), 1);
}

#[test]
fn add_line_ignores_trivial_lines() {
    let tracker = DuplicateLineTracker::new();
    assert_eq!(tracker.add_line("}", src("a.rs", 1)), None);
    assert_eq!(tracker.add_line("import foo.bar.Something;", src("a.rs", 2)), None);
    assert_eq!(tracker.fingerprint_count(), 0);

    let keep_all = DuplicateLineTracker::with_trivial_lines();
    assert_eq!(keep_all.add_line("}", src("a.rs", 1)), Some((1, false)));
}

#[test]
fn group_lines_relates_copies() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "src/b.rs", 3);
    feed_block(&tracker, "src/a.rs", 10);
    tracker.add_line("let unique_value = something_only_here();", src("src/a.rs", 20));

    let groups = tracker.group_lines(4);
    assert_eq!(groups.len(), 1);
    let primary = &groups[0];
    assert_eq!(primary.file_path, "src/a.rs");
    assert_eq!((primary.line_number, primary.line_count), (10, 4));
    assert_eq!(primary.related_groups.len(), 1);
    assert_eq!(primary.related_groups[0].file_path, "src/b.rs");
    assert_eq!(primary.related_groups[0].line_number, 3);
    assert_eq!(primary.related_groups[0].line_count, 4);
}

#[test]
fn group_lines_three_copies() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "z.rs", 1);
    feed_block(&tracker, "m.rs", 40);
    feed_block(&tracker, "a.rs", 7);

    let groups = tracker.group_lines(2);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].file_path, "a.rs");
    let related: Vec<&str> = groups[0]
        .related_groups
        .iter()
        .map(|g| g.file_path.as_str())
        .collect();
    assert_eq!(related, vec!["m.rs", "z.rs"]);
    for group in &groups[0].related_groups {
        assert_eq!(group.line_count, groups[0].line_count);
    }
}

#[test]
fn group_lines_within_one_file() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "a.rs", 1);
    feed_block(&tracker, "a.rs", 30);

    let groups = tracker.group_lines(4);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].line_number, 1);
    assert_eq!(groups[0].related_groups[0].line_number, 30);
}

#[test]
fn group_lines_min_length_filter() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "a.rs", 1);
    feed_block(&tracker, "b.rs", 1);
    assert!(tracker.group_lines(5).is_empty());
    assert_eq!(tracker.group_lines(4).len(), 1);
}

#[test]
fn group_lines_drops_singletons() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "a.rs", 1);
    assert!(tracker.group_lines(1).is_empty());
}

#[test]
fn group_lines_requires_same_sequence() {
    let tracker = DuplicateLineTracker::new();
    feed_block(&tracker, "a.rs", 1);
    // same lines, different order: adjacent runs but not a copy
    for (i, text) in LINES.iter().rev().enumerate() {
        tracker.add_line(text, src("b.rs", 1 + i));
    }
    let groups = tracker.group_lines(1);
    assert!(groups.is_empty(), "got {groups:?}");
}

#[test]
fn concurrent_feeding() {
    let tracker = Arc::new(DuplicateLineTracker::new());
    let handles: Vec<_> = ["a.rs", "b.rs", "c.rs", "d.rs"]
        .into_iter()
        .map(|file| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || feed_block(&tracker, file, 1))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tracker.fingerprint_count(), 4);
    let groups = tracker.group_lines(4);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].file_path, "a.rs");
    assert_eq!(groups[0].related_groups.len(), 3);
}
