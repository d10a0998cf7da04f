use std::fmt::Write as _;

use super::model::{AuthorOwnership, OwnershipResult};
use crate::dups::report::{DuplicationMetrics, format_groups, format_summary};
use crate::report_helpers::{self, BarChart, GraphPage};

/// Totals, line age and duplication, then one line per author with
/// their age and duplication counters.
pub fn format_full(result: &OwnershipResult) -> String {
    let mut out = header(result);
    let _ = writeln!(out, "Avg line age: {:.0} days", result.average_age_days());
    let _ = writeln!(
        out,
        "Duplicated lines: {} ({}%)",
        result.total_lines_duplicated,
        whole_percent(result.total_lines_duplicated, result.total_lines)
    );
    if result.skipped_files > 0 {
        let _ = writeln!(out, "Files skipped: {}", result.skipped_files);
    }
    let _ = writeln!(out, "Total lines: {}", result.total_lines);
    for author in &result.authors {
        let _ = writeln!(
            out,
            "  {} {}: {}{} avg-days:{} dup:{} orig:{} dup-others:{}",
            author.author_name,
            author.author_email,
            author.owned_lines_total,
            share(author, result.total_lines),
            author.average_age_days() as i64,
            author.owned_lines_duplicate,
            author.owned_lines_duplicate_original,
            author.owned_lines_duplicate_original_others
        );
    }
    out
}

/// Lines per author only.
pub fn format_short(result: &OwnershipResult) -> String {
    let mut out = header(result);
    let _ = writeln!(out, "Total lines: {}", result.total_lines);
    for author in &result.authors {
        let _ = writeln!(
            out,
            "  {}: {}{}",
            author.author_name,
            author.owned_lines_total,
            share(author, result.total_lines)
        );
    }
    out
}

fn header(result: &OwnershipResult) -> String {
    format!(
        "\nTotal authors: {}\nTotal files: {}\n",
        result.authors.len(),
        result.total_files
    )
}

/// `" (P.P%)"` share of the total, one decimal.
fn share(author: &AuthorOwnership, total: i64) -> String {
    if total == 0 {
        return String::new();
    }
    format!(
        " ({:.1}%)",
        100.0 * author.owned_lines_total as f64 / total as f64
    )
}

fn whole_percent(value: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (100.0 * value as f64 / total as f64) as i64
    }
}

/// Graph page of owned lines per author. Returns the exit code.
pub fn write_graph(result: &OwnershipResult) -> i32 {
    let bars = |metric: fn(&AuthorOwnership) -> i64| -> Vec<(String, i64)> {
        result
            .authors
            .iter()
            .map(|a| (a.author_name.clone(), metric(a)))
            .collect()
    };
    report_helpers::emit_graph(&GraphPage {
        title: format!("Ownership at {}", result.commit.date.format("%Y-%m-%d")),
        charts: vec![
            BarChart {
                title: "Owned lines".to_string(),
                bars: bars(|a| a.owned_lines_total),
            },
            BarChart {
                title: "Duplicated lines".to_string(),
                bars: bars(|a| a.owned_lines_duplicate),
            },
        ],
        text: format_full(result),
    })
}

/// Graph page for the duplicates view. Returns the exit code.
pub fn write_duplicates_graph(result: &OwnershipResult) -> i32 {
    let groups = &result.duplicate_line_groups;
    let metrics = DuplicationMetrics::new(groups, result.total_lines as usize);
    report_helpers::emit_graph(&GraphPage {
        title: "Duplicated lines".to_string(),
        charts: vec![BarChart {
            title: "Copies by author".to_string(),
            bars: result
                .authors
                .iter()
                .map(|a| (a.author_name.clone(), a.owned_lines_duplicate))
                .collect(),
        }],
        text: format!("{}{}", format_summary(&metrics), format_groups(groups, true)),
    })
}
