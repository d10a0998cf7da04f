use std::fmt::Write as _;

use super::model::{AuthorLines, ChangesResult, FileTouched, LinesTouched};
use crate::report_helpers::{self, BarChart, GraphPage, separator};
use crate::util::perc_str;

const TOP_FILES: usize = 5;
const TOP_RANKED: usize = 3;

/// Totals followed by a breakdown for every author who touched lines.
pub fn format_full(result: &ChangesResult) -> String {
    let mut out = String::new();
    let active = result
        .authors
        .iter()
        .filter(|a| a.lines_touched.touched() > 0)
        .count();
    let _ = writeln!(out, "Total authors active: {active}");
    let _ = writeln!(out, "Total commits: {}", result.total_commits);
    let _ = writeln!(out, "Total files touched: {}", result.total_files);
    if result.skipped_files > 0 {
        let _ = writeln!(out, "Files skipped: {}", result.skipped_files);
    }
    if let Some(age) = result.total_lines_touched.average_age_days() {
        let _ = writeln!(out, "Average line age when changed: {} days", age as i64);
    }
    out.push_str(&format_lines_touched(
        &result.total_lines_touched,
        &LinesTouched::default(),
    ));

    for author in &result.authors {
        if author.lines_touched.touched() == 0 {
            continue;
        }
        let _ = writeln!(out, "\nAuthor: {} {}", author.author_name, author.author_email);
        out.push_str(&format_lines_touched(
            &author.lines_touched,
            &result.total_lines_touched,
        ));
        out.push_str(&format_top_files(&author.files_touched));
    }
    out
}

fn format_lines_touched(lines: &LinesTouched, totals: &LinesTouched) -> String {
    let touched = lines.touched();
    let refactor = lines.refactor();
    let churn = lines.churn();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "- Total lines touched: {touched}{}",
        perc_str(touched, totals.touched())
    );
    let _ = writeln!(out, "  - New lines: {}{}", lines.new, perc_str(lines.new, touched));
    let _ = writeln!(
        out,
        "  - Changed lines: {}{}",
        lines.changes,
        perc_str(lines.changes, touched)
    );
    let _ = writeln!(
        out,
        "    - Refactor: {refactor}{}",
        perc_str(refactor, lines.changes)
    );
    let _ = writeln!(
        out,
        "      - Refactor of own lines: {}{}",
        lines.refactor_own,
        perc_str(lines.refactor_own, refactor)
    );
    let _ = writeln!(
        out,
        "      - Refactor of other's lines: {}{}",
        lines.refactor_other,
        perc_str(lines.refactor_other, refactor)
    );
    let _ = writeln!(
        out,
        "      * Refactor done by others to own lines (help received): {}",
        lines.refactor_received
    );
    let _ = writeln!(out, "    - Churn: {churn}{}", perc_str(churn, lines.changes));
    let _ = writeln!(
        out,
        "      - Churn of own lines: {}{}",
        lines.churn_own,
        perc_str(lines.churn_own, churn)
    );
    let _ = writeln!(
        out,
        "      - Churn of other's lines (help given): {}{}",
        lines.churn_other,
        perc_str(lines.churn_other, churn)
    );
    let _ = writeln!(
        out,
        "      * Churn done by others to own lines (help received): {}",
        lines.churn_received
    );
    out
}

fn format_top_files(files: &[FileTouched]) -> String {
    let mut out = String::from("  - Top files:\n");
    for file in files.iter().take(TOP_FILES) {
        let _ = writeln!(out, "    - {} ({})", file.name, file.lines);
    }
    out
}

/// Rankings of the authors by kind of work.
pub fn format_short(result: &ChangesResult) -> String {
    let total = &result.total_lines_touched;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Commits: {}  Files: {}  Lines touched: {}",
        result.total_commits,
        result.total_files,
        total.touched()
    );

    let rankings: [(&str, fn(&LinesTouched) -> i64); 5] = [
        ("Top Coders (new+refactor-churn)", LinesTouched::score),
        ("Top New Liners", |l| l.new),
        ("Top Refactorers", LinesTouched::refactor),
        ("Top Helpers", |l| l.churn_other),
        ("Top Churners", |l| l.churn_own + l.churn_received),
    ];
    for (title, metric) in rankings {
        let _ = writeln!(out, "\n{title}");
        let _ = writeln!(out, "{}", separator(title.len()));
        for author in ranked(&result.authors, metric) {
            let value = metric(&author.lines_touched);
            let _ = writeln!(
                out,
                "  {} {}: {value}{}",
                author.author_name,
                author.author_email,
                perc_str(value, metric(total))
            );
        }
    }
    out
}

/// The top authors by `metric`, highest first, ties by name.
fn ranked(authors: &[AuthorLines], metric: fn(&LinesTouched) -> i64) -> Vec<&AuthorLines> {
    let mut sorted: Vec<&AuthorLines> = authors.iter().collect();
    sorted.sort_by(|a, b| {
        metric(&b.lines_touched)
            .cmp(&metric(&a.lines_touched))
            .then_with(|| a.author_name.cmp(&b.author_name))
    });
    sorted.truncate(TOP_RANKED);
    sorted
}

/// Graph page with per-author line charts. Returns the exit code.
pub fn write_graph(result: &ChangesResult) -> i32 {
    report_helpers::emit_graph(&graph_page(result))
}

fn graph_page(result: &ChangesResult) -> GraphPage {
    let chart = |title: &str, metric: fn(&LinesTouched) -> i64| BarChart {
        title: title.to_string(),
        bars: result
            .authors
            .iter()
            .map(|a| (a.author_name.clone(), metric(&a.lines_touched)))
            .collect(),
    };
    GraphPage {
        title: "Changes by author".to_string(),
        charts: vec![
            chart("Lines touched", LinesTouched::touched),
            chart("New lines", |l| l.new),
            chart("Refactored lines", LinesTouched::refactor),
            chart("Churned lines", LinesTouched::churn),
        ],
        text: format_full(result),
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
