use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use super::LineGroup;
use crate::error::Result;

/// Related groups listed before `short` output stops.
pub const SHORT_RELATED_LIMIT: usize = 20;

/// Summary metrics for a set of duplicate groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicationMetrics {
    pub total_lines: usize,
    /// Lines inside related groups (copies of a primary group).
    pub duplicated_lines: usize,
    pub duplicate_groups: usize,
    pub files_with_duplicates: usize,
    pub largest_block: usize,
}

impl DuplicationMetrics {
    pub fn new(groups: &[LineGroup], total_lines: usize) -> Self {
        let mut files: HashSet<&str> = HashSet::new();
        let mut metrics = Self {
            total_lines,
            duplicate_groups: groups.len(),
            ..Self::default()
        };
        for group in groups {
            files.insert(&group.file_path);
            metrics.largest_block = metrics.largest_block.max(group.line_count);
            for related in &group.related_groups {
                files.insert(&related.file_path);
                metrics.duplicated_lines += related.line_count;
            }
        }
        metrics.files_with_duplicates = files.len();
        metrics
    }

    /// Whole percent of duplicated lines.
    pub fn percentage(&self) -> i64 {
        if self.total_lines == 0 {
            0
        } else {
            (100.0 * self.duplicated_lines as f64 / self.total_lines as f64) as i64
        }
    }
}

/// Totals header of the duplicates listing.
pub fn format_summary(metrics: &DuplicationMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total lines: {}", metrics.total_lines);
    let _ = writeln!(
        out,
        "Duplicated lines: {} ({}%)",
        metrics.duplicated_lines,
        metrics.percentage()
    );
    out
}

/// One `path:start - end` line per primary group, its copies indented
/// below. Without `full` the listing stops after
/// [`SHORT_RELATED_LIMIT`] related groups.
pub fn format_groups(groups: &[LineGroup], full: bool) -> String {
    let mut out = String::new();
    let mut listed = 0;
    for group in groups {
        let _ = writeln!(out, "{}", location(group));
        for related in &group.related_groups {
            let _ = writeln!(out, "  {}", location(related));
            listed += 1;
            if !full && listed > SHORT_RELATED_LIMIT {
                out.push_str("...(use --format \"full\" for more results)\n");
                return out;
            }
        }
    }
    out
}

/// `end` is one past the last line, as the listing always showed it.
fn location(group: &LineGroup) -> String {
    format!(
        "{}:{} - {}",
        group.file_path,
        group.line_number,
        group.line_number + group.line_count
    )
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    metrics: &'a DuplicationMetrics,
    duplication_percentage: i64,
    groups: &'a [LineGroup],
}

pub fn format_json(metrics: &DuplicationMetrics, groups: &[LineGroup]) -> Result<String> {
    let output = JsonOutput {
        metrics,
        duplication_percentage: metrics.percentage(),
        groups,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
