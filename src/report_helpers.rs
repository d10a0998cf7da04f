use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::error::{EXIT_GRAPH, Result};

/// Compute the max display width of `items`, with a minimum of `min`.
pub fn max_width<'a>(items: impl Iterator<Item = &'a str>, min: usize) -> usize {
    items.map(UnicodeWidthStr::width).max().unwrap_or(min).max(min)
}

/// Print a horizontal separator of box-drawing chars.
pub fn separator(width: usize) -> String {
    "\u{2500}".repeat(width)
}

/// Left-align `text` in a column `width` terminal cells wide.
pub fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Render rows under a header, columns sized to their widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            max_width(
                rows.iter().filter_map(|row| row.get(col)).map(String::as_str),
                header.width(),
            )
        })
        .collect();
    let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    let mut out = String::new();
    let _ = writeln!(out, "{}", table_row(headers.iter().copied(), &widths));
    let _ = writeln!(out, "{}", separator(total));
    for row in rows {
        let _ = writeln!(out, "{}", table_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn table_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| pad(cell, *width))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

/// Serialize to pretty JSON and print to stdout.
pub fn print_json_stdout(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One horizontal bar chart on a graph page.
#[derive(Debug, Clone, Default)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<(String, i64)>,
}

/// Self-contained HTML page: bar charts followed by the text report.
#[derive(Debug, Clone, Default)]
pub struct GraphPage {
    pub title: String,
    pub charts: Vec<BarChart>,
    pub text: String,
}

impl GraphPage {
    pub fn render(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title>\n\
             <style>body{{font-family:sans-serif;margin:2em}}\
             .row{{display:flex;align-items:center;margin:2px 0}}\
             .label{{width:18em;overflow:hidden;white-space:nowrap}}\
             .bar{{background:#4a90d9;height:1.1em;margin-right:.5em}}\
             pre{{background:#f4f4f4;padding:1em}}</style></head><body>\n<h1>{title}</h1>\n",
            title = escape_html(&self.title)
        );
        for chart in &self.charts {
            let max = chart.bars.iter().map(|(_, v)| v.abs()).max().unwrap_or(0).max(1);
            let _ = writeln!(html, "<h2>{}</h2>", escape_html(&chart.title));
            for (label, value) in &chart.bars {
                let _ = writeln!(
                    html,
                    "<div class=\"row\"><span class=\"label\">{}</span>\
                     <span class=\"bar\" style=\"width:{}%\"></span>{value}</div>",
                    escape_html(label),
                    value.abs() * 60 / max
                );
            }
        }
        let _ = write!(
            html,
            "<pre>{}</pre>\n</body></html>\n",
            escape_html(&self.text)
        );
        html
    }
}

/// Write `page` to a new temporary `.html` file that outlives the process.
pub fn write_graph_page(page: &GraphPage) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("gitwho-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(page.render().as_bytes())?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Write the page and report where it went. Returns the exit code.
pub fn emit_graph(page: &GraphPage) -> i32 {
    match write_graph_page(page) {
        Ok(path) => {
            println!("Graph written to {}", path.display());
            0
        }
        Err(err) => {
            eprintln!("error: cannot write graph page: {err}");
            EXIT_GRAPH
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "report_helpers_test.rs"]
mod tests;
