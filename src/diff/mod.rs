//! Parser for classic normal-form `diff` output.
//!
//! ```text
//! 1,3c1          change: source lines 1..=3 become destination line 1
//! < old one
//! < old two
//! < old three
//! ---
//! > new one
//! 6a5,6          add: after source line 6, destination lines 5..=6
//! > added
//! > added too
//! 8,9d7          delete: source lines 8..=9, destination stays at 7
//! < gone
//! < gone too
//! ```
//!
//! The side that a hunk does not populate (the source of an add, the
//! destination of a delete) only keeps its anchor line number.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:,(\d+))?([acd])(\d+)(?:,(\d+))?$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Add,
    Delete,
    Change,
}

impl DiffOp {
    fn letter(self) -> char {
        match self {
            DiffOp::Add => 'a',
            DiffOp::Delete => 'd',
            DiffOp::Change => 'c',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineText {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub op: DiffOp,
    pub src_lines: Vec<LineText>,
    pub dst_lines: Vec<LineText>,
    /// Line number on the empty side of an add or delete; 0 for changes.
    pub anchor: usize,
}

/// Parse normal-form diff output into hunks, one per operation header.
pub fn parse(output: &str) -> Result<Vec<Hunk>> {
    // "\ No newline at end of file" markers carry no line
    let mut lines = output.lines().filter(|l| !l.starts_with('\\'));
    let mut hunks = Vec::new();

    while let Some(header) = lines.next() {
        if header.is_empty() {
            continue;
        }
        let caps = HEADER
            .captures(header)
            .ok_or_else(|| Error::Parse(format!("malformed diff header: '{header}'")))?;
        let (src_from, src_to) = range(&caps, 1, 2)?;
        let (dst_from, dst_to) = range(&caps, 4, 5)?;

        let op = match &caps[3] {
            "a" => DiffOp::Add,
            "d" => DiffOp::Delete,
            _ => DiffOp::Change,
        };

        let mut hunk = Hunk {
            op,
            src_lines: Vec::new(),
            dst_lines: Vec::new(),
            anchor: 0,
        };

        if op == DiffOp::Add {
            hunk.anchor = src_from;
        } else {
            hunk.src_lines = take_block(&mut lines, '<', src_from, src_to, header)?;
        }

        if op == DiffOp::Change {
            match lines.next() {
                Some("---") => {}
                other => {
                    return Err(Error::Parse(format!(
                        "missing '---' separator after '{header}', found {other:?}"
                    )));
                }
            }
        }

        if op == DiffOp::Delete {
            hunk.anchor = dst_from;
        } else {
            hunk.dst_lines = take_block(&mut lines, '>', dst_from, dst_to, header)?;
        }

        hunks.push(hunk);
    }

    Ok(hunks)
}

fn range(caps: &regex::Captures, from: usize, to: usize) -> Result<(usize, usize)> {
    let number = |i: usize| -> Result<Option<usize>> {
        caps.get(i)
            .map(|m| {
                m.as_str()
                    .parse::<usize>()
                    .map_err(|e| Error::Parse(format!("bad line number '{}': {e}", m.as_str())))
            })
            .transpose()
    };
    let start = number(from)?.unwrap_or(0);
    let end = number(to)?.unwrap_or(start);
    if end < start {
        return Err(Error::Parse(format!("inverted line range {start},{end}")));
    }
    Ok((start, end))
}

/// Read `to - from + 1` lines prefixed with `marker`.
fn take_block<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    marker: char,
    from: usize,
    to: usize,
    header: &str,
) -> Result<Vec<LineText>> {
    let mut block = Vec::with_capacity(to - from + 1);
    for number in from..=to {
        let line = lines.next().ok_or_else(|| {
            Error::Parse(format!("diff block for '{header}' ended early at line {number}"))
        })?;
        let text = line
            .strip_prefix(marker)
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
            .ok_or_else(|| {
                Error::Parse(format!("expected '{marker}' line for '{header}', got '{line}'"))
            })?;
        block.push(LineText {
            number,
            text: text.to_string(),
        });
    }
    Ok(block)
}

/// Render hunks back to normal-form diff text.
pub fn format(hunks: &[Hunk]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        let src = match hunk.op {
            DiffOp::Add => hunk.anchor.to_string(),
            _ => format_range(&hunk.src_lines),
        };
        let dst = match hunk.op {
            DiffOp::Delete => hunk.anchor.to_string(),
            _ => format_range(&hunk.dst_lines),
        };
        let _ = writeln!(out, "{src}{}{dst}", hunk.op.letter());
        for line in &hunk.src_lines {
            let _ = writeln!(out, "< {}", line.text);
        }
        if hunk.op == DiffOp::Change {
            out.push_str("---\n");
        }
        for line in &hunk.dst_lines {
            let _ = writeln!(out, "> {}", line.text);
        }
    }
    out
}

fn format_range(lines: &[LineText]) -> String {
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) if first.number != last.number => {
            format!("{},{}", first.number, last.number)
        }
        (Some(first), _) => first.number.to_string(),
        _ => "0".to_string(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
