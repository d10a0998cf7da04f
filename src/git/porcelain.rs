//! Parsers for the textual output of the git plumbing commands used by
//! [`super::Git`]. Each parser takes raw stdout and returns typed records.

use chrono::{DateTime, FixedOffset};

use super::{BlameLine, CommitInfo};
use crate::error::{Error, Result};

/// Separator placed between fields by the `--format` strings we pass to git.
pub const FIELD_SEP: &str = "---";

/// Split stdout into non-empty lines.
pub fn parse_lines(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `rev-list --format=%H---%cI---%cN---%cE` output.
/// rev-list prefixes every record with a `commit <id>` line, which is skipped.
pub fn parse_rev_list(out: &str) -> Result<Vec<CommitInfo>> {
    let mut commits = Vec::new();
    for line in out.lines() {
        if line.is_empty() || line.starts_with("commit ") {
            continue;
        }
        let fields: Vec<&str> = line.splitn(4, FIELD_SEP).collect();
        let [id, date, name, email] = fields[..] else {
            return Err(Error::Parse(format!("unexpected rev-list line: {line}")));
        };
        commits.push(CommitInfo {
            id: id.to_string(),
            author_name: name.to_string(),
            author_email: email.to_string(),
            date: parse_iso_date(date)?,
        });
    }
    Ok(commits)
}

/// Parse `show -s --format=%aN###<%aE>---%aI` output for commit `id`.
pub fn parse_commit_info(id: &str, out: &str) -> Result<CommitInfo> {
    let line = out.trim();
    let malformed = || Error::Parse(format!("unexpected commit info for {id}: {line}"));
    let (who, date) = line.rsplit_once(FIELD_SEP).ok_or_else(malformed)?;
    let (name, email) = who.split_once("###").ok_or_else(malformed)?;
    Ok(CommitInfo {
        id: id.to_string(),
        author_name: name.to_string(),
        author_email: strip_angles(email).to_string(),
        date: parse_iso_date(date)?,
    })
}

#[derive(Default)]
struct PendingBlame {
    commit_id: String,
    author_name: Option<String>,
    author_email: Option<String>,
    author_time: Option<i64>,
    author_tz: Option<String>,
}

/// Parse `blame --line-porcelain` output into one record per file line.
///
/// A record starts with a header line whose first token is a commit id and
/// ends with the tab-prefixed content line.
pub fn parse_blame(out: &str) -> Result<Vec<BlameLine>> {
    let mut lines = Vec::new();
    let mut pending: Option<PendingBlame> = None;

    for raw in out.split('\n') {
        if let Some(text) = raw.strip_prefix('\t') {
            let record = pending
                .take()
                .ok_or_else(|| Error::Parse("blame content line without header".to_string()))?;
            lines.push(finish_blame(record, text)?);
            continue;
        }

        if let Some(name) = raw.strip_prefix("author ") {
            if let Some(p) = pending.as_mut() {
                p.author_name = Some(name.to_string());
            }
        } else if let Some(mail) = raw.strip_prefix("author-mail ") {
            if let Some(p) = pending.as_mut() {
                p.author_email = Some(strip_angles(mail).to_string());
            }
        } else if let Some(time) = raw.strip_prefix("author-time ") {
            if let Some(p) = pending.as_mut() {
                let secs = time
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| Error::Parse(format!("bad author-time '{time}': {e}")))?;
                p.author_time = Some(secs);
            }
        } else if let Some(tz) = raw.strip_prefix("author-tz ") {
            if let Some(p) = pending.as_mut() {
                p.author_tz = Some(tz.trim().to_string());
            }
        } else if let Some(id) = record_start(raw) {
            pending = Some(PendingBlame {
                commit_id: id.to_string(),
                ..Default::default()
            });
        }
    }

    Ok(lines)
}

fn record_start(line: &str) -> Option<&str> {
    let mut tokens = line.split(' ');
    let id = tokens.next()?;
    let is_id = (id.len() == 40 || id.len() == 64) && id.bytes().all(|b| b.is_ascii_hexdigit());
    // "<id> <orig-line> <final-line> [<group-size>]"
    (is_id && tokens.count() >= 2).then_some(id)
}

fn finish_blame(record: PendingBlame, text: &str) -> Result<BlameLine> {
    let missing = |field: &str| {
        Error::Parse(format!(
            "blame record for {} is missing '{field}'",
            record.commit_id
        ))
    };
    let author_name = record.author_name.clone().ok_or_else(|| missing("author"))?;
    let author_email = record
        .author_email
        .clone()
        .ok_or_else(|| missing("author-mail"))?;
    let secs = record.author_time.ok_or_else(|| missing("author-time"))?;
    let tz = record.author_tz.as_deref().unwrap_or("+0000");
    Ok(BlameLine {
        author_date: epoch_with_tz(secs, tz)?,
        commit_id: record.commit_id,
        author_name,
        author_email,
        text: text.to_string(),
    })
}

/// Size in bytes from `ls-tree -r --long COMMIT PATH` (fourth column).
pub fn parse_tree_size(path: &str, out: &str) -> Result<u64> {
    let line = out
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::Parse(format!("'{path}' not present in tree")))?;
    let size = line
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| Error::Parse(format!("unexpected ls-tree line: {line}")))?;
    size.parse::<u64>()
        .map_err(|e| Error::Parse(format!("bad size '{size}' for {path}: {e}")))
}

/// `diff --numstat` prints `-\t-\t<path>` for binary content.
pub fn numstat_is_binary(out: &str) -> bool {
    out.lines().any(|l| l.starts_with("-\t-"))
}

/// Second token of `rev-list --parents -n 1` output, if any.
pub fn parse_parent(out: &str) -> Option<String> {
    out.split_whitespace().nth(1).map(String::from)
}

pub fn parse_iso_date(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| Error::Parse(format!("bad date '{value}': {e}")))
}

fn epoch_with_tz(secs: i64, tz: &str) -> Result<DateTime<FixedOffset>> {
    let offset = parse_tz(tz)?;
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| Error::Parse(format!("timestamp out of range: {secs}")))
}

/// Parse a `+HHMM` / `-HHMM` zone.
fn parse_tz(tz: &str) -> Result<FixedOffset> {
    let bad = || Error::Parse(format!("bad timezone '{tz}'"));
    if tz.len() != 5 || !tz.is_ascii() {
        return Err(bad());
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(bad()),
    };
    let hours: i32 = tz[1..3].parse().map_err(|_| bad())?;
    let minutes: i32 = tz[3..5].parse().map_err(|_| bad())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

fn strip_angles(value: &str) -> &str {
    value.trim().trim_start_matches('<').trim_end_matches('>')
}

#[cfg(test)]
#[path = "porcelain_test.rs"]
mod tests;
