use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone};

use crate::error::{Error, Result};

/// Parse a human date relative to `now`.
///
/// Accepts `now` (or an empty string), relative offsets such as
/// `30 days ago`, `2weeks` or `1 month ago`, RFC 3339 timestamps and plain
/// `YYYY-MM-DD` dates (midnight in the offset of `now`).
pub fn parse_when(text: &str, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date);
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| now.offset().from_local_datetime(&midnight).single())
            .ok_or_else(|| Error::InvalidArgument(format!("invalid date '{text}'")));
    }
    let offset = parse_period(text)?;
    now.checked_sub_signed(offset)
        .ok_or_else(|| Error::InvalidArgument(format!("date out of range: '{text}'")))
}

/// `text`, or `default` when it is blank.
pub fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.trim().is_empty() { default } else { text }
}

/// Parse a period such as `30 days`, `1 month` or `7d`. A trailing `ago`
/// is ignored so `--period "30 days ago"` works too.
pub fn parse_period(text: &str) -> Result<Duration> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix("ago").unwrap_or(trimmed);
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let parsed = humantime::parse_duration(&compact)
        .map_err(|e| Error::InvalidArgument(format!("invalid duration '{text}': {e}")))?;
    Duration::from_std(parsed)
        .map_err(|_| Error::InvalidArgument(format!("duration too large: '{text}'")))
}

/// Current time with the local offset.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// `" (N%)"` of `value` over `total`, or nothing when `total` is zero.
pub fn perc_str(value: i64, total: i64) -> String {
    if total == 0 {
        return String::new();
    }
    format!(" ({}%)", (100.0 * value as f64 / total as f64) as i64)
}

/// `" (+N)"`/`" (-N)"` change from `prev` to `cur`; blank padding when
/// there is no previous value to compare with.
pub fn diff_str(cur: i64, prev: i64) -> String {
    if prev == 0 {
        return " ".repeat(7);
    }
    let diff = cur - prev;
    if diff > 0 {
        format!(" (+{diff})")
    } else {
        format!(" ({diff})")
    }
}

/// `" (+N%)"` relative change from `prev` to `cur`; blank padding when
/// `prev` is zero.
pub fn diff_perc_str(cur: i64, prev: i64) -> String {
    if prev == 0 {
        return " ".repeat(7);
    }
    let diff = cur - prev;
    let perc = (100.0 * diff as f64 / prev as f64) as i64;
    if diff > 0 {
        format!(" (+{perc}%)")
    } else {
        format!(" ({perc}%)")
    }
}

/// Join `items` with `sep`, eliding everything after `limit` entries.
pub fn join_with_limit(items: &[String], sep: &str, limit: usize) -> String {
    let mut joined = items
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(sep);
    if items.len() > limit {
        joined.push_str(&format!("{sep}..."));
    }
    joined
}

#[cfg(test)]
#[path = "util_test.rs"]
mod tests;
