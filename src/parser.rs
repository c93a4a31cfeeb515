//! Decoding of the delimited text blobs embedded in HNAP responses
//!
//! The modem packs tables into single JSON strings instead of arrays:
//! `^` closes a field, `|+|` separates rows and `}-{` separates log entries.
//! A log entry additionally breaks its timestamp onto its own line, so a
//! newline directly followed by `^` is a continuation, not a new entry.

use crate::error::{ModemError, Result};
use crate::models::LogEntry;
use regex::Regex;
use std::sync::OnceLock;

const ROW_SEPARATOR: &str = "|+|";
const FIELD_MARKER: char = '^';
const LOG_ENTRY_SEPARATOR: &str = "}-{";
const LOG_CONTINUATION: &str = "\n^";
const LOG_ENTRY_PATTERN: &str =
    r"^(\d{1,2}:\d{2}:\d{2})\s+(\w{3}\s+\w{3}\s+\d{1,2}\s+\d{4})\s+(\S+(?:\s+\(\d+\))?)\s*(.*)$";

static LOG_ENTRY: OnceLock<Option<Regex>> = OnceLock::new();

fn log_entry_regex() -> Option<&'static Regex> {
    LOG_ENTRY
        .get_or_init(|| Regex::new(LOG_ENTRY_PATTERN).ok())
        .as_ref()
}

/// Decode a channel table blob into rows of trimmed columns.
///
/// An empty blob yields no rows. A `^` right before a row separator (or at
/// the very end) closes the row without adding an empty trailing column.
/// Rows of differing width are rejected as a malformed payload.
pub fn decode_table(raw: &str) -> Result<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix(ROW_SEPARATOR) {
            close_row(&mut rows, &mut row, &mut field);
            rest = tail;
            continue;
        }

        if c == FIELD_MARKER {
            row.push(field.trim().to_string());
            field.clear();
        } else {
            field.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    close_row(&mut rows, &mut row, &mut field);

    if let Some(width) = rows.first().map(Vec::len) {
        if let Some((index, bad)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ModemError::MalformedPayload(format!(
                "row {} has {} columns, expected {}",
                index + 1,
                bad.len(),
                width
            )));
        }
    }

    Ok(rows)
}

fn close_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    let last = field.trim();
    if !last.is_empty() {
        row.push(last.to_string());
    }
    field.clear();

    // whitespace between separators is not a row
    if !row.is_empty() {
        rows.push(std::mem::take(row));
    }
}

/// Inverse of [`decode_table`], in the layout the firmware emits
#[cfg(test)]
pub(crate) fn encode_table(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|field| format!("{}{}", field, FIELD_MARKER))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR)
}

/// Flatten a raw log blob into plain text, one entry per line
pub fn normalize_log_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix(LOG_CONTINUATION) {
            out.push(' ');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix(LOG_ENTRY_SEPARATOR) {
            out.push('\n');
            rest = tail;
        } else {
            out.push(if c == FIELD_MARKER { ' ' } else { c });
            rest = &rest[c.len_utf8()..];
        }
    }

    out
}

/// Split a raw log blob into its non-empty, normalized lines
pub fn decode_log_lines(raw: &str) -> Vec<String> {
    normalize_log_text(raw)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a normalized log line into its timestamp, priority and message.
///
/// Lines that do not start with a recognizable timestamp are kept whole as
/// the message.
pub fn parse_log_entry(line: &str) -> LogEntry {
    fn split(line: &str) -> Option<LogEntry> {
        let caps = log_entry_regex()?.captures(line.trim())?;
        Some(LogEntry {
            time: caps.get(1).map(|m| m.as_str().to_string()),
            date: caps.get(2).map(|m| m.as_str().to_string()),
            priority: caps.get(3).map(|m| m.as_str().to_string()),
            message: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }

    split(line).unwrap_or_else(|| LogEntry {
        time: None,
        date: None,
        priority: None,
        message: line.trim().to_string(),
    })
}
