//! Splits the text printed by `condor_q -pr usage.cpf` into raw per-job records.
//!
//! Each job line looks like
//!
//! ```text
//! 6382.004 3/14 09:26 0+01:02:03 R  2.0 GB  1.3 GB 10.0 GB  7.5 GB hypro.sh siteA 2024-01-01 42
//! ```
//!
//! The first and last non-empty lines of the report (column header & summary footer) are dropped
//! unconditionally, every other line has to match the grammar or the whole parse fails.

use std::fmt;

use itertools::Itertools as _;
use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

use crate::misc::parsing::runtime::RuntimeParseError;
use crate::misc::parsing::{is_decimal, is_digit_pair, is_digits, Cursor, Runtime};

/// One job line, split into its fields. Nothing is interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawJobRecord {
    pub job_id: String,
    pub submitted: String,
    pub runtime: String,
    pub status: String,
    pub memory_request: String,
    pub memory_usage: String,
    pub disk_request: String,
    pub disk_usage: String,
    pub command: String,
}

impl RawJobRecord {
    pub const COLUMNS: [&'static str; 9] = [
        "job_id",
        "submitted",
        "runtime",
        "status",
        "memory_request",
        "memory_usage",
        "disk_request",
        "disk_usage",
        "command",
    ];

    /// Field values in [`RawJobRecord::COLUMNS`] order.
    pub fn fields(&self) -> [&str; 9] {
        [
            &self.job_id,
            &self.submitted,
            &self.runtime,
            &self.status,
            &self.memory_request,
            &self.memory_usage,
            &self.disk_request,
            &self.disk_usage,
            &self.command,
        ]
    }

    pub fn runtime_duration(&self) -> Result<Runtime, RuntimeParseError> {
        Runtime::try_from(self.runtime.as_str())
    }
}

/// Positions in the line grammar, in the order they are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    JobId,
    Submitted,
    Runtime,
    Status,
    MemoryRequest,
    MemoryUsage,
    DiskRequest,
    DiskUsage,
    Command,
}

impl Field {
    pub fn name(self) -> &'static str {
        RawJobRecord::COLUMNS[self as usize]
    }

    pub fn expected(self) -> &'static str {
        match self {
            Field::JobId => "a decimal like `6382.004`",
            Field::Submitted => "a date and time like `3/14 09:26`",
            Field::Runtime => "a runtime like `0+01:02:03`",
            Field::Status => "a single uppercase status letter",
            Field::MemoryRequest | Field::MemoryUsage | Field::DiskRequest | Field::DiskUsage => {
                "a decimal and an uppercase unit like `512.0 MB`"
            }
            Field::Command => "whitespace followed by the command",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusParseError {
    /// `line_number` counts non-empty lines, starting at 1 with the header.
    #[error(
        "line {line_number}: expected {} for `{field}`, found `{found}` (line: `{line}`)",
        .field.expected()
    )]
    GrammarMismatch {
        line_number: usize,
        line: String,
        field: Field,
        found: String,
    },
}

fn is_runtime(token: &str) -> bool {
    matches!(token.split_once('+'), Some((days, clock))
        if is_digits(days) && clock.split(':').count() == 3 && clock.split(':').all(is_digits))
}

fn is_status(token: &str) -> bool {
    token.len() == 1 && token.bytes().all(|b| b.is_ascii_uppercase())
}

fn is_unit(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase())
}

/// Matches the next field. On failure returns the field and whatever token sits in its place.
fn next<'a>(
    cursor: &mut Cursor<'a>,
    field: Field,
    matcher: impl FnOnce(&mut Cursor<'a>) -> Option<&'a str>,
) -> Result<String, (Field, String)> {
    // every field but the first needs at least one whitespace in front of it
    if field != Field::JobId && cursor.skip_whitespace() == 0 {
        return Err((field, cursor.peek().to_owned()));
    }
    matcher(cursor)
        .map(str::to_owned)
        .ok_or_else(|| (field, cursor.peek().to_owned()))
}

fn resource<'a>(cursor: &mut Cursor<'a>) -> Option<&'a str> {
    cursor.token_pair(is_decimal, is_unit)
}

fn parse_line(line: &str) -> Result<RawJobRecord, (Field, String)> {
    let mut cursor = Cursor::new(line);
    cursor.skip_whitespace();

    Ok(RawJobRecord {
        job_id: next(&mut cursor, Field::JobId, |c| c.token(is_decimal))?,
        submitted: next(&mut cursor, Field::Submitted, |c| {
            c.token_pair(|t| is_digit_pair(t, '/'), |t| is_digit_pair(t, ':'))
        })?,
        runtime: next(&mut cursor, Field::Runtime, |c| c.token(is_runtime))?,
        status: next(&mut cursor, Field::Status, |c| c.token(is_status))?,
        memory_request: next(&mut cursor, Field::MemoryRequest, resource)?,
        memory_usage: next(&mut cursor, Field::MemoryUsage, resource)?,
        disk_request: next(&mut cursor, Field::DiskRequest, resource)?,
        disk_usage: next(&mut cursor, Field::DiskUsage, resource)?,
        command: next(&mut cursor, Field::Command, |c| Some(c.remainder()))?,
    })
}

/// Parses a whole status report. Header and footer are skipped, blank lines are ignored.
///
/// Fails on the first line that does not match; no partial result is returned.
pub fn parse_status(report: &str) -> Result<Vec<RawJobRecord>, StatusParseError> {
    let lines = report.lines().filter(|line| !line.trim().is_empty()).collect_vec();
    let body = match lines.as_slice() {
        [_header, body @ .., _footer] => body,
        _ => &[],
    };
    debug!("status report: {} non-empty lines, {} job lines", lines.len(), body.len());

    body.iter()
        .enumerate()
        .map(|(i, line)| {
            // +1 for the header, +1 for 1-based counting
            let line_number = i + 2;
            trace!("status line {line_number}: {line}");
            parse_line(line).map_err(|(field, found)| StatusParseError::GrammarMismatch {
                line_number,
                line: (*line).to_owned(),
                field,
                found,
            })
        })
        .collect()
}
