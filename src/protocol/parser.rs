//! Line Protocol Parser
//!
//! This module turns a complete message into a batch of [`Command`]s, and a
//! complete response back into a [`Response`] for the client side.
//!
//! ## How Decoding Works
//!
//! The input is split on `\n`. Zero-length lines are skipped, every other line
//! is trimmed and split on whitespace:
//!
//! - `put <key> <value> <timestamp>` needs exactly three arguments, a float
//!   value and an integer timestamp
//! - `get <key>` needs exactly one argument
//!
//! Decoding is all-or-nothing. The first bad line fails the whole batch and
//! no commands are returned, so a rejected message never touches the store.
//!
//! Deciding *when* a message is complete is the connection handler's job; the
//! parser only ever sees whole messages.

use crate::protocol::types::{keyword, Command, CommandResult, Response};
use crate::storage::{Sample, SeriesSet};
use thiserror::Error;

/// Errors produced while decoding protocol text.
///
/// Every variant renders as a single line, since it is sent back verbatim as
/// the body of an `error` response.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A line containing only whitespace
    #[error("empty command on line {line}")]
    EmptyCommand { line: usize },

    /// The first token is not a known command
    #[error("unknown command '{name}' on line {line}")]
    UnknownCommand { name: String, line: usize },

    /// Too many or too few arguments for the command
    #[error("wrong number of arguments for '{command}' on line {line}: expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
        line: usize,
    },

    /// The value of a `put` is not a floating point number
    #[error("invalid value '{value}' on line {line}")]
    InvalidValue { value: String, line: usize },

    /// The timestamp of a `put` is not an integer
    #[error("invalid timestamp '{timestamp}' on line {line}")]
    InvalidTimestamp { timestamp: String, line: usize },

    /// A server response that does not follow the response format
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ProtocolError>;

/// Decodes a message into its batch of commands.
///
/// Line numbers in errors are 1-based and count every line, including skipped
/// empty ones.
///
/// # Example
///
/// ```
/// use tickstore::protocol::{decode, Command};
///
/// let batch = decode("put cpu 0.5 100\nget cpu\n").unwrap();
/// assert_eq!(batch, vec![Command::put("cpu", 0.5, 100), Command::get("cpu")]);
///
/// assert!(decode("put cpu high 100\nget cpu\n").is_err());
/// ```
pub fn decode(text: &str) -> ParseResult<Vec<Command>> {
    text.split('\n')
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(index, line)| decode_line(line, index + 1))
        .collect()
}

fn decode_line(line: &str, line_no: usize) -> ParseResult<Command> {
    let mut tokens = line.split_whitespace();

    let name = tokens
        .next()
        .ok_or(ProtocolError::EmptyCommand { line: line_no })?;
    let args: Vec<&str> = tokens.collect();

    match name {
        keyword::PUT => {
            let [key, value, timestamp] = expect_args::<3>(keyword::PUT, &args, line_no)?;

            let value: f64 = value.parse().map_err(|_| ProtocolError::InvalidValue {
                value: value.to_string(),
                line: line_no,
            })?;
            let timestamp: i64 =
                timestamp
                    .parse()
                    .map_err(|_| ProtocolError::InvalidTimestamp {
                        timestamp: timestamp.to_string(),
                        line: line_no,
                    })?;

            Ok(Command::put(key, value, timestamp))
        }
        keyword::GET => {
            let [key] = expect_args::<1>(keyword::GET, &args, line_no)?;
            Ok(Command::get(key))
        }
        other => Err(ProtocolError::UnknownCommand {
            name: other.to_string(),
            line: line_no,
        }),
    }
}

fn expect_args<'a, const N: usize>(
    command: &'static str,
    args: &[&'a str],
    line_no: usize,
) -> ParseResult<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| ProtocolError::WrongArity {
        command,
        expected: N,
        got: args.len(),
        line: line_no,
    })
}

/// Decodes a complete response (including its blank-line terminator).
///
/// All sample rows of an `ok` response are gathered into a single
/// [`CommandResult::Series`]. An `ok` response without rows decodes to an
/// empty result list.
pub fn decode_response(text: &str) -> ParseResult<Response> {
    let (status, body) = text
        .split_once('\n')
        .ok_or_else(|| ProtocolError::MalformedResponse("missing status line".to_string()))?;

    match status {
        keyword::OK => {
            let mut set = SeriesSet::new();
            for row in body.lines().filter(|row| !row.trim().is_empty()) {
                let (key, sample) = decode_row(row)?;
                set.entry(key.to_string()).or_default().push(sample);
            }

            if set.is_empty() {
                Ok(Response::Ok(Vec::new()))
            } else {
                Ok(Response::Ok(vec![CommandResult::Series(set)]))
            }
        }
        keyword::ERROR => {
            let message = body.lines().next().unwrap_or_default();
            Ok(Response::Error(message.to_string()))
        }
        other => Err(ProtocolError::MalformedResponse(format!(
            "unknown status '{}'",
            other
        ))),
    }
}

fn decode_row(row: &str) -> ParseResult<(&str, Sample)> {
    let malformed = || ProtocolError::MalformedResponse(format!("bad row '{}'", row));

    let parts: Vec<&str> = row.split_whitespace().collect();
    let [key, value, timestamp] = <[&str; 3]>::try_from(parts.as_slice()).map_err(|_| malformed())?;

    let value: f64 = value.parse().map_err(|_| malformed())?;
    let timestamp: i64 = timestamp.parse().map_err(|_| malformed())?;

    Ok((key, Sample::new(timestamp, value)))
}
