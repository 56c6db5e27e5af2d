//! Protocol Data Types
//!
//! This module defines the values that cross the wire: decoded request
//! commands, per-command results, and the response that is serialized back to
//! the client.
//!
//! ## Protocol Format
//!
//! Requests are newline-terminated text lines:
//!
//! ```text
//! put <key> <value> <timestamp>\n
//! get <key>\n
//! ```
//!
//! Responses start with a status line and always end with a blank line:
//!
//! ```text
//! ok\n
//! <key> <value> <timestamp>\n     (zero or more)
//! \n
//!
//! error\n
//! <message>\n
//! \n
//! ```

use crate::storage::SeriesSet;
use std::fmt;

/// Line terminator for requests and responses
pub const NEWLINE: u8 = b'\n';

/// Byte sequence that ends every response
pub const RESPONSE_TERMINATOR: &[u8] = b"\n\n";

/// Protocol keywords
pub mod keyword {
    pub const PUT: &str = "put";
    pub const GET: &str = "get";
    pub const OK: &str = "ok";
    pub const ERROR: &str = "error";
}

/// A request decoded from one line of client input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Record `value` for `key` at `timestamp`.
    /// Format: `put <key> <value> <timestamp>`
    Put {
        key: String,
        value: f64,
        timestamp: i64,
    },

    /// Read the series for `key`; `*` selects every key.
    /// Format: `get <key>`
    Get { key: String },
}

impl Command {
    pub fn put(key: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Command::Put {
            key: key.into(),
            value,
            timestamp,
        }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Command::Get { key: key.into() }
    }

    /// Returns the protocol keyword for this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Put { .. } => keyword::PUT,
            Command::Get { .. } => keyword::GET,
        }
    }

    /// Serializes the command as a request line, including the trailing newline.
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = self.to_string();
        line.push('\n');
        line.into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Put {
                key,
                value,
                timestamp,
            } => write!(f, "{} {} {} {}", keyword::PUT, key, FloatRepr(*value), timestamp),
            Command::Get { key } => write!(f, "{} {}", keyword::GET, key),
        }
    }
}

/// The outcome of executing one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// A `put` was applied. Contributes no response lines.
    Stored,

    /// The series matched by a `get`.
    Series(SeriesSet),
}

/// A complete response to one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The whole batch was executed; one result per command, in order.
    Ok(Vec<CommandResult>),

    /// The batch was rejected. The message must be a single line.
    Error(String),
}

impl Response {
    pub fn ok(results: Vec<CommandResult>) -> Self {
        Response::Ok(results)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }

    /// Serializes the response to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        use std::io::Write;

        match self {
            Response::Ok(results) => {
                buf.extend_from_slice(keyword::OK.as_bytes());
                buf.push(NEWLINE);
                for set in results.iter().filter_map(|r| match r {
                    CommandResult::Series(set) => Some(set),
                    CommandResult::Stored => None,
                }) {
                    for (key, samples) in set {
                        for sample in samples {
                            // Writing into a Vec cannot fail.
                            let _ = writeln!(
                                buf,
                                "{} {} {}",
                                key,
                                FloatRepr(sample.value),
                                sample.timestamp
                            );
                        }
                    }
                }
            }
            Response::Error(message) => {
                buf.extend_from_slice(keyword::ERROR.as_bytes());
                buf.push(NEWLINE);
                buf.extend_from_slice(message.as_bytes());
                buf.push(NEWLINE);
            }
        }
        buf.push(NEWLINE);
    }
}

/// Encodes the results of a batch as an `ok` response.
pub fn encode(results: &[CommandResult]) -> Vec<u8> {
    Response::Ok(results.to_vec()).serialize()
}

/// Encodes an `error` response carrying `message`.
pub fn encode_error(message: &str) -> Vec<u8> {
    Response::error(message).serialize()
}

/// Renders a float so it reads back to the same value and integral values
/// keep a fractional part (`1.0`, not `1`).
struct FloatRepr(f64);

impl fmt::Display for FloatRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
