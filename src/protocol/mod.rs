//! Line Protocol Implementation
//!
//! This module implements the text protocol tickstore speaks over TCP. It is
//! pure: nothing here performs I/O or holds state.
//!
//! ## Modules
//!
//! - `types`: `Command`, `CommandResult` and `Response`, plus response encoding
//! - `parser`: request decoding and client-side response decoding
//!
//! ## Example
//!
//! ```
//! use tickstore::protocol::{decode, encode, CommandResult};
//!
//! let batch = decode("put load 0.25 1\n").unwrap();
//! assert_eq!(batch.len(), 1);
//!
//! let bytes = encode(&[CommandResult::Stored]);
//! assert_eq!(bytes, b"ok\n\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{decode, decode_response, ParseResult, ProtocolError};
pub use types::{encode, encode_error, Command, CommandResult, Response, RESPONSE_TERMINATOR};
