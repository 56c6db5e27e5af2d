//! Command Execution Module
//!
//! This module sits between the protocol and the store. It receives decoded
//! commands and applies them to the storage engine.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandExecutor │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  MetricStore    │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `put <key> <value> <timestamp>` - Record a sample
//! - `get <key>` - Read one series, or every series with `*`

pub mod handler;

pub use handler::CommandExecutor;
