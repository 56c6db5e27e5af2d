//! Command Executor
//!
//! Applies decoded commands to the shared [`MetricStore`]. There is no logic
//! here beyond dispatch: `put` goes to [`MetricStore::put`], `get` goes to
//! [`MetricStore::get`], and the store's answer is handed back unchanged.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CommandExecutor                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ run_batch() │───>│    run()    │───>│ MetricStore │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, CommandResult};
use crate::storage::MetricStore;
use std::sync::Arc;
use tracing::trace;

/// Executes commands against a shared store.
///
/// Cloning is cheap; every connection gets its own clone pointing at the same
/// store.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    store: Arc<MetricStore>,
}

impl CommandExecutor {
    /// Creates an executor over the given store.
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self { store }
    }

    /// Returns the store this executor writes to.
    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    /// Executes a single command.
    pub fn run(&self, command: Command) -> CommandResult {
        trace!(command = command.name(), "Executing command");

        match command {
            Command::Put {
                key,
                value,
                timestamp,
            } => {
                self.store.put(&key, value, timestamp);
                CommandResult::Stored
            }
            Command::Get { key } => CommandResult::Series(self.store.get(&key)),
        }
    }

    /// Executes a batch in order, returning one result per command.
    pub fn run_batch(&self, commands: Vec<Command>) -> Vec<CommandResult> {
        commands.into_iter().map(|command| self.run(command)).collect()
    }
}
