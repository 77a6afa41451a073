//! Storage layer for append-only logs.

mod audit_log;
mod history_log;

pub use audit_log::*;
pub use history_log::{HistoryLog, JsonlHistoryLog, MemoryHistoryLog};
