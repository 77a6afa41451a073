//! Domain types for the wrapper pipeline.
//!
//! This module contains the value objects shared by the engine, storage
//! and API layers.

mod batch;
mod history;
mod run;
mod verdict;

pub use batch::*;
pub use history::*;
pub use run::*;
pub use verdict::*;
