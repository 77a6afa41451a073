//! Wrapper engine.
//!
//! This module contains the decision pipeline:
//! - Policies: judge each raw model output (no-op, keyword filter,
//!   history-aware, query budget, redact)
//! - Generators: the black-box model adapters
//! - Runner: the requery loop and record keeping for one prompt
//! - Pipeline: a configured session, plus the batch driver on top of it

mod batch;
mod budget;
mod generator;
mod history;
mod keyword;
mod noop;
mod openrouter;
mod pipeline;
mod policy;
mod runner;

pub use batch::*;
pub use budget::*;
pub use generator::*;
pub use history::*;
pub use keyword::*;
pub use noop::*;
pub use openrouter::*;
pub use pipeline::*;
pub use policy::*;
pub use runner::*;
