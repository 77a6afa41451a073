//! Wrapper Core - safety wrappers around black-box text generators.
//!
//! A wrapper sits between a user prompt and a model. For every raw output
//! it asks a pluggable policy whether to allow it, block it, modify it or
//! query the model again, and keeps an auditable trace of each run.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod storage;
