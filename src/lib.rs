//! Interview orchestrator: a multi-agent user-profiling interview.

pub mod config;
pub mod error;
pub mod interview;
