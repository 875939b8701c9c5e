//! Core abstractions for the equity research pipeline
//!
//! This crate defines the task description handed to reasoning engines and
//! the error type shared by tools and engines.

pub mod error;
pub mod task;

pub use error::{Error, Result};
pub use task::{AgentTask, AgentTaskBuilder, OutputSchema, Persona};
