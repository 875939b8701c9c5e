//! Shared utilities for the research workspace

pub mod logging;

pub use logging::{LogFormat, init_tracing};
