//! Tool framework for research agents
//!
//! Tools are named async functions over JSON that a reasoning engine may
//! call while working on a task.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, require_str};
