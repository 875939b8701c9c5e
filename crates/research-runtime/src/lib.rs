//! Reasoning engines for research tasks
//!
//! [`ReasoningEngine`] is the seam between the analysis pipeline and whatever
//! produces the answer text. [`ToolAgentEngine`] is the production engine: it
//! drives an [`AgentExecutor`] loop against an LLM provider, letting the model
//! call registered tools until it returns a final answer.

pub mod engine;
pub mod executor;

pub use engine::{ReasoningEngine, ToolAgentEngine};
pub use executor::{AgentExecutor, Execution, ExecutorConfig};
