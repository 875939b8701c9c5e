//! Task descriptions handed to a reasoning engine
//!
//! An [`AgentTask`] carries everything an engine needs to produce one
//! structured answer: the persona it should adopt, what it has to do, the
//! JSON Schema its final answer must satisfy, and read-only context gathered
//! by earlier work.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role, goal and backstory of the agent working on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Short role name (e.g. "Technical Analyst")
    pub role: String,
    /// What the agent is trying to achieve
    pub goal: String,
    /// Background that shapes the agent's voice
    pub backstory: String,
}

impl Persona {
    /// Create a persona
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }
}

/// Output contract of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, forwarded to providers that support structured output
    pub name: String,
    /// JSON Schema the final answer must conform to
    pub schema: Value,
}

/// A single unit of delegated reasoning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Identifier used in logs (e.g. "technical")
    pub name: String,
    /// Persona the engine should adopt
    pub persona: Persona,
    /// Subject of the task, usually a ticker symbol
    pub subject: String,
    /// Natural-language description of the work
    pub description: String,
    /// Description of the expected answer
    pub expected_output: String,
    /// Structured output contract, if any
    pub output_schema: Option<OutputSchema>,
    /// Read-only context from upstream work
    pub context: Value,
}

impl AgentTask {
    /// Start building a task
    pub fn builder(name: impl Into<String>, persona: Persona) -> AgentTaskBuilder {
        AgentTaskBuilder::new(name, persona)
    }

    /// System prompt derived from the persona and the output contract
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are a {}.\n\nGoal: {}\n\nBackground: {}\n",
            self.persona.role, self.persona.goal, self.persona.backstory
        );

        if let Some(schema) = &self.output_schema {
            prompt.push_str(
                "\nYour final answer must be a single JSON document and nothing else. \
                 It must match this JSON Schema exactly (field names, types and allowed values):\n",
            );
            prompt.push_str(&schema.schema.to_string());
            prompt.push('\n');
        }

        prompt
    }

    /// User prompt carrying the task description and upstream context
    pub fn user_prompt(&self) -> String {
        let mut prompt = format!(
            "Subject: {}\n\nTask:\n{}\n\nExpected output:\n{}\n",
            self.subject, self.description, self.expected_output
        );

        if !self.context.is_null() {
            prompt.push_str("\nReference data (JSON):\n");
            prompt.push_str(
                &serde_json::to_string_pretty(&self.context)
                    .unwrap_or_else(|_| self.context.to_string()),
            );
            prompt.push('\n');
        }

        prompt
    }
}

/// Builder for [`AgentTask`]
#[derive(Debug)]
pub struct AgentTaskBuilder {
    name: String,
    persona: Persona,
    subject: String,
    description: String,
    expected_output: String,
    output_schema: Option<OutputSchema>,
    context: Value,
}

impl AgentTaskBuilder {
    /// Create a builder with an empty description and no context
    pub fn new(name: impl Into<String>, persona: Persona) -> Self {
        Self {
            name: name.into(),
            persona,
            subject: String::new(),
            description: String::new(),
            expected_output: String::new(),
            output_schema: None,
            context: Value::Null,
        }
    }

    /// Set the subject (ticker symbol)
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the task description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected output description
    pub fn expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = expected.into();
        self
    }

    /// Require the final answer to match a JSON Schema
    pub fn output_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.output_schema = Some(OutputSchema {
            name: name.into(),
            schema,
        });
        self
    }

    /// Attach upstream context
    pub fn context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Build the task
    pub fn build(self) -> AgentTask {
        AgentTask {
            name: self.name,
            persona: self.persona,
            subject: self.subject,
            description: self.description,
            expected_output: self.expected_output,
            output_schema: self.output_schema,
            context: self.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn persona() -> Persona {
        Persona::new("Researcher", "Summarise sentiment", "Reads every source")
    }

    #[test]
    fn test_system_prompt_embeds_schema() {
        let task = AgentTask::builder("news", persona())
            .subject("AAPL")
            .output_schema("NewsSchema", json!({"type": "object", "required": ["symbol"]}))
            .build();

        let prompt = task.system_prompt();
        assert!(prompt.contains("You are a Researcher."));
        assert!(prompt.contains("\"required\":[\"symbol\"]"));
    }

    #[test]
    fn test_system_prompt_without_schema() {
        let task = AgentTask::builder("free", persona()).build();
        assert!(!task.system_prompt().contains("JSON Schema"));
    }

    #[test]
    fn test_user_prompt_includes_context() {
        let task = AgentTask::builder("synthesis", persona())
            .subject("TSLA")
            .description("Combine the reports")
            .expected_output("One JSON document")
            .context(json!({"technical": {"trend": "up"}}))
            .build();

        let prompt = task.user_prompt();
        assert!(prompt.starts_with("Subject: TSLA"));
        assert!(prompt.contains("Reference data (JSON):"));
        assert!(prompt.contains("\"trend\": \"up\""));
    }

    #[test]
    fn test_user_prompt_skips_null_context() {
        let task = AgentTask::builder("news", persona()).subject("MSFT").build();
        assert!(!task.user_prompt().contains("Reference data"));
    }
}
