//! Tool registry
//!
//! Records the tools announced by tool extensions and, when an executor is
//! attached, invokes them. Invocation never fails: unknown tools and
//! execution errors come back as text the model can read to the user.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use voice_orchestrator_core::ToolRegistration;

/// Tool execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Execution(String),
}

/// An executable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

struct RegisteredTool {
    registration: ToolRegistration,
    executor: Option<Arc<dyn Tool>>,
}

/// Per-session tool registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tool announcement; a later announcement with the same name
    /// replaces the metadata but keeps an attached executor
    pub fn register(&mut self, registration: ToolRegistration) -> String {
        let name = registration
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", registration.source, self.tools.len()));

        match self.tools.get_mut(&name) {
            Some(existing) => existing.registration = registration,
            None => {
                self.tools.insert(
                    name.clone(),
                    RegisteredTool {
                        registration,
                        executor: None,
                    },
                );
            }
        }

        name
    }

    /// Attach an executor, registering the tool if it was never announced
    pub fn attach(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.tools.get_mut(&name) {
            Some(existing) => existing.executor = Some(tool),
            None => {
                let registration = ToolRegistration {
                    tool: serde_json::json!({ "name": name }),
                    source: String::new(),
                };
                self.tools.insert(
                    name,
                    RegisteredTool {
                        registration,
                        executor: Some(tool),
                    },
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolRegistration> {
        self.tools.get(name).map(|t| &t.registration)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let executor = self
            .tools
            .get(name)
            .and_then(|t| t.executor.clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        tracing::trace!(tool = name, "Executing tool");
        executor.execute(arguments).await
    }

    /// Execute a tool and render the outcome as user-visible text
    pub async fn invoke_text(&self, name: &str, arguments: Value) -> String {
        match self.invoke(name, arguments).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(ToolError::NotFound(name)) => format!("Unknown tool: {}", name),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool execution failed");
                format!("Tool operation failed: {}", e)
            }
        }
    }
}
