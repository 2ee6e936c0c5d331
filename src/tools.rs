use crate::ai_sdk::{FunctionDefinitionApi, ToolDefinitionApi};
use crate::error::{BoxError, RelayError};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

mod weather;

pub(crate) type ToolOutput = Result<serde_json::Value, BoxError>;

type ToolHandler = fn(Client, serde_json::Value) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>>;

pub(crate) struct ToolDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) parameters: serde_json::Value,
    pub(crate) handler: ToolHandler,
}

/// Dispatch table of callable tools. Built once at startup and shared read-only.
pub(crate) struct ToolRegistry {
    http: Client,
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub(crate) fn new(http: Client, tools: Vec<ToolDefinition>) -> Self {
        Self { http, tools }
    }

    pub(crate) fn builtin(http: Client) -> Self {
        Self::new(http, vec![weather::definition()])
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<&ToolDefinition, RelayError> {
        self.tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| RelayError::UnknownTool(name.to_string()))
    }

    /// Parses `arguments` as a JSON object and runs the named tool with it.
    pub(crate) async fn invoke(
        &self,
        name: &str,
        arguments: &str,
    ) -> Result<serde_json::Value, RelayError> {
        let tool = self.lookup(name)?;

        let input: serde_json::Value = if arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments).map_err(|source| RelayError::ToolArguments {
                tool: name.to_string(),
                source,
            })?
        };
        if !input.is_object() {
            return Err(RelayError::ToolArgumentsNotObject(name.to_string()));
        }

        (tool.handler)(self.http.clone(), input)
            .await
            .map_err(|source| RelayError::ToolFailed {
                tool: name.to_string(),
                source,
            })
    }

    pub(crate) fn api_definitions(&self) -> Vec<ToolDefinitionApi> {
        self.tools
            .iter()
            .map(|t| ToolDefinitionApi {
                kind: "function",
                function: FunctionDefinitionApi {
                    name: t.name.to_string(),
                    description: t.description.to_string(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}
