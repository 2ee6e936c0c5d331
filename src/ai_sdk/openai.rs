use crate::error::RelayError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub(crate) model: String,
    pub(crate) messages: Vec<ProviderMessage>,
    pub(crate) stream: bool,
    pub(crate) stream_options: StreamOptions,
    pub(crate) tools: Vec<ToolDefinitionApi>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamOptions {
    pub(crate) include_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProviderMessage {
    System {
        content: Vec<ContentPart>,
    },
    User {
        content: Vec<ContentPart>,
    },
    Assistant {
        content: Vec<ContentPart>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCallParam>>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub(crate) fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParam {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as the chat completions API expects them.
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolDefinitionApi {
    #[serde(rename = "type")]
    pub(crate) kind: &'static str,
    pub(crate) function: FunctionDefinitionApi,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionDefinitionApi {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) parameters: serde_json::Value,
}

// Streaming response chunks.

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionChunk {
    #[serde(default)]
    pub(crate) choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub(crate) usage: Option<CompletionUsage>,
    #[serde(default)]
    pub(crate) x_groq: Option<GroqExtension>,
    #[serde(default)]
    pub(crate) error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChunkChoice {
    #[serde(default)]
    pub(crate) delta: ChunkDelta,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChunkDelta {
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallDelta {
    #[serde(default)]
    pub(crate) index: u32,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) function: FunctionDelta,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FunctionDelta {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct CompletionUsage {
    pub(crate) prompt_tokens: u64,
    pub(crate) completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroqExtension {
    #[serde(default)]
    pub(crate) usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamErrorBody {
    #[serde(default)]
    pub(crate) message: String,
}

/// One item of the upstream event stream, after chunk decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UpstreamEvent {
    TextDelta(String),
    ToolCallStart { index: u32, id: String, name: String },
    ToolCallArgumentDelta { index: u32, fragment: String },
    Finish(StopReason),
    Usage {
        prompt_tokens: u64,
        completion_tokens: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopReason {
    Stop,
    ToolCalls,
    Other(String),
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        match reason {
            "stop" => StopReason::Stop,
            "tool_calls" => StopReason::ToolCalls,
            other => StopReason::Other(other.to_string()),
        }
    }
}

impl From<CompletionUsage> for UpstreamEvent {
    fn from(usage: CompletionUsage) -> Self {
        UpstreamEvent::Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

impl ChatCompletionChunk {
    pub(crate) fn into_events(self) -> Result<Vec<UpstreamEvent>, RelayError> {
        if let Some(error) = self.error {
            return Err(RelayError::UpstreamReported(error.message));
        }

        // A chunk without choices is the usage trailer requested via stream_options.
        if self.choices.is_empty() {
            return Ok(self.usage.map(UpstreamEvent::from).into_iter().collect());
        }

        let mut events = Vec::new();
        for choice in self.choices {
            if let Some(reason) = choice.finish_reason.as_deref() {
                events.push(UpstreamEvent::Finish(reason.into()));
                continue;
            }

            match choice.delta.tool_calls {
                Some(calls) if !calls.is_empty() => {
                    for call in calls {
                        let arguments = call.function.arguments.unwrap_or_default();
                        match call.id {
                            Some(id) => {
                                events.push(UpstreamEvent::ToolCallStart {
                                    index: call.index,
                                    id,
                                    name: call.function.name.unwrap_or_default(),
                                });
                                if !arguments.is_empty() {
                                    events.push(UpstreamEvent::ToolCallArgumentDelta {
                                        index: call.index,
                                        fragment: arguments,
                                    });
                                }
                            }
                            None => events.push(UpstreamEvent::ToolCallArgumentDelta {
                                index: call.index,
                                fragment: arguments,
                            }),
                        }
                    }
                }
                _ => {
                    if let Some(content) = choice.delta.content {
                        events.push(UpstreamEvent::TextDelta(content));
                    }
                }
            }
        }

        if let Some(usage) = self.x_groq.and_then(|extension| extension.usage) {
            events.push(usage.into());
        }

        Ok(events)
    }
}
