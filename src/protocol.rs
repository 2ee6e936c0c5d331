use crate::error::RelayError;
use crate::prompt::ClientMessage;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ClientMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "data".to_string()
}

/// One line of the AI SDK data stream protocol.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum DataStreamPart {
    Text(String),
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
    Finish(FinishPart),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolCallPart {
    pub(crate) tool_call_id: String,
    pub(crate) tool_name: String,
    pub(crate) args: Box<RawValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolResultPart {
    pub(crate) tool_call_id: String,
    pub(crate) tool_name: String,
    pub(crate) args: Box<RawValue>,
    pub(crate) result: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinishPart {
    pub(crate) finish_reason: FinishReason,
    pub(crate) usage: Usage,
    pub(crate) is_continued: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum FinishReason {
    Stop,
    ToolCalls,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Usage {
    pub(crate) prompt_tokens: u64,
    pub(crate) completion_tokens: u64,
}

impl DataStreamPart {
    fn tag(&self) -> char {
        match self {
            DataStreamPart::Text(_) => '0',
            DataStreamPart::ToolCall(_) => '9',
            DataStreamPart::ToolResult(_) => 'a',
            DataStreamPart::Finish(_) => 'e',
        }
    }

    /// Renders `<tag>:<json>\n`.
    pub(crate) fn encode(&self) -> Result<String, RelayError> {
        let payload = serde_json::to_string(self).map_err(RelayError::Encode)?;
        Ok(format!("{}:{}\n", self.tag(), payload))
    }
}

/// Embeds accumulated tool arguments without re-serializing them.
///
/// Empty arguments become `{}`. Text that is not valid JSON is embedded as a JSON
/// string so the surrounding line still parses.
pub(crate) fn raw_args(arguments: &str) -> Result<Box<RawValue>, RelayError> {
    if arguments.trim().is_empty() {
        return RawValue::from_string("{}".to_string()).map_err(RelayError::Encode);
    }

    match RawValue::from_string(arguments.to_string()) {
        Ok(raw) => Ok(raw),
        Err(_) => serde_json::value::to_raw_value(arguments).map_err(RelayError::Encode),
    }
}
