use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("upstream reported an error: {0}")]
    UpstreamReported(String),

    #[error("malformed upstream event: {0}")]
    MalformedEvent(#[source] serde_json::Error),

    #[error("argument fragment for tool call #{index} arrived before any tool call started")]
    NoActiveToolCall { index: u32 },

    #[error("argument fragment for tool call #{got} arrived while tool call #{expected} is open")]
    InterleavedToolCall { expected: u32, got: u32 },

    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("invalid arguments for tool `{tool}`: {source}")]
    ToolArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("arguments for tool `{0}` are not a JSON object")]
    ToolArgumentsNotObject(String),

    #[error("tool `{tool}` failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to encode stream part: {0}")]
    Encode(#[source] serde_json::Error),
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            RelayError::Upstream(_)
            | RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamReported(_)
            | RelayError::MalformedEvent(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed before streaming");
        (self.status(), self.to_string()).into_response()
    }
}
