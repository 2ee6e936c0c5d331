use crate::ai_sdk::{ChatCompletionRequest, ProviderMessage, StreamOptions};
use crate::config::Config;
use crate::error::RelayError;
use crate::sse::{EventStream, upstream_events};
use crate::tools::ToolRegistry;
use reqwest::Client;
use std::sync::Arc;

/// Client for the upstream chat completions service plus the tools it may call.
pub struct Agent {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub(crate) fn new(config: &Config, client: Client, tools: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            tools,
        }
    }

    pub(crate) fn tools(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.tools)
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    /// Opens a streaming completion and returns its decoded events.
    pub(crate) async fn stream_completion(
        &self,
        messages: Vec<ProviderMessage>,
    ) -> Result<EventStream, RelayError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            tools: self.tools.api_definitions(),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::UpstreamStatus { status, body });
        }

        Ok(upstream_events(response.bytes_stream()))
    }
}
