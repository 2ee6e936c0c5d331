use crate::agent::Agent;
use crate::config::Config;
use crate::error::RelayError;
use crate::prompt::convert_to_provider_messages;
use crate::protocol::{ChatQuery, ChatRequest};
use crate::tools::ToolRegistry;
use crate::translator::translate;
use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

const DATA_STREAM_HEADER: HeaderName = HeaderName::from_static("x-vercel-ai-data-stream");

/// Context shared by every request. Built once in [`run`] and never mutated.
pub(crate) struct ServerState {
    agent: Agent,
}

impl ServerState {
    pub(crate) fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub async fn run(config: Config) -> ServerResult<()> {
    let http = reqwest::Client::new();
    let tools = Arc::new(ToolRegistry::builtin(http.clone()));
    let state = Arc::new(ServerState::new(Agent::new(&config, http, tools)));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(
        listen = %config.listen,
        upstream = %config.base_url,
        model = %config.model,
        "relay listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

pub(crate) fn router(state: Arc<ServerState>) -> axum::Router {
    axum::Router::new()
        .route("/api/chat", post(handle_chat))
        .with_state(state)
}

async fn handle_chat(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<ChatQuery>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        messages = payload.messages.len(),
        protocol = %query.protocol,
        model = %state.agent.model(),
        "chat request"
    );

    let messages = convert_to_provider_messages(&payload.messages);
    let events = state.agent.stream_completion(messages).await?;
    let lines = translate(events, state.agent.tools(), request_id);

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
            (DATA_STREAM_HEADER, HeaderValue::from_static("v1")),
        ],
        Body::from_stream(lines),
    )
        .into_response())
}
