//! Re-encodes the upstream completion event stream as AI SDK data stream lines.
//!
//! Text deltas pass straight through as `0:` lines. Tool call deltas are
//! accumulated until the upstream finishes with `tool_calls`; then every call
//! is announced (`9:`), dispatched through the [`ToolRegistry`] and resolved
//! (`a:`). The usage trailer closes the stream with a single `e:` line.

use crate::ai_sdk::{StopReason, UpstreamEvent};
use crate::error::RelayError;
use crate::protocol::{
    DataStreamPart, FinishPart, FinishReason, ToolCallPart, ToolResultPart, Usage, raw_args,
};
use crate::sse::EventStream;
use crate::tools::ToolRegistry;
use futures::TryStreamExt;
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingToolCall {
    pub(crate) index: u32,
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) arguments: String,
}

/// What the caller must do after feeding one event.
#[derive(Debug)]
pub(crate) enum Action {
    Emit(Vec<DataStreamPart>),
    /// Announce every open tool call, then resolve them one by one.
    ResolveToolCalls,
}

pub(crate) struct StreamTranslator {
    tools: Arc<ToolRegistry>,
    request_id: Uuid,
    open_tool_calls: Vec<PendingToolCall>,
    active: Option<usize>,
    finished: bool,
}

impl StreamTranslator {
    pub(crate) fn new(tools: Arc<ToolRegistry>, request_id: Uuid) -> Self {
        Self {
            tools,
            request_id,
            open_tool_calls: Vec::new(),
            active: None,
            finished: false,
        }
    }

    pub(crate) fn open_tool_calls(&self) -> &[PendingToolCall] {
        &self.open_tool_calls
    }

    pub(crate) fn on_event(&mut self, event: UpstreamEvent) -> Result<Action, RelayError> {
        if self.finished {
            // Groq may report usage both in `x_groq` and in the usage trailer.
            if matches!(event, UpstreamEvent::Usage { .. }) {
                tracing::debug!(request_id = %self.request_id, ?event, "ignoring repeated usage");
            } else {
                tracing::warn!(request_id = %self.request_id, ?event, "ignoring event after finish");
            }
            return Ok(Action::Emit(Vec::new()));
        }

        match event {
            // A clean stop emits nothing here; the usage trailer reports it.
            UpstreamEvent::Finish(StopReason::Stop) => Ok(Action::Emit(Vec::new())),
            UpstreamEvent::Finish(StopReason::Other(reason)) => {
                tracing::debug!(request_id = %self.request_id, %reason, "upstream finished");
                Ok(Action::Emit(Vec::new()))
            }
            UpstreamEvent::Finish(StopReason::ToolCalls) => Ok(Action::ResolveToolCalls),
            UpstreamEvent::ToolCallStart { index, id, name } => {
                tracing::debug!(
                    request_id = %self.request_id,
                    tool_call_id = %id,
                    tool_name = %name,
                    "tool call started"
                );
                self.open_tool_calls.push(PendingToolCall {
                    index,
                    id,
                    name,
                    arguments: String::new(),
                });
                self.active = Some(self.open_tool_calls.len() - 1);
                Ok(Action::Emit(Vec::new()))
            }
            UpstreamEvent::ToolCallArgumentDelta { index, fragment } => {
                self.active_call(index)?.arguments.push_str(&fragment);
                Ok(Action::Emit(Vec::new()))
            }
            UpstreamEvent::TextDelta(text) => Ok(Action::Emit(vec![DataStreamPart::Text(text)])),
            UpstreamEvent::Usage {
                prompt_tokens,
                completion_tokens,
            } => {
                self.finished = true;
                let finish_reason = if self.open_tool_calls.is_empty() {
                    FinishReason::Stop
                } else {
                    FinishReason::ToolCalls
                };
                Ok(Action::Emit(vec![DataStreamPart::Finish(FinishPart {
                    finish_reason,
                    usage: Usage {
                        prompt_tokens,
                        completion_tokens,
                    },
                    is_continued: false,
                })]))
            }
        }
    }

    fn active_call(&mut self, index: u32) -> Result<&mut PendingToolCall, RelayError> {
        let active = self.active.ok_or(RelayError::NoActiveToolCall { index })?;
        let call = &mut self.open_tool_calls[active];
        if call.index != index {
            return Err(RelayError::InterleavedToolCall {
                expected: call.index,
                got: index,
            });
        }
        Ok(call)
    }

    /// `9:` parts for every accumulated call, in start order.
    pub(crate) fn announcements(&self) -> Result<Vec<DataStreamPart>, RelayError> {
        self.open_tool_calls
            .iter()
            .map(|call| {
                Ok(DataStreamPart::ToolCall(ToolCallPart {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    args: raw_args(&call.arguments)?,
                }))
            })
            .collect()
    }

    /// Runs the tool behind the call at `position`.
    ///
    /// Failures are logged and only suppress this call's `a:` part.
    pub(crate) async fn resolve(&self, position: usize) -> Option<DataStreamPart> {
        let call = self.open_tool_calls.get(position)?;
        tracing::info!(
            request_id = %self.request_id,
            tool_call_id = %call.id,
            tool_name = %call.name,
            "dispatching tool call"
        );

        let resolved = async {
            let result = self.tools.invoke(&call.name, &call.arguments).await?;
            Ok::<_, RelayError>(DataStreamPart::ToolResult(ToolResultPart {
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                args: raw_args(&call.arguments)?,
                result,
            }))
        }
        .await;

        match resolved {
            Ok(part) => Some(part),
            Err(err) => {
                tracing::error!(
                    request_id = %self.request_id,
                    tool_call_id = %call.id,
                    tool_name = %call.name,
                    error = %err,
                    "tool call failed"
                );
                None
            }
        }
    }
}

/// Lazily translates `events` into encoded data stream lines, one item per line.
///
/// Any error ends the stream after logging it; lines already yielded stand.
pub(crate) fn translate(
    events: EventStream,
    tools: Arc<ToolRegistry>,
    request_id: Uuid,
) -> impl Stream<Item = Result<String, RelayError>> + Send + 'static {
    let lines = async_stream::try_stream! {
        let mut events = events;
        let mut translator = StreamTranslator::new(tools, request_id);

        while let Some(event) = events.next().await {
            match translator.on_event(event?)? {
                Action::Emit(parts) => {
                    for part in parts {
                        yield part.encode()?;
                    }
                }
                Action::ResolveToolCalls => {
                    for part in translator.announcements()? {
                        yield part.encode()?;
                    }
                    for position in 0..translator.open_tool_calls().len() {
                        if let Some(part) = translator.resolve(position).await {
                            yield part.encode()?;
                        }
                    }
                }
            }
        }

        tracing::debug!(request_id = %request_id, "stream complete");
    };

    lines.inspect_err(move |err: &RelayError| {
        tracing::error!(request_id = %request_id, error = %err, "stream aborted");
    })
}
