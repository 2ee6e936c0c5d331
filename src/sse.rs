use crate::ai_sdk::{ChatCompletionChunk, UpstreamEvent};
use crate::error::RelayError;
use axum::body::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

const DONE_SENTINEL: &str = "[DONE]";

pub(crate) type EventStream = BoxStream<'static, Result<UpstreamEvent, RelayError>>;

/// Splits a server-sent-events byte stream into the `data` payload of each event.
///
/// Bytes stay buffered until a full event has arrived, so a UTF-8 sequence split
/// across network chunks is decoded intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((idx, separator_len)) = find_event_boundary(&self.buffer) {
            let raw_event: Vec<u8> = self.buffer.drain(..idx + separator_len).collect();
            let raw_event = String::from_utf8_lossy(&raw_event[..idx]);
            if let Some(data) = extract_sse_data(&raw_event) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing event that was not terminated by a blank line.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        extract_sse_data(&String::from_utf8_lossy(&rest))
    }
}

fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));

    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if lf.0 <= crlf.0 { lf } else { crlf }),
        (lf, crlf) => lf.or(crlf),
    }
}

fn extract_sse_data(raw: &str) -> Option<String> {
    let mut data_lines = Vec::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(data) = line.strip_prefix("data:") {
            data_lines.push(data.trim_start().to_string());
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

fn parse_chunk(data: &str) -> Result<Vec<UpstreamEvent>, RelayError> {
    serde_json::from_str::<ChatCompletionChunk>(data)
        .map_err(RelayError::MalformedEvent)?
        .into_events()
}

/// Decodes a chat completions SSE body into upstream events, ending at `[DONE]`.
pub(crate) fn upstream_events<S>(body: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let events = async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::default();
        let mut done = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for data in decoder.push(&chunk) {
                if data == DONE_SENTINEL {
                    done = true;
                    break;
                }
                for event in parse_chunk(&data)? {
                    yield event;
                }
            }
            if done {
                break;
            }
        }

        if !done {
            if let Some(data) = decoder.finish() {
                if data != DONE_SENTINEL {
                    for event in parse_chunk(&data)? {
                        yield event;
                    }
                }
            }
        }
    };
    events.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_sdk::StopReason;
    use futures::stream;

    type Body = stream::Iter<std::vec::IntoIter<Result<Bytes, reqwest::Error>>>;

    fn body(parts: &[&str]) -> Body {
        let parts: Vec<Result<Bytes, reqwest::Error>> = parts
            .iter()
            .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
            .collect();
        stream::iter(parts)
    }

    async fn collect(parts: &[&str]) -> Vec<UpstreamEvent> {
        upstream_events(body(parts))
            .map(|event| event.unwrap())
            .collect()
            .await
    }

    #[test]
    fn decoder_waits_for_complete_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n\ndata: x\n"), vec!["{\"a\":1}".to_string()]);
        assert_eq!(decoder.push(b"\n"), vec!["x".to_string()]);
    }

    #[test]
    fn decoder_handles_crlf_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push(b"event: message\r\ndata: first\r\ndata: second\r\n\r\n");
        assert_eq!(payloads, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn decoder_skips_comment_only_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\n\n").is_empty());
    }

    #[test]
    fn decoder_keeps_multibyte_text_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let event = "data: {\"content\":\"h\u{e9}\"}\n\n".as_bytes();
        let split = event.iter().position(|b| *b == 0xc3).unwrap() + 1;

        assert!(decoder.push(&event[..split]).is_empty());
        assert_eq!(
            decoder.push(&event[split..]),
            vec!["{\"content\":\"h\u{e9}\"}".to_string()]
        );
    }

    #[tokio::test]
    async fn body_decodes_into_events_until_done() {
        let events = collect(&[
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\ndata: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2}}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        ])
        .await;

        assert_eq!(
            events,
            vec![
                UpstreamEvent::TextDelta("Hel".to_string()),
                UpstreamEvent::TextDelta("lo".to_string()),
                UpstreamEvent::Finish(StopReason::Stop),
                UpstreamEvent::Usage {
                    prompt_tokens: 5,
                    completion_tokens: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn unterminated_trailing_event_is_flushed() {
        let events = collect(&["data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"end\"}}]}"]).await;
        assert_eq!(events, vec![UpstreamEvent::TextDelta("end".to_string())]);
    }

    #[tokio::test]
    async fn malformed_payload_aborts_the_stream() {
        let results: Vec<_> = upstream_events(body(&["data: {not json\n\n"])).collect().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(RelayError::MalformedEvent(_))));
    }
}
