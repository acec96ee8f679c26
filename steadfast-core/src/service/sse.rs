//! Server-sent-event decoding for the agent gateway.
//!
//! Each `data:` line carries one JSON message tagged by `type`:
//! `assistant` (content blocks), `stream_event` (token progress),
//! `result` (end of response) or `error`. Any other message type still
//! counts as activity and is surfaced as a heartbeat.

use std::collections::VecDeque;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::service::types::{CompletionEvent, ContentEvent, EventStream, ServiceEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Event(ServiceEvent),
    Done,
    Error(String),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Assistant {
        #[serde(default)]
        content: Vec<WireBlock>,
        #[serde(default)]
        model: Option<String>,
    },
    StreamEvent {},
    Result(WireResult),
    Error {
        message: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireResult {
    duration_ms: Option<u64>,
    num_turns: Option<u32>,
    total_cost_usd: Option<f64>,
    is_error: bool,
    stop_reason: Option<String>,
}

/// Decodes a streaming response body into an [`EventStream`].
pub fn event_stream(response: reqwest::Response) -> EventStream {
    decode_event_stream(response.bytes_stream())
}

/// Splits `body` into lines on raw bytes and decodes each complete line, so
/// multi-byte characters may straddle chunk boundaries.
///
/// The body is polled only by the returned stream; dropping the stream drops
/// the body and with it the connection.
pub fn decode_event_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let decoder = LineDecoder {
        body: body
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.as_ref().to_vec())
                    .map_err(|err| err.to_string())
            })
            .boxed(),
        buffer: Vec::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.ready.pop_front() {
                return Some((item, decoder));
            }
            if decoder.finished {
                return None;
            }

            match decoder.body.next().await {
                Some(Ok(chunk)) => {
                    decoder.buffer.extend_from_slice(&chunk);
                    decoder.take_lines();
                }
                Some(Err(err)) => decoder.fail(Error::Transport(format!(
                    "failed to read event stream: {err}"
                ))),
                None => {
                    if !decoder.buffer.is_empty() {
                        decoder.buffer.push(b'\n');
                        decoder.take_lines();
                    }
                    decoder.finished = true;
                }
            }
        }
    })
    .boxed()
}

struct LineDecoder {
    body: BoxStream<'static, std::result::Result<Vec<u8>, String>>,
    buffer: Vec<u8>,
    ready: VecDeque<Result<ServiceEvent>>,
    finished: bool,
}

impl LineDecoder {
    fn take_lines(&mut self) {
        while !self.finished {
            let Some(idx) = self.buffer.iter().position(|byte| *byte == b'\n') else {
                return;
            };
            let raw: Vec<u8> = self.buffer.drain(..=idx).collect();

            let line = match std::str::from_utf8(&raw[..idx]) {
                Ok(line) => line.trim_end_matches('\r'),
                Err(err) => {
                    self.fail(Error::Transport(format!(
                        "invalid UTF-8 in event stream: {err}"
                    )));
                    return;
                }
            };

            match parse_sse_line(line) {
                Some(SseFrame::Event(event)) => self.ready.push_back(Ok(event)),
                Some(SseFrame::Error(message)) => self.fail(Error::Service(message)),
                Some(SseFrame::Done) => self.finished = true,
                None => {}
            }
        }
    }

    fn fail(&mut self, err: Error) {
        self.ready.push_back(Err(err));
        self.finished = true;
    }
}

pub fn parse_sse_line(line: &str) -> Option<SseFrame> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }

    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }

    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(err) => {
            return Some(SseFrame::Error(format!(
                "failed to parse event JSON: {err}"
            )));
        }
    };

    if let Some(message) = extract_error_message(&value) {
        return Some(SseFrame::Error(message));
    }

    let message: WireMessage = match serde_json::from_value(value) {
        Ok(message) => message,
        Err(err) => {
            return Some(SseFrame::Error(format!("malformed event: {err}")));
        }
    };

    let event = match message {
        WireMessage::Assistant { content, model } => ServiceEvent::Content(ContentEvent {
            source: model,
            text: render_blocks(&content),
        }),
        WireMessage::Result(result) => ServiceEvent::Completion(CompletionEvent {
            duration_ms: result.duration_ms,
            num_turns: result.num_turns,
            total_cost_usd: result.total_cost_usd,
            is_error: result.is_error,
            stop_reason: result.stop_reason,
        }),
        WireMessage::Error { message } => return Some(SseFrame::Error(message)),
        WireMessage::StreamEvent {} | WireMessage::Other => ServiceEvent::Heartbeat,
    };

    Some(SseFrame::Event(event))
}

fn extract_error_message(value: &Value) -> Option<String> {
    let error = value.get("error")?;

    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_owned());
    }

    if let Some(message) = error.as_str() {
        return Some(message.to_owned());
    }

    Some(error.to_string())
}

fn render_blocks(blocks: &[WireBlock]) -> String {
    let mut rendered = String::new();
    for block in blocks {
        let piece = match block {
            WireBlock::Text { text } => text.clone(),
            WireBlock::ToolUse { name } => format!("[tool: {name}]"),
            WireBlock::Other => continue,
        };
        if !rendered.is_empty() {
            rendered.push('\n');
        }
        rendered.push_str(&piece);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::{decode_event_stream, parse_sse_line, SseFrame};
    use crate::service::types::{CompletionEvent, ContentEvent, ServiceEvent};
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn chunks(parts: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Vec<u8>, String>> {
        futures::stream::iter(parts.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn reassembles_characters_split_across_chunks() {
        let line = "data: {\"type\":\"assistant\",\"content\":[{\"type\":\"text\",\"text\":\"café — ok\"}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').expect("accented char") + 1;
        assert_eq!(bytes[split - 1], 0xC3);

        let mut stream = decode_event_stream(chunks(vec![
            bytes[..split].to_vec(),
            bytes[split..].to_vec(),
            b"data: {\"type\":\"result\"}\n".to_vec(),
        ]));

        let first = stream.next().await.expect("content").expect("decoded");
        assert_eq!(first, ServiceEvent::content("café — ok"));
        assert!(matches!(
            stream.next().await,
            Some(Ok(ServiceEvent::Completion(_)))
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn decodes_unterminated_last_line_and_stops_at_done() {
        let mut stream = decode_event_stream(chunks(vec![
            b": ping\r\ndata: {\"type\":\"stream_event\"}\r\ndata: [DONE]\n".to_vec(),
            b"data: {\"type\":\"result\"}".to_vec(),
        ]));
        assert_eq!(
            stream.next().await.expect("heartbeat").expect("ok"),
            ServiceEvent::Heartbeat
        );
        assert!(stream.next().await.is_none());

        let mut tail = decode_event_stream(chunks(vec![b"data: {\"type\":\"result\"}".to_vec()]));
        assert!(matches!(tail.next().await, Some(Ok(ServiceEvent::Completion(_)))));
    }

    #[tokio::test]
    async fn error_frame_and_invalid_utf8_end_the_stream() {
        let mut stream = decode_event_stream(chunks(vec![
            b"data: {\"error\":\"rate limited\"}\ndata: {\"type\":\"result\"}\n".to_vec(),
        ]));
        assert!(stream.next().await.expect("error").is_err());
        assert!(stream.next().await.is_none());

        let mut garbled = decode_event_stream(chunks(vec![vec![b'd', 0xFF, b'\n']]));
        assert!(garbled.next().await.expect("error").is_err());
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_a_silent_body() {
        let held = Arc::new(());
        let keep = held.clone();
        let silent = futures::stream::once(async move {
            let _keep = keep;
            futures::future::pending::<Result<Vec<u8>, String>>().await
        });

        let mut stream = decode_event_stream(silent);
        let waited = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
        assert!(waited.is_err());
        assert_eq!(Arc::strong_count(&held), 2);

        drop(stream);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: message"), None);
    }

    #[test]
    fn decodes_assistant_content_blocks() {
        let frame = parse_sse_line(
            r#"data: {"type":"assistant","model":"sonnet","content":[{"type":"text","text":"Drafting the guide"},{"type":"tool_use","name":"Write","input":{}},{"type":"thinking","thinking":"..."}]}"#,
        );

        assert_eq!(
            frame,
            Some(SseFrame::Event(ServiceEvent::Content(ContentEvent {
                source: Some("sonnet".to_owned()),
                text: "Drafting the guide\n[tool: Write]".to_owned(),
            })))
        );
    }

    #[test]
    fn token_events_and_unknown_messages_are_heartbeats() {
        assert_eq!(
            parse_sse_line(r#"data: {"type":"stream_event","event":{"type":"content_block_delta"}}"#),
            Some(SseFrame::Event(ServiceEvent::Heartbeat))
        );
        assert_eq!(
            parse_sse_line(r#"data: {"type":"system","subtype":"init"}"#),
            Some(SseFrame::Event(ServiceEvent::Heartbeat))
        );
    }

    #[test]
    fn decodes_result_as_completion() {
        let frame = parse_sse_line(
            r#"data: {"type":"result","duration_ms":5120,"num_turns":4,"total_cost_usd":0.5,"is_error":false}"#,
        );

        assert_eq!(
            frame,
            Some(SseFrame::Event(ServiceEvent::Completion(CompletionEvent {
                duration_ms: Some(5120),
                num_turns: Some(4),
                total_cost_usd: Some(0.5),
                is_error: false,
                stop_reason: None,
            })))
        );
    }

    #[test]
    fn surfaces_errors_and_done_marker() {
        assert_eq!(parse_sse_line("data: [DONE]"), Some(SseFrame::Done));
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"session expired"}}"#),
            Some(SseFrame::Error("session expired".to_owned()))
        );
        assert_eq!(
            parse_sse_line(r#"data: {"type":"error","message":"overloaded"}"#),
            Some(SseFrame::Error("overloaded".to_owned()))
        );
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Some(SseFrame::Error(_))
        ));
    }
}
