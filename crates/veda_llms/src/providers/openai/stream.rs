//! SSE stream adapter for the OpenAI-compatible chat completions API.
//!
//! Wire format:
//! - `data: {"choices":[{"delta":{"content":"..."}}]}` for text deltas
//! - `data: {"choices":[{"delta":{"tool_calls":[...]}}]}` for tool calls
//! - `data: [DONE]` to signal stream end

use std::collections::HashMap;

use futures::stream::StreamExt;
use reqwest_eventsource::{Event, EventSource};

use super::types::OpenAiStreamChunk;
use crate::error::{Error, Result};
use crate::types::{FinishReason, GenerateStream, StreamEvent, Usage};

/// Accumulated tool-call state while argument fragments stream in.
#[derive(Debug, Clone)]
struct AccumulatedToolCall {
    id: String,
    name: String,
    arguments: String,
}

pub async fn create_stream(mut event_source: EventSource) -> Result<GenerateStream> {
    let stream = async_stream::stream! {
        let mut tool_calls: HashMap<u32, AccumulatedToolCall> = HashMap::new();
        let mut started = false;

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<OpenAiStreamChunk>(&message.data) {
                        Ok(chunk) => {
                            if !started {
                                started = true;
                                yield Ok(StreamEvent::start(chunk.id.clone()));
                            }
                            for stream_event in process_chunk(chunk, &mut tool_calls) {
                                yield Ok(stream_event);
                            }
                        }
                        Err(e) => {
                            yield Err(Error::stream_error(format!(
                                "failed to parse stream chunk: {}", e
                            )));
                            break;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read error body".to_string());
                    yield Err(Error::provider_error(format!(
                        "API error {}: {}", status, error_body
                    )));
                    break;
                }
                Err(e) => {
                    yield Err(Error::stream_error(format!("stream error: {}", e)));
                    break;
                }
            }
        }

        event_source.close();
    };

    Ok(GenerateStream::new(Box::pin(stream)))
}

fn process_chunk(
    chunk: OpenAiStreamChunk,
    tool_calls: &mut HashMap<u32, AccumulatedToolCall>,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    for choice in &chunk.choices {
        let delta = &choice.delta;

        if let Some(ref content) = delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::text_delta(content.clone()));
            }
        }

        if let Some(ref delta_tool_calls) = delta.tool_calls {
            for tc in delta_tool_calls {
                let index = tc.index;

                if let Some(ref id) = tc.id {
                    let name = tc.function.name.clone().unwrap_or_default();
                    tool_calls.insert(
                        index,
                        AccumulatedToolCall {
                            id: id.clone(),
                            name: name.clone(),
                            arguments: String::new(),
                        },
                    );
                    events.push(StreamEvent::tool_call_start(id.clone(), name));
                }

                if let Some(ref args) = tc.function.arguments {
                    if !args.is_empty() {
                        if let Some(accumulated) = tool_calls.get_mut(&index) {
                            accumulated.arguments.push_str(args);
                            events.push(StreamEvent::tool_call_delta(
                                accumulated.id.clone(),
                                args.clone(),
                            ));
                        }
                    }
                }
            }
        }

        if choice.finish_reason.is_some() {
            for (_, tc) in tool_calls.drain() {
                let arguments = if tc.arguments.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&tc.arguments).unwrap_or(serde_json::json!({}))
                };
                events.push(StreamEvent::tool_call_end(tc.id, tc.name, arguments));
            }

            let usage = chunk
                .usage
                .as_ref()
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
                .unwrap_or_default();

            events.push(StreamEvent::finish(
                usage,
                FinishReason::parse(&choice.finish_reason),
            ));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(raw: &str) -> OpenAiStreamChunk {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_text_delta() {
        let mut tool_calls = HashMap::new();
        let events = process_chunk(
            chunk(r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#),
            &mut tool_calls,
        );
        assert_eq!(events, vec![StreamEvent::text_delta("Hello")]);
    }

    #[test]
    fn test_empty_delta_produces_nothing() {
        let mut tool_calls = HashMap::new();
        let events = process_chunk(
            chunk(r#"{"choices":[{"delta":{"content":""},"finish_reason":null}]}"#),
            &mut tool_calls,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_finish_with_usage() {
        let mut tool_calls = HashMap::new();
        let events = process_chunk(
            chunk(
                r#"{"choices":[{"delta":{},"finish_reason":"stop"}],
                    "usage":{"prompt_tokens":7,"completion_tokens":2,"total_tokens":9}}"#,
            ),
            &mut tool_calls,
        );
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Finish { usage, reason } => {
                assert_eq!(usage.prompt_tokens, 7);
                assert_eq!(*reason, FinishReason::Stop);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_tool_call_accumulation() {
        let mut tool_calls = HashMap::new();

        let events = process_chunk(
            chunk(
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1",
                    "function":{"name":"generate_question","arguments":""}}]},"finish_reason":null}]}"#,
            ),
            &mut tool_calls,
        );
        assert_eq!(
            events,
            vec![StreamEvent::tool_call_start("call_1", "generate_question")]
        );

        let events = process_chunk(
            chunk(
                r#"{"choices":[{"delta":{"tool_calls":[{"index":0,
                    "function":{"arguments":"{\"concept\":\"circles\"}"}}]},"finish_reason":null}]}"#,
            ),
            &mut tool_calls,
        );
        assert_eq!(events.len(), 1);

        let events = process_chunk(
            chunk(r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#),
            &mut tool_calls,
        );
        assert_eq!(events.len(), 2); // ToolCallEnd + Finish
        match &events[0] {
            StreamEvent::ToolCallEnd {
                id,
                name,
                arguments,
            } => {
                assert_eq!(id, "call_1");
                assert_eq!(name, "generate_question");
                assert_eq!(arguments["concept"], "circles");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
