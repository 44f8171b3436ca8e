//! Conversions between unified types and the OpenAI wire format.

use super::types::{
    OpenAiCalledFunction, OpenAiFunction, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiTool, OpenAiToolCall, ResponseFormat,
};
use crate::error::{Error, Result};
use crate::types::{
    ChatMessage, FinishReason, GenerateRequest, GenerateResponse, Role, ToolCall, Usage,
};

pub fn to_openai_request(request: &GenerateRequest, stream: bool) -> Result<OpenAiRequest> {
    let messages = request.messages.iter().map(to_openai_message).collect();

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| OpenAiTool {
                    type_: "function".to_string(),
                    function: OpenAiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };

    let response_format = request.json_mode.then(|| ResponseFormat {
        type_: "json_object".to_string(),
    });

    Ok(OpenAiRequest {
        model: request.model.clone(),
        messages,
        tools,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format,
        stream,
    })
}

fn to_openai_message(message: &ChatMessage) -> OpenAiMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|c| OpenAiToolCall {
                    id: c.id.clone(),
                    type_: "function".to_string(),
                    function: OpenAiCalledFunction {
                        name: c.name.clone(),
                        arguments: c.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    OpenAiMessage {
        role: role.to_string(),
        content: if message.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(message.content.clone())
        },
        tool_call_id: message.tool_call_id.clone(),
        tool_calls,
    }
}

pub fn from_openai_response(response: OpenAiResponse) -> Result<GenerateResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::provider_error("response carried no choices"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let arguments: serde_json::Value = serde_json::from_str(&c.function.arguments)
                .unwrap_or(serde_json::Value::Null);
            ToolCall::new(c.id, c.function.name, arguments)
        })
        .collect();

    let usage = response
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(GenerateResponse {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        finish: FinishReason::parse(&choice.finish_reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolSpec;

    #[test]
    fn test_request_round_trip_shape() {
        let request = GenerateRequest::new(
            "gpt-4o-mini",
            vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
        )
        .with_tools(vec![ToolSpec {
            name: "generate_question".to_string(),
            description: "Generate a question".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }])
        .with_temperature(0.7);

        let wire = to_openai_request(&request, false).unwrap();
        assert_eq!(wire.model, "gpt-4o-mini");
        assert_eq!(wire.messages.len(), 2);
        assert!(wire.tools.is_some());
        assert!(!wire.stream);
        assert!(wire.response_format.is_none());
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let request = GenerateRequest::new("m", vec![ChatMessage::user("x")]).with_json_mode();
        let wire = to_openai_request(&request, false).unwrap();
        assert_eq!(wire.response_format.unwrap().type_, "json_object");
    }

    #[test]
    fn test_assistant_tool_call_message() {
        let msg = ChatMessage::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_1",
            "check_calculation",
            serde_json::json!({"expression": "1+1"}),
        )]);
        let wire = to_openai_message(&msg);
        assert!(wire.content.is_none());
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "check_calculation");
        assert!(calls[0].function.arguments.contains("expression"));
    }

    #[test]
    fn test_from_response_with_tool_calls() {
        let raw = r#"{
            "choices":[{
                "message":{
                    "role":"assistant",
                    "content":null,
                    "tool_calls":[{"id":"call_9","type":"function",
                        "function":{"name":"generate_question","arguments":"{\"concept\":\"quadratic_roots\"}"}}]
                },
                "finish_reason":"tool_calls"
            }]
        }"#;
        let response: OpenAiResponse = serde_json::from_str(raw).unwrap();
        let unified = from_openai_response(response).unwrap();
        assert_eq!(unified.finish, FinishReason::ToolCalls);
        assert_eq!(unified.tool_calls.len(), 1);
        assert_eq!(unified.tool_calls[0].arguments["concept"], "quadratic_roots");
    }

    #[test]
    fn test_from_response_empty_choices() {
        let response = OpenAiResponse {
            choices: vec![],
            usage: None,
        };
        assert!(from_openai_response(response).is_err());
    }
}
