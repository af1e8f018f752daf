use serde::{Deserialize, Serialize};
use serde_json::Value;
use tooldemo_model::{
    ChatMessage, ModelFinishReason, ModelRequest, ModelTool,
    ToolCall as ModelToolCall,
};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionToolCall>,
}

/// One event of a streamed completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChunkChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// A complete, non-streamed completion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct CompletionMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
    strict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: req.model.clone().unwrap_or_else(|| config.model.clone()),
        messages: req.messages.iter().map(create_message).collect(),
        max_tokens: req.max_tokens,
        tools: req.tools.iter().map(create_tool).collect(),
        stream: req.stream,
        temperature: req.temperature,
        stream_options: req.stream.then_some(StreamOptions {
            include_usage: true,
        }),
    }
}

#[inline]
fn create_message(msg: &ChatMessage) -> Message {
    match msg {
        ChatMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ChatMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ChatMessage::Assistant {
            content,
            tool_calls,
        } => Message::Assistant {
            content: content.clone(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls.iter().map(create_tool_call).collect())
            },
        },
        ChatMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            name: result.name.clone(),
            content: result.content.clone(),
        },
    }
}

#[inline]
fn create_tool_call(tool_call: &ModelToolCall) -> ToolCall {
    ToolCall {
        index: None,
        id: Some(tool_call.id.clone()),
        r#type: Some("function".to_owned()),
        function: Some(FunctionToolCall {
            name: Some(tool_call.name.clone()),
            arguments: Some(tool_call.arguments.clone()),
        }),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
            strict: tool.strict,
        },
    }
}

/// Converts a (possibly accumulated) wire tool call into the model type.
#[inline]
pub fn into_model_tool_call(tool_call: ToolCall) -> ModelToolCall {
    let function = tool_call.function.unwrap_or(FunctionToolCall {
        name: None,
        arguments: None,
    });
    ModelToolCall {
        id: tool_call.id.unwrap_or_default(),
        name: function.name.unwrap_or_default(),
        arguments: function.arguments.unwrap_or_default(),
    }
}

#[inline]
pub fn parse_finish_reason(finish_reason: &str) -> ModelFinishReason {
    match finish_reason {
        "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
        "length" => ModelFinishReason::Length,
        _ => ModelFinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tooldemo_model::ToolCallResult;

    use super::*;
    use crate::OpenAIConfigBuilder;

    fn weather_tool() -> ModelTool {
        ModelTool {
            name: "get_weather".to_owned(),
            description: "Get current temperature for a given location."
                .to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City and country e.g. Bogotá, Colombia"
                    }
                },
                "required": ["location"],
                "additionalProperties": false
            }),
            strict: true,
        }
    }

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            model: None,
            messages: vec![
                ChatMessage::System("You are a helpful assistant.".to_owned()),
                ChatMessage::User("Hello".to_owned()),
            ],
            tools: vec![weather_tool()],
            max_tokens: Some(400),
            temperature: None,
            stream: false,
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .build();
        let expected = json!({
            "model": "custom",
            "messages": [
                { "role": "system", "content": "You are a helpful assistant." },
                { "role": "user", "content": "Hello" }
            ],
            "max_tokens": 400,
            "tools": [{
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Get current temperature for a given location.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "location": {
                                "type": "string",
                                "description": "City and country e.g. Bogotá, Colombia"
                            }
                        },
                        "required": ["location"],
                        "additionalProperties": false
                    },
                    "strict": true
                }
            }],
            "stream": false
        });
        let actual =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_create_streaming_followup() {
        let request = ModelRequest {
            model: Some("openai/gpt-4o-mini".to_owned()),
            messages: vec![
                ChatMessage::Assistant {
                    content: None,
                    tool_calls: vec![ModelToolCall {
                        id: "call_1".to_owned(),
                        name: "get_weather".to_owned(),
                        arguments: r#"{"location":"Tokyi"}"#.to_owned(),
                    }],
                },
                ChatMessage::Tool(ToolCallResult {
                    id: "call_1".to_owned(),
                    name: "get_weather".to_owned(),
                    content: r#"{"temperature":"22°C"}"#.to_owned(),
                }),
            ],
            tools: vec![],
            max_tokens: None,
            temperature: Some(0.5),
            stream: true,
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx").build();
        let actual =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        let expected = json!({
            "model": "openai/gpt-4o-mini",
            "messages": [
                {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"Tokyi\"}"
                        }
                    }]
                },
                {
                    "role": "tool",
                    "tool_call_id": "call_1",
                    "name": "get_weather",
                    "content": "{\"temperature\":\"22°C\"}"
                }
            ],
            "stream": true,
            "temperature": 0.5,
            "stream_options": { "include_usage": true }
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_parse_completion() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"Tokyi\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        }))
        .unwrap();
        let choice = &completion.choices[0];
        assert_eq!(choice.message.content, None);
        let tool_call = choice.message.tool_calls.clone().unwrap().remove(0);
        assert_eq!(
            into_model_tool_call(tool_call),
            ModelToolCall {
                id: "call_1".to_owned(),
                name: "get_weather".to_owned(),
                arguments: r#"{"location":"Tokyi"}"#.to_owned(),
            }
        );
        assert_eq!(
            parse_finish_reason(choice.finish_reason.as_deref().unwrap()),
            ModelFinishReason::ToolCalls
        );
    }
}
