use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The model identifier. Providers fall back to their configured
    /// model when this is `None`.
    pub model: Option<String>,
    /// The input messages, in conversation order.
    pub messages: Vec<ChatMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Upper bound of tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Whether the response should be delivered incrementally.
    pub stream: bool,
}

/// A complete message in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant turn, optionally requesting tool calls.
    Assistant {
        /// The text of the turn, if the model produced any.
        content: Option<String>,
        /// Tool calls requested in this turn, in the order received.
        tool_calls: Vec<ToolCall>,
    },
    /// A tool call result.
    Tool(ToolCallResult),
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCall {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments, as the raw JSON text emitted by the model.
    pub arguments: String,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub id: String,
    /// The name of the tool that was called.
    pub name: String,
    /// The JSON-serialized result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
    /// Whether the model must follow the schema exactly.
    pub strict: bool,
}
