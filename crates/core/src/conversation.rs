//! Conversation-related types.

use tooldemo_model::{ChatMessage, ToolCall, ToolCallResult};

/// Represents a conversation.
///
/// Messages are kept in the order they are appended, which is the order
/// the model consumes them in.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Creates a conversation seeded with one user message.
    #[inline]
    pub fn with_user_message<S: Into<String>>(input: S) -> Self {
        Self {
            messages: vec![ChatMessage::User(input.into())],
        }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, msg: ChatMessage) {
        self.messages.push(msg);
    }

    /// Appends an assistant turn that requested `tool_calls`.
    #[inline]
    pub fn push_assistant(
        &mut self,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) {
        self.push(ChatMessage::Assistant {
            content,
            tool_calls,
        });
    }

    /// Appends the result of a tool call.
    #[inline]
    pub fn push_tool_result(&mut self, result: ToolCallResult) {
        self.push(ChatMessage::Tool(result));
    }

    /// Returns the messages in order.
    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Consumes the conversation, returning its messages.
    #[inline]
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}
