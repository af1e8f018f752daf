use tooldemo_model::{ToolCall, ToolCallResult};

use crate::conversation::Conversation;
use crate::tool::{Error, ToolResult, Toolbox};

/// What to do when a single tool call fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    /// Answer the call with an error payload and go on with the others.
    #[default]
    Report,
    /// Stop dispatching and return the error. The conversation is left as
    /// it was before the dispatch.
    Abort,
}

type ResultObserver<'a> = &'a dyn Fn(&ToolCall, &ToolResult);

/// Runs the tool calls of one assistant turn and records the exchange in
/// the conversation.
pub struct Dispatcher<'a, B: ?Sized> {
    toolbox: &'a B,
    policy: FailurePolicy,
    on_result: Option<ResultObserver<'a>>,
}

impl<'a, B: Toolbox + ?Sized> Dispatcher<'a, B> {
    /// Creates a dispatcher over `toolbox`.
    #[inline]
    pub fn new(toolbox: &'a B) -> Self {
        Self {
            toolbox,
            policy: FailurePolicy::default(),
            on_result: None,
        }
    }

    /// Sets the failure policy.
    #[inline]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches a callback invoked with every call and its result.
    #[inline]
    pub fn on_result(mut self, on_result: ResultObserver<'a>) -> Self {
        self.on_result = Some(on_result);
        self
    }

    /// Dispatches `tool_calls` requested by an assistant turn with
    /// `content`.
    ///
    /// With no tool calls, the conversation is left untouched. Otherwise the
    /// assistant turn is appended, followed by exactly one tool-result
    /// message per call, in the order received and carrying the call's id.
    /// Nothing is appended if the dispatch aborts. Returns the number of
    /// results appended.
    pub fn dispatch(
        &self,
        conversation: &mut Conversation,
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Result<usize, Error> {
        if tool_calls.is_empty() {
            return Ok(0);
        }

        let span = debug_span!("tool dispatcher");
        let _enter = span.enter();

        let mut results = Vec::with_capacity(tool_calls.len());
        for tool_call in &tool_calls {
            trace!(
                "running tool `{}` ({}) with args: {}",
                tool_call.name, tool_call.id, tool_call.arguments
            );
            let result = self.toolbox.dispatch(tool_call);
            if let Some(on_result) = self.on_result {
                on_result(tool_call, &result);
            }

            let content = match result {
                Ok(content) => content,
                Err(err) => {
                    warn!("tool call {} failed: {err}", tool_call.id);
                    if self.policy == FailurePolicy::Abort {
                        return Err(err);
                    }
                    err.to_payload()
                }
            };
            results.push(ToolCallResult {
                id: tool_call.id.clone(),
                name: tool_call.name.clone(),
                content,
            });
        }

        let count = results.len();
        conversation.push_assistant(content, tool_calls);
        for result in results {
            conversation.push_tool_result(result);
        }
        Ok(count)
    }
}
