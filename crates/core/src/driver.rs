mod builder;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::io::{self, Write};

use tooldemo_model::{
    ModelProvider, ModelProviderError, ModelRequest, ToolCall,
};

use crate::conversation::Conversation;
use crate::model_client::ModelClient;
use crate::tool::{self, Dispatcher, FailurePolicy, ToolResult, Toolbox};
pub use builder::DriverBuilder;

type StageObserver = Box<dyn Fn(Stage) + Send + Sync>;
type ToolCallObserver = Box<dyn Fn(&ToolCall, &ToolResult) + Send + Sync>;

/// The stages a run goes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing has been sent yet.
    #[default]
    Start,
    /// The first request has been sent.
    AwaitingFirstResponse,
    /// Requested tool calls are being run.
    Dispatching,
    /// The follow-up request has been sent.
    AwaitingFollowup,
    /// The follow-up answer is being written out.
    Streaming,
    /// The run has finished.
    Done,
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model answered directly, so no follow-up was requested.
    NoToolCalls {
        /// The text of the first response.
        content: String,
    },
    /// Tool calls were answered and the follow-up was streamed out.
    Answered {
        /// Everything that was written to the output.
        transcript: String,
    },
}

/// Error type for [`Driver::run`].
#[derive(Debug)]
pub enum Error {
    /// A request to the model failed.
    Request(Box<dyn ModelProviderError>),
    /// A tool call failed under [`FailurePolicy::Abort`].
    Tool(tool::Error),
    /// Writing the answer to the output failed.
    Output(io::Error),
}

impl Error {
    #[inline]
    fn request<E: ModelProviderError>(err: E) -> Self {
        Error::Request(Box::new(err))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Request(err) => write!(f, "request failed: {err}"),
            Error::Tool(err) => write!(f, "tool call failed: {err}"),
            Error::Output(err) => write!(f, "failed to write output: {err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Request(err) => Some(err.as_ref()),
            Error::Tool(err) => Some(err),
            Error::Output(err) => Some(err),
        }
    }
}

/// Runs one tool-calling exchange with a model.
///
/// A run sends the conversation with the available tools. If the model
/// asks for tool calls, they are answered locally and a second, streamed
/// request produces the final answer, which is written to the output
/// fragment by fragment. A model that answers directly ends the run after
/// the first request.
pub struct Driver<P, B> {
    client: ModelClient<P>,
    toolbox: B,
    model: Option<String>,
    max_tokens: Option<u32>,
    followup_temperature: Option<f64>,
    stream_first_response: bool,
    failure_policy: FailurePolicy,
    on_stage: Option<StageObserver>,
    on_tool_call: Option<ToolCallObserver>,
}

impl<P: ModelProvider, B: Toolbox> Driver<P, B> {
    /// Runs the exchange, appending every message to `conversation` and
    /// writing the streamed answer to `out`.
    pub async fn run<W: Write>(
        &self,
        conversation: &mut Conversation,
        out: &mut W,
    ) -> Result<RunOutcome, Error> {
        self.enter(Stage::Start);
        let tools = self.toolbox.definitions();

        self.enter(Stage::AwaitingFirstResponse);
        let first_req = ModelRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            tools: tools.clone(),
            max_tokens: self.max_tokens,
            temperature: None,
            stream: self.stream_first_response,
        };
        let first = self
            .client
            .send_request(first_req)
            .await
            .map_err(Error::request)?;
        debug!(
            "first response finished ({:?}) with {} tool calls",
            first.finish_reason,
            first.tool_calls.len()
        );

        if first.tool_calls.is_empty() {
            self.enter(Stage::Done);
            return Ok(RunOutcome::NoToolCalls {
                content: first.transcript,
            });
        }

        self.enter(Stage::Dispatching);
        let content = Some(first.transcript).filter(|c| !c.is_empty());
        let on_result = |tool_call: &ToolCall, result: &ToolResult| {
            if let Some(on_tool_call) = &self.on_tool_call {
                on_tool_call(tool_call, result);
            }
        };
        Dispatcher::new(&self.toolbox)
            .with_policy(self.failure_policy)
            .on_result(&on_result)
            .dispatch(conversation, content, first.tool_calls)
            .map_err(Error::Tool)?;

        self.enter(Stage::AwaitingFollowup);
        let followup_req = ModelRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            tools,
            max_tokens: None,
            temperature: self.followup_temperature,
            stream: true,
        };
        let mut stream = self
            .client
            .stream(followup_req)
            .await
            .map_err(Error::request)?;

        self.enter(Stage::Streaming);
        while let Some(fragment) =
            stream.next_fragment().await.map_err(Error::request)?
        {
            out.write_all(fragment.as_bytes()).map_err(Error::Output)?;
            out.flush().map_err(Error::Output)?;
        }
        if !stream.tool_calls().is_empty() {
            warn!(
                "ignoring {} tool calls requested by the follow-up",
                stream.tool_calls().len()
            );
        }

        self.enter(Stage::Done);
        Ok(RunOutcome::Answered {
            transcript: stream.into_response().transcript,
        })
    }

    #[inline]
    fn enter(&self, stage: Stage) {
        trace!("entering stage {stage:?}");
        if let Some(on_stage) = &self.on_stage {
            on_stage(stage);
        }
    }
}
