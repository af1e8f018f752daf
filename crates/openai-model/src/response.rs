use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tooldemo_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{
    ChatCompletion, ChatCompletionChunk, ToolCall, into_model_tool_call,
    parse_finish_reason,
};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Tool calls are assembled from indexed deltas, and only emitted once
    // the choice has finished, so their arguments are complete.
    tool_calls: Vec<ToolCall>,
    pending_events: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn finish(&mut self, finish_reason: Option<ModelFinishReason>) {
        self.finished = true;
        for tool_call in self.tool_calls.drain(..) {
            self.pending_events.push_back(ModelResponseEvent::ToolCall(
                into_model_tool_call(tool_call),
            ));
        }
        if let Some(finish_reason) = finish_reason {
            self.pending_events
                .push_back(ModelResponseEvent::Completed(finish_reason));
        }
    }

    fn merge_tool_call(&mut self, tool_call: ToolCall) {
        let Some(partial_tool_call) = self
            .tool_calls
            .iter_mut()
            .find(|t| t.index == tool_call.index)
        else {
            self.tool_calls.push(tool_call);
            return;
        };
        // Patch the partial tool call. Some servers repeat the id and type
        // on every delta, so those are only taken once.
        if let Some(id) = tool_call.id.filter(|id| !id.is_empty()) {
            partial_tool_call.id.get_or_insert(id);
        }
        if let Some(ty) = tool_call.r#type {
            partial_tool_call.r#type.get_or_insert(ty);
        }
        if let Some(function) = tool_call.function {
            match partial_tool_call.function {
                Some(ref mut partial_func) => {
                    if let Some(name) = function.name {
                        partial_func
                            .name
                            .get_or_insert_default()
                            .push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial_func
                            .arguments
                            .get_or_insert_default()
                            .push_str(&arguments);
                    }
                }
                None => partial_tool_call.function = Some(function),
            }
        }
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A response from an OpenAI-compatible server.
    ///
    /// Streamed bodies are decoded lazily as events are polled; complete
    /// bodies are decoded upfront and replayed as the same kind of events.
    pub struct OpenAIResponse {
        buffered_events: VecDeque<ModelResponseEvent>,
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_events: Default::default(),
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            buffered_events: Default::default(),
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }

    pub(crate) fn from_completion(
        completion: ChatCompletion,
    ) -> Result<Self, Error> {
        trace!("got completion: {}", completion.id);
        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(Error::new(
                "completion has no choices",
                ErrorKind::MalformedResponse,
            ));
        };

        let mut buffered_events = VecDeque::new();
        if let Some(content) = choice.message.content.filter(|c| !c.is_empty())
        {
            buffered_events.push_back(ModelResponseEvent::MessageDelta(content));
        }
        for tool_call in choice.message.tool_calls.unwrap_or_default() {
            buffered_events.push_back(ModelResponseEvent::ToolCall(
                into_model_tool_call(tool_call),
            ));
        }
        if let Some(finish_reason) = choice.finish_reason {
            buffered_events.push_back(ModelResponseEvent::Completed(
                parse_finish_reason(&finish_reason),
            ));
        }

        Ok(Self {
            buffered_events,
            next_event_fut: None,
        })
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        if let Some(event) = this.buffered_events.pop_front() {
            return Poll::Ready(Ok(Some(event)));
        }
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        // The order of events is important. Message deltas are emitted as
        // they arrive, then the assembled tool calls, and finally the
        // finish reason if any.
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.finish(None);
                continue;
            }
            Err(err) => {
                return Err(Error::new(
                    format!("failed to read event stream: {err:?}"),
                    ErrorKind::Transport,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.finish(None);
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
        // Some servers send preamble chunks without an id.
        if !chunk.id.is_empty()
            && partial_state.id.get_or_insert_with(|| chunk.id.clone())
                != &chunk.id
        {
            return Err(Error::new(
                "chunk id mismatch",
                ErrorKind::MalformedResponse,
            ));
        }

        // Usage-only chunks carry no choices.
        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };

        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            partial_state
                .pending_events
                .push_back(ModelResponseEvent::MessageDelta(content));
        }
        for tool_call in choice.delta.tool_calls.unwrap_or_default() {
            partial_state.merge_tool_call(tool_call);
        }
        if let Some(finish_reason) = choice.finish_reason {
            partial_state.finish(Some(parse_finish_reason(&finish_reason)));
        }
    }
}
