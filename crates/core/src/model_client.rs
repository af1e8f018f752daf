use std::future::poll_fn;
use std::pin::Pin;

use tooldemo_model::{
    ModelFinishReason, ModelProvider, ModelRequest, ModelResponse,
    ModelResponseEvent, ToolCall,
};
use tracing::Instrument;

/// A thin wrapper around a model provider that turns response events into
/// text fragments and complete responses.
#[derive(Clone, Debug)]
pub struct ModelClient<P> {
    provider: P,
}

impl<P: ModelProvider> ModelClient<P> {
    /// Creates a client for `provider`.
    #[inline]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns the underlying provider.
    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Sends a request and returns its response as a stream of text
    /// fragments.
    pub async fn stream(
        &self,
        req: ModelRequest,
    ) -> Result<ResponseStream<P::Response>, P::Error> {
        trace!("got a request: {:?}", req);
        let fut = self.provider.send_request(&req);
        match fut.instrument(trace_span!("model client req")).await {
            Ok(resp) => Ok(ResponseStream::new(resp)),
            Err(err) => {
                error!("got an error: {err:?}");
                Err(err)
            }
        }
    }

    /// Sends a request and waits for the complete response.
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse, P::Error> {
        let mut stream = self.stream(req).await?;
        while stream.next_fragment().await?.is_some() {}
        Ok(stream.into_response())
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelClientResponse {
    /// The concatenated text of the response.
    pub transcript: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// A response being received, viewed as a sequence of text fragments.
///
/// The sequence is finite and can't be restarted. Dropping the stream
/// before it's exhausted stops receiving further events.
pub struct ResponseStream<R> {
    resp: Pin<Box<R>>,
    received: ModelClientResponse,
    exhausted: bool,
}

impl<R: ModelResponse> ResponseStream<R> {
    fn new(resp: R) -> Self {
        trace!("start receiving events");
        Self {
            resp: Box::pin(resp),
            received: Default::default(),
            exhausted: false,
        }
    }

    /// Pulls the next text fragment, or `None` once the response has
    /// completed.
    ///
    /// Tool calls and the finish reason are collected along the way and
    /// are available from [`ResponseStream::tool_calls`] and
    /// [`ResponseStream::into_response`].
    pub async fn next_fragment(&mut self) -> Result<Option<String>, R::Error> {
        while !self.exhausted {
            let event_or_err =
                poll_fn(|cx| self.resp.as_mut().poll_next_event(cx)).await;
            let event = match event_or_err {
                Ok(Some(event)) => event,
                Ok(None) => {
                    trace!("finished a request");
                    self.exhausted = true;
                    break;
                }
                Err(err) => {
                    error!("got an error: {err:?}");
                    self.exhausted = true;
                    return Err(err);
                }
            };
            trace!("got an event: {event:?}");

            match event {
                ModelResponseEvent::MessageDelta(delta) => {
                    self.received.transcript.push_str(&delta);
                    return Ok(Some(delta));
                }
                ModelResponseEvent::ToolCall(tool_call) => {
                    self.received.tool_calls.push(tool_call);
                }
                ModelResponseEvent::Completed(reason) => {
                    self.received.finish_reason = Some(reason);
                }
            }
        }
        Ok(None)
    }

    /// Returns the text received so far.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.received.transcript
    }

    /// Returns the tool calls received so far.
    #[inline]
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.received.tool_calls
    }

    /// Consumes the stream, returning what has been received.
    #[inline]
    pub fn into_response(self) -> ModelClientResponse {
        self.received
    }
}
