use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use serde_json::json;
use tokio::time::{Sleep, sleep};
use tooldemo_model::{
    ChatMessage, ErrorKind, ModelFinishReason, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ModelTool, ToolCall, ToolCallResult,
};

#[derive(Debug)]
struct WeatherBotError(ErrorKind);

impl Display for WeatherBotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "weather bot: {}", self.0)
    }
}

impl Error for WeatherBotError {}

impl ModelProviderError for WeatherBotError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Replays prepared events, one per millisecond.
struct WeatherBotResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for WeatherBotResponse {
    type Error = WeatherBotError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.events.pop_front()))
    }
}

/// A model that looks up the weather when it is offered `get_weather`, and
/// then reads the tool result back to the user.
struct WeatherBot;

impl WeatherBot {
    fn answer(
        req: &ModelRequest,
    ) -> Result<Vec<ModelResponseEvent>, WeatherBotError> {
        let can_look_up =
            req.tools.iter().any(|tool| tool.name == "get_weather");
        match req.messages.last() {
            Some(ChatMessage::User(_)) if can_look_up => Ok(vec![
                ModelResponseEvent::ToolCall(ToolCall {
                    id: "call_1".to_owned(),
                    name: "get_weather".to_owned(),
                    arguments: r#"{"location":"Tokyi"}"#.to_owned(),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]),
            Some(ChatMessage::User(_)) => Ok(vec![
                ModelResponseEvent::MessageDelta("I can't ".to_owned()),
                ModelResponseEvent::MessageDelta("check that.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]),
            Some(ChatMessage::Tool(result)) => Ok(vec![
                ModelResponseEvent::MessageDelta("Here it is: ".to_owned()),
                ModelResponseEvent::MessageDelta(result.content.clone()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]),
            Some(_) => Err(WeatherBotError(ErrorKind::Other)),
            None => Err(WeatherBotError(ErrorKind::MalformedResponse)),
        }
    }
}

impl ModelProvider for WeatherBot {
    type Error = WeatherBotError;
    type Response = WeatherBotResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(Self::answer(req).map(|events| WeatherBotResponse {
            events: events.into(),
            sleep: None,
        }))
    }
}

async fn collect(
    resp: WeatherBotResponse,
) -> (String, Vec<ToolCall>, Option<ModelFinishReason>) {
    let mut resp = Box::pin(resp);
    let mut text = String::new();
    let mut tool_calls = vec![];
    let mut finish_reason = None;
    while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
        .await
        .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(tool_call) => {
                tool_calls.push(tool_call);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }
    (text, tool_calls, finish_reason)
}

fn weather_tool() -> ModelTool {
    ModelTool {
        name: "get_weather".to_owned(),
        description: "Get current temperature for a given location."
            .to_owned(),
        parameters: json!({"type": "object"}),
        strict: true,
    }
}

#[tokio::test]
async fn test_tool_call_round_trip() {
    let mut req = ModelRequest {
        messages: vec![ChatMessage::User("Weather in Tokyi?".to_owned())],
        tools: vec![weather_tool()],
        ..Default::default()
    };
    let resp = WeatherBot.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;
    assert!(text.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
    assert_eq!(tool_calls.len(), 1);

    let tool_call = tool_calls[0].clone();
    req.messages.push(ChatMessage::Tool(ToolCallResult {
        id: tool_call.id.clone(),
        name: tool_call.name.clone(),
        content: "22°C".to_owned(),
    }));
    req.messages.insert(
        1,
        ChatMessage::Assistant {
            content: None,
            tool_calls: vec![tool_call],
        },
    );
    req.stream = true;
    let resp = WeatherBot.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;
    assert_eq!(text, "Here it is: 22°C");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_answer_without_tools() {
    let req = ModelRequest {
        messages: vec![ChatMessage::User("Weather in Tokyi?".to_owned())],
        ..Default::default()
    };
    let resp = WeatherBot.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;
    assert_eq!(text, "I can't check that.");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_errors() {
    let Err(err) = WeatherBot.send_request(&ModelRequest::default()).await
    else {
        panic!("expected an error");
    };
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(err.to_string(), "weather bot: malformed response");

    let req = ModelRequest {
        messages: vec![ChatMessage::System("Be brief.".to_owned())],
        ..Default::default()
    };
    let Err(err) = WeatherBot.send_request(&req).await else {
        panic!("expected an error");
    };
    assert_eq!(err.kind(), ErrorKind::Other);
}
