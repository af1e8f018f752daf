//! A model provider for OpenAI-compatible APIs, such as an AI gateway
//! exposing `/chat/completions`.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};
use tooldemo_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use proto::ChatCompletion;
pub use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req, &self.config);
        let stream = req.stream;
        let accept = if stream {
            "text/event-stream"
        } else {
            "application/json"
        };
        let resp_fut = self
            .client
            .post(self.config.chat_completions_url())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, accept)
            .json(&openai_req)
            .send();

        async move {
            let resp = resp_fut.await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Transport)
            })?;
            let resp = check_status(resp).await?;

            if stream {
                check_content_type(&resp, "event-stream")?;
                // Here we got a successful streaming response.
                let chunks = Chunks::from_response(resp);
                let sse = Sse::new(chunks);
                return Ok(OpenAIResponse::from_sse(sse));
            }

            let body = resp.bytes().await.map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::Transport)
            })?;
            let completion = serde_json::from_slice::<ChatCompletion>(&body)
                .map_err(|err| {
                    Error::new(format!("{err}"), ErrorKind::MalformedResponse)
                })?;
            OpenAIResponse::from_completion(completion)
        }
    }
}

async fn check_status(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let kind = if status == StatusCode::TOO_MANY_REQUESTS {
        ErrorKind::RateLimitExceeded
    } else {
        ErrorKind::HttpStatus
    };
    // The body usually explains the failure, but it's best-effort only.
    let body = resp.text().await.unwrap_or_default();
    warn!("request failed with status {status}: {body}");
    Err(Error::new(format!("status {status}: {body}"), kind))
}

fn check_content_type(resp: &Response, subtype: &str) -> Result<(), Error> {
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let is_valid_content_type = content_type
        .and_then(|v| v.parse().ok())
        .map(|m: Mime| m.subtype().as_str() == subtype)
        .unwrap_or(false);
    if !is_valid_content_type {
        return Err(Error::new(
            format!("unexpected content type: {content_type:?}"),
            ErrorKind::MalformedResponse,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::pin::pin;
    use std::thread;

    use tooldemo_model::{
        ChatMessage, ModelFinishReason, ModelResponse, ModelResponseEvent,
    };

    use super::*;

    /// Serves a single canned HTTP response on a loopback port and returns
    /// the base URL.
    fn serve_once(status: &str, content_type: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\n\
             content-type: {content_type}\r\n\
             content-length: {}\r\n\
             connection: close\r\n\r\n{body}",
            body.len()
        );
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(&stream);
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}")
    }

    fn read_request(stream: &TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line.trim_end().is_empty() {
                break;
            }
            let line = line.to_ascii_lowercase();
            if let Some(value) = line.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();
    }

    fn provider(base_url: String) -> OpenAIProvider {
        OpenAIProvider::new(
            OpenAIConfigBuilder::with_api_key("fake-api-key")
                .with_base_url(base_url)
                .build(),
        )
    }

    fn request(stream: bool) -> ModelRequest {
        ModelRequest {
            messages: vec![ChatMessage::User("Hi".to_owned())],
            stream,
            ..Default::default()
        }
    }

    async fn send_err(base_url: String, stream: bool) -> Error {
        match provider(base_url).send_request(&request(stream)).await {
            Ok(_) => panic!("expected the request to fail"),
            Err(err) => err,
        }
    }

    async fn collect_events(resp: OpenAIResponse) -> Vec<ModelResponseEvent> {
        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_error_display() {
        let err = Error::new("status 502 Bad Gateway", ErrorKind::HttpStatus);
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.message(), "status 502 Bad Gateway");
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status: status 502 Bad Gateway"
        );
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let base_url = serve_once(
            "429 Too Many Requests",
            "application/json",
            r#"{"error":"slow down"}"#,
        );
        let err = send_err(base_url, false).await;
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }

    #[tokio::test]
    async fn test_bad_status() {
        let base_url = serve_once("502 Bad Gateway", "text/plain", "upstream");
        let err = send_err(base_url, true).await;
        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.message(), "status 502 Bad Gateway: upstream");
    }

    #[tokio::test]
    async fn test_stream_with_wrong_content_type() {
        let base_url = serve_once("200 OK", "application/json", "{}");
        let err = send_err(base_url, true).await;
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_garbage_completion() {
        let base_url = serve_once("200 OK", "application/json", "not json");
        let err = send_err(base_url, false).await;
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        // The listener is gone, so nothing accepts on that port.
        let err = send_err(format!("http://{addr}"), false).await;
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_complete_response() {
        let base_url = serve_once(
            "200 OK",
            "application/json",
            include_str!("../fixtures/completion_response.json"),
        );
        let resp = provider(base_url)
            .send_request(&request(false))
            .await
            .unwrap_or_else(|err| panic!("request failed: {err}"));
        let events = collect_events(resp).await;
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[2],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[tokio::test]
    async fn test_streamed_response() {
        let base_url = serve_once(
            "200 OK",
            "text/event-stream",
            include_str!("../fixtures/text_response.txt"),
        );
        let resp = provider(base_url)
            .send_request(&request(true))
            .await
            .unwrap_or_else(|err| panic!("request failed: {err}"));
        let text: String = collect_events(resp)
            .await
            .into_iter()
            .filter_map(|event| match event {
                ModelResponseEvent::MessageDelta(delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(text, "It is 22°C and sunny in Tokyi, local time 14:30.");
    }
}
