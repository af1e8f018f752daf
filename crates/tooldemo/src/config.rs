//! Run configuration, read from the environment.

use std::env;
use std::fmt::{self, Debug};

use tooldemo_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

/// The variable the API key is read from unless overridden.
pub const DEFAULT_API_KEY_VAR: &str = "HELICONE_CONTROL_PLANE_API_KEY";

/// The key used when no credential is configured.
pub const FALLBACK_API_KEY: &str = "fake-api-key";

/// The gateway endpoint used unless overridden.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/ai";

/// The model used unless overridden.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const DEFAULT_MAX_TOKENS: u32 = 400;
const DEFAULT_FOLLOWUP_TEMPERATURE: f64 = 0.9;

const API_KEY_VAR_VAR: &str = "GATEWAY_API_KEY_VAR";
const BASE_URL_VAR: &str = "GATEWAY_BASE_URL";
const MODEL_VAR: &str = "GATEWAY_MODEL";
const STREAM_FIRST_VAR: &str = "GATEWAY_STREAM_FIRST";

/// Where the API key comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKeySource {
    var: String,
}

impl ApiKeySource {
    /// Creates a source reading the variable `var`.
    #[inline]
    pub fn new<S: Into<String>>(var: S) -> Self {
        Self { var: var.into() }
    }

    /// Returns the name of the variable.
    #[inline]
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Resolves the key through `lookup`.
    ///
    /// A missing or empty variable yields [`FALLBACK_API_KEY`]. The value is
    /// used verbatim otherwise.
    pub fn resolve<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        non_empty(lookup(&self.var))
            .unwrap_or_else(|| FALLBACK_API_KEY.to_owned())
    }
}

impl Default for ApiKeySource {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY_VAR)
    }
}

/// Everything a run needs to know.
#[derive(Clone, PartialEq)]
pub struct DemoConfig {
    /// Base URL of the gateway, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model requested from the gateway.
    pub model: String,
    /// Token budget of the first request.
    pub max_tokens: u32,
    /// Sampling temperature of the follow-up request.
    pub followup_temperature: f64,
    /// Whether the first request is streamed too.
    pub stream_first_response: bool,
    api_key: String,
}

impl DemoConfig {
    /// Loads the configuration from the process environment, after
    /// hydrating it from a `.env` file in the working directory if one
    /// exists.
    pub fn from_env() -> Self {
        load_dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_source = non_empty(lookup(API_KEY_VAR_VAR))
            .map(ApiKeySource::new)
            .unwrap_or_default();
        let api_key = key_source.resolve(&lookup);
        if api_key == FALLBACK_API_KEY {
            debug!("`{}` is not set, using a placeholder", key_source.var());
        }

        Self {
            base_url: non_empty(lookup(BASE_URL_VAR))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: non_empty(lookup(MODEL_VAR))
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            max_tokens: DEFAULT_MAX_TOKENS,
            followup_temperature: DEFAULT_FOLLOWUP_TEMPERATURE,
            stream_first_response: lookup(STREAM_FIRST_VAR)
                .is_some_and(|value| is_truthy(&value)),
            api_key,
        }
    }

    /// Returns the API key.
    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns `true` if no credential was configured.
    #[inline]
    pub fn uses_fallback_api_key(&self) -> bool {
        self.api_key == FALLBACK_API_KEY
    }

    /// Builds the client configuration.
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .build()
    }
}

impl Default for DemoConfig {
    #[inline]
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Debug for DemoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("followup_temperature", &self.followup_temperature)
            .field("stream_first_response", &self.stream_first_response)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("ignoring malformed .env file: {err}"),
    }
}

#[inline]
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[inline]
fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
