use tooldemo_model::{ModelProvider, ToolCall};

use super::{Driver, Stage};
use crate::model_client::ModelClient;
use crate::tool::{FailurePolicy, ToolResult, Toolbox};

/// [`Driver`] builder.
pub struct DriverBuilder<P, B> {
    driver: Driver<P, B>,
}

impl<P: ModelProvider, B: Toolbox> DriverBuilder<P, B> {
    /// Creates a new builder with the specified model provider and tools.
    #[inline]
    pub fn with_model_provider(provider: P, toolbox: B) -> Self {
        Self {
            driver: Driver {
                client: ModelClient::new(provider),
                toolbox,
                model: None,
                max_tokens: None,
                followup_temperature: None,
                stream_first_response: false,
                failure_policy: FailurePolicy::default(),
                on_stage: None,
                on_tool_call: None,
            },
        }
    }

    /// Sets the model for both requests, overriding the provider default.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.driver.model = Some(model.into());
        self
    }

    /// Sets the token budget of the first request.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.driver.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature of the follow-up request.
    #[inline]
    pub fn with_followup_temperature(mut self, temperature: f64) -> Self {
        self.driver.followup_temperature = Some(temperature);
        self
    }

    /// Sets whether the first request is streamed too.
    ///
    /// Either way the first response is received completely before any
    /// tool runs.
    #[inline]
    pub fn stream_first_response(mut self, stream: bool) -> Self {
        self.driver.stream_first_response = stream;
        self
    }

    /// Sets what happens when a single tool call fails.
    #[inline]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.driver.failure_policy = policy;
        self
    }

    /// Attaches a callback to be invoked when the run enters a stage.
    #[inline]
    pub fn on_stage(
        mut self,
        on_stage: impl Fn(Stage) + Send + Sync + 'static,
    ) -> Self {
        self.driver.on_stage = Some(Box::new(on_stage));
        self
    }

    /// Attaches a callback to be invoked after each tool call has run.
    #[inline]
    pub fn on_tool_call(
        mut self,
        on_tool_call: impl Fn(&ToolCall, &ToolResult) + Send + Sync + 'static,
    ) -> Self {
        self.driver.on_tool_call = Some(Box::new(on_tool_call));
        self
    }

    /// Builds the driver.
    #[inline]
    pub fn build(self) -> Driver<P, B> {
        self.driver
    }
}
