use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tooldemo_core::tool::{Error as ToolError, Tool, parameter_schema_for};

pub(super) const NAME: &str = "get_local_time";

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LocalTimeParameters {
    #[schemars(description = "City and country e.g. New York, USA")]
    location: String,
}

/// A mocked wall-clock reading.
#[derive(Debug, Serialize)]
pub struct LocalTime {
    time: &'static str,
    timezone: &'static str,
    location: String,
}

/// A tool telling the local time at a location. It doesn't consult any
/// clock.
pub struct LocalTimeTool {
    parameter_schema: Value,
}

impl LocalTimeTool {
    /// Creates a new local time tool.
    #[inline]
    pub fn new() -> Self {
        LocalTimeTool {
            parameter_schema: parameter_schema_for::<LocalTimeParameters>(),
        }
    }
}

impl Default for LocalTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for LocalTimeTool {
    type Input = LocalTimeParameters;
    type Output = LocalTime;

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get the current time in a given location."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: LocalTimeParameters,
    ) -> Result<LocalTime, ToolError> {
        Ok(LocalTime {
            time: "14:30",
            timezone: "UTC+2",
            location: input.location,
        })
    }
}
