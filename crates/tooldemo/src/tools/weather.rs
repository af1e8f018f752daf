use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tooldemo_core::tool::{Error as ToolError, Tool, parameter_schema_for};

pub(super) const NAME: &str = "get_weather";

#[derive(Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WeatherParameters {
    #[schemars(description = "City and country e.g. Bogotá, Colombia")]
    location: String,
}

/// A mocked weather report.
#[derive(Debug, Serialize)]
pub struct WeatherReport {
    temperature: &'static str,
    description: String,
}

/// A tool reporting the current weather at a location. The report is
/// always the same.
pub struct WeatherTool {
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates a new weather tool.
    #[inline]
    pub fn new() -> Self {
        WeatherTool {
            parameter_schema: parameter_schema_for::<WeatherParameters>(),
        }
    }
}

impl Default for WeatherTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherTool {
    type Input = WeatherParameters;
    type Output = WeatherReport;

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Get current temperature for a given location."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WeatherParameters,
    ) -> Result<WeatherReport, ToolError> {
        Ok(WeatherReport {
            temperature: "22°C",
            description: format!("Sunny in {}", input.location),
        })
    }
}
