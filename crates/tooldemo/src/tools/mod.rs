//! The built-in tools that models can use.
//!
//! The set is closed: [`BuiltinTool`] names every tool there is, and
//! [`BuiltinTools`] answers a call by matching on it exhaustively. A call
//! naming anything else fails with an `UnknownTool` error.

mod local_time;
mod weather;

use tooldemo_core::tool::{Error as ToolError, Tool, ToolResult, Toolbox};
use tooldemo_model::{ModelTool, ToolCall};

pub use local_time::LocalTimeTool;
pub use weather::WeatherTool;

/// Names a built-in tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    /// `get_weather`, see [`WeatherTool`].
    Weather,
    /// `get_local_time`, see [`LocalTimeTool`].
    LocalTime,
}

impl BuiltinTool {
    /// Every built-in tool, in the order they are offered to the model.
    pub const ALL: [BuiltinTool; 2] =
        [BuiltinTool::Weather, BuiltinTool::LocalTime];

    /// Looks up a tool by the name the model uses for it.
    pub fn from_name(name: &str) -> Result<Self, ToolError> {
        match name {
            weather::NAME => Ok(BuiltinTool::Weather),
            local_time::NAME => Ok(BuiltinTool::LocalTime),
            _ => Err(ToolError::unknown_tool(name)),
        }
    }

    /// Returns the name the model uses for the tool.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::Weather => weather::NAME,
            BuiltinTool::LocalTime => local_time::NAME,
        }
    }
}

/// The toolbox holding every [`BuiltinTool`].
#[derive(Default)]
pub struct BuiltinTools {
    weather: WeatherTool,
    local_time: LocalTimeTool,
}

impl BuiltinTools {
    /// Creates the toolbox.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn definition(&self, tool: BuiltinTool) -> ModelTool {
        match tool {
            BuiltinTool::Weather => self.weather.definition(),
            BuiltinTool::LocalTime => self.local_time.definition(),
        }
    }
}

impl Toolbox for BuiltinTools {
    fn definitions(&self) -> Vec<ModelTool> {
        BuiltinTool::ALL
            .into_iter()
            .map(|tool| self.definition(tool))
            .collect()
    }

    fn dispatch(&self, tool_call: &ToolCall) -> ToolResult {
        match BuiltinTool::from_name(&tool_call.name)? {
            BuiltinTool::Weather => self.weather.invoke(&tool_call.arguments),
            BuiltinTool::LocalTime => {
                self.local_time.invoke(&tool_call.arguments)
            }
        }
    }
}
