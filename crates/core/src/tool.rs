//! Tool call supports.

mod dispatcher;
mod error;

use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tooldemo_model::{ModelTool, ToolCall};

pub use dispatcher::{Dispatcher, FailurePolicy};
pub use error::{Error, ErrorKind};

/// The result of a tool call: the JSON-serialized output on success.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Implementations of this trait should be stateless. The input is a typed
/// struct deserialized from the argument payload the model sends, so any
/// payload that doesn't match the declared schema is rejected before the
/// tool runs.
pub trait Tool {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned;

    /// The type of output that the tool produces.
    type Output: Serialize;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    fn parameter_schema(&self) -> &Value;

    /// Executes the tool with the given input.
    fn execute(&self, input: Self::Input) -> Result<Self::Output, Error>;

    /// Returns the definition sent to the model.
    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameter_schema().clone(),
            strict: true,
        }
    }

    /// Parses `arguments`, executes the tool and serializes its output.
    fn invoke(&self, arguments: &str) -> ToolResult {
        let input = parse_arguments::<Self::Input>(arguments)?;
        let output = self.execute(input)?;
        serde_json::to_string(&output).map_err(|err| {
            Error::execution_error()
                .with_reason(format!("failed to serialize output: {err}"))
        })
    }
}

/// A closed set of tools that the model may call.
pub trait Toolbox {
    /// Returns the definitions of every tool in the set.
    fn definitions(&self) -> Vec<ModelTool>;

    /// Runs the tool that `tool_call` names.
    ///
    /// Implementations must return an [`ErrorKind::UnknownTool`] error for
    /// names outside the set.
    fn dispatch(&self, tool_call: &ToolCall) -> ToolResult;
}

/// Parses a raw argument payload into the typed input of a tool.
///
/// An empty payload is treated as an empty object.
pub fn parse_arguments<T: DeserializeOwned>(
    arguments: &str,
) -> Result<T, Error> {
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(arguments).map_err(|err| {
        let reason = if err.is_data() {
            format!("arguments don't match the schema: {err}")
        } else {
            format!("arguments are not valid JSON: {err}")
        };
        Error::invalid_input().with_reason(reason)
    })
}

/// Builds the parameter schema for a tool input type.
///
/// The generated schema is trimmed to the shape models expect: an object
/// schema without the `$schema` and `title` annotations.
pub fn parameter_schema_for<T: JsonSchema>() -> Value {
    let mut schema = schema_for!(T).to_value();
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}
