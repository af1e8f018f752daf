use serde::{Deserialize, Serialize};
use tooldemo_model::ToolCall;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCall),
}

/// The preset response for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails instead of producing events.
    #[serde(default)]
    pub fails: bool,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            fails: false,
        }
    }

    /// Creates a `PresetResponse` whose request always fails.
    #[inline]
    pub fn failing() -> Self {
        Self {
            events: vec![],
            fails: true,
        }
    }

    /// Returns the text the response streams, concatenated.
    pub fn full_content(&self) -> String {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresetEvent::MessageDelta(delta) => Some(delta.as_str()),
                PresetEvent::ToolCall(_) => None,
            })
            .collect()
    }
}
