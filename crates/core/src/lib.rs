//! Core logic including the conversation state, tool dispatching and the
//! driver that runs a tool-calling exchange with a model.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod driver;
mod model_client;
pub mod tool;

pub use conversation::Conversation;
pub use driver::{Driver, DriverBuilder, Error, RunOutcome, Stage};
pub use model_client::{ModelClient, ModelClientResponse, ResponseStream};
