//! A small demo that lets a chat model call two mocked tools through an
//! OpenAI-compatible gateway and streams the final answer to the terminal.
//!
//! The binary wires everything together. The library half holds the pieces
//! that are worth testing on their own: the configuration loader and the
//! built-in tools.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod tools;

pub use config::{ApiKeySource, DemoConfig};
pub use tools::{BuiltinTool, BuiltinTools};
