//! Provider-neutral types for chat completions with tool calling.
//!
//! This crate describes what a chat-completion request looks like, what
//! a response streams back, and the contract a model provider fulfills.
//! It doesn't talk to any network by itself; concrete providers (such as
//! an OpenAI-compatible gateway client) live in their own crates and
//! translate these types to their wire formats.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
