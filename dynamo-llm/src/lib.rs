//! Dynamo LLM - upstream client for the Anthropic Messages API.
//!
//! Request/response and SSE-streaming transport only; everything shape-translation
//! related (chat-completion vs native surface, finish-reason mapping) lives in
//! `dynamo-api` so this crate stays a thin, provider-specific HTTP client.

mod error;
pub mod providers;
pub mod streaming;

pub use error::LlmError;
pub use providers::anthropic::{types, AnthropicClient};
