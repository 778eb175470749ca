//! LLM integration layer.
//!
//! - [`types`] -- Core data types (messages, requests, completions).
//! - [`client`] -- HTTP client for Anthropic and OpenAI APIs.

pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use types::{ChatCompletion, ChatRequest, Message, Role, Usage};
