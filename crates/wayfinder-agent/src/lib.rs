//! Language model caller for Wayfinder.
//!
//! The travel workflow treats text generation as an external collaborator.
//! This crate defines that seam and one production implementation of it:
//!
//! - [`caller`] -- The [`ModelCaller`] trait and the [`PromptPayload`] the
//!   workflow hands to it.
//! - [`llm`] -- A multi-provider HTTP client (Anthropic, OpenAI-compatible).
//! - [`error`] -- Model caller error types.

pub mod caller;
pub mod error;
pub mod llm;

pub use caller::{ModelCaller, OutputStyle, PromptPayload};
pub use error::{AgentError, Result};
pub use llm::{
    ChatCompletion, ChatRequest, LlmClient, LlmClientConfig, LlmProvider, Message, Role, Usage,
};
