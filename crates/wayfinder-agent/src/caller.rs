//! The model caller seam.
//!
//! The workflow never talks to an HTTP client directly.  It hands a
//! [`PromptPayload`] to a [`ModelCaller`] and gets text back, which keeps the
//! stages testable with scripted callers.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LlmClient, Message};

/// Maximum tokens requested for a label-style classification answer.
const CLASSIFICATION_MAX_TOKENS: u32 = 8;

/// What kind of output a payload asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStyle {
    /// A single label; sampled at temperature zero so retries agree.
    Label,
    /// Free-form prose.
    FreeForm,
}

/// A structured prompt handed to the model caller.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPayload {
    /// Requested output shape.
    pub style: OutputStyle,
    /// Model identifier; empty selects the caller's default model.
    pub model: String,
    /// System instructions.
    pub system: String,
    /// User-turn content.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation budget.
    pub max_tokens: u32,
}

impl PromptPayload {
    /// A label-style classification payload (temperature fixed at zero).
    pub fn label(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            style: OutputStyle::Label,
            model: String::new(),
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            max_tokens: CLASSIFICATION_MAX_TOKENS,
        }
    }

    /// A free-form generation payload.
    pub fn free_form(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            style: OutputStyle::FreeForm,
            model: String::new(),
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    /// Select a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the sampling temperature.  Label payloads stay at zero.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        if self.style == OutputStyle::FreeForm {
            self.temperature = temperature;
        }
        self
    }

    /// Override the generation budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Translate into a provider-agnostic chat request.
    pub fn to_chat_request(&self) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::system(&self.system), Message::user(&self.user)],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }
}

/// Anything that turns a prompt payload into generated text.
///
/// Implementations own their retry policy; the workflow only sees the final
/// success or failure.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    /// Generate text for the payload.
    async fn generate(&self, payload: &PromptPayload) -> Result<String>;
}

#[async_trait]
impl ModelCaller for LlmClient {
    async fn generate(&self, payload: &PromptPayload) -> Result<String> {
        let completion = self.chat(&payload.to_chat_request()).await?;

        tracing::debug!(
            provider = self.provider().as_str(),
            style = ?payload.style,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "model call complete"
        );

        if completion.text.trim().is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        Ok(completion.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn label_payload_is_deterministic() {
        let payload = PromptPayload::label("classify", "Plan 3 days in Rome").with_temperature(0.9);
        assert_eq!(payload.temperature, 0.0);
        assert_eq!(payload.max_tokens, CLASSIFICATION_MAX_TOKENS);
        assert_eq!(payload.style, OutputStyle::Label);
    }

    #[test]
    fn free_form_payload_accepts_overrides() {
        let payload = PromptPayload::free_form("system", "user")
            .with_temperature(0.3)
            .with_max_tokens(512)
            .with_model("gpt-4o");
        assert_eq!(payload.temperature, 0.3);
        assert_eq!(payload.max_tokens, 512);
        assert_eq!(payload.model, "gpt-4o");
    }

    #[test]
    fn chat_request_carries_system_then_user() {
        let request = PromptPayload::label("sys", "usr").to_chat_request();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "usr");
        assert_eq!(request.temperature, Some(0.0));
    }
}
