//! Application configuration.
//!
//! Loaded from a TOML file with one section per concern.  Every field has a
//! default, so an empty file (or no file at all) yields a working setup that
//! talks to OpenAI with the key from `OPENAI_API_KEY`.
//!
//! ```toml
//! [llm]
//! provider = "anthropic"
//! model = "claude-sonnet-4-20250514"
//!
//! [knowledge]
//! dir = "knowledge"
//!
//! [workflow]
//! top_k = 5
//! classifier = "keywords"
//!
//! [workflow.confidence]
//! retrieval = 0.5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use wayfinder_agent::{LlmClientConfig, LlmProvider};
use wayfinder_intent::WorkflowConfig;
use wayfinder_web::WebConfig;

use crate::helpers::env_non_empty;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "wayfinder.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[llm]`: which model endpoint to call and where its key lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// `openai` (also any OpenAI-compatible endpoint) or `anthropic`.
    pub provider: String,
    /// Default model when the workflow leaves the model name empty.
    pub model: String,
    /// Override the provider's API base URL.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            base_url: None,
            api_key_env: None,
            request_timeout_secs: 30,
        }
    }
}

impl LlmSection {
    pub fn provider(&self) -> Result<LlmProvider> {
        Ok(self.provider.parse::<LlmProvider>()?)
    }

    /// `api_key_env`, or the provider's conventional variable.
    pub fn key_variable(&self) -> Result<String> {
        if let Some(name) = self.api_key_env.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(name.trim().to_owned());
        }
        Ok(match self.provider()? {
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
        .to_owned())
    }
}

/// `[providers]`: real-time data endpoints.  Unset URLs use the public APIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    pub geocoding_url: Option<String>,
    pub forecast_url: Option<String>,
    pub overpass_url: Option<String>,
    pub weather_retries: Option<u32>,
    pub poi_retries: Option<u32>,
}

/// `[knowledge]`: where the markdown knowledge base lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSection {
    pub dir: PathBuf,
}

impl Default for KnowledgeSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("knowledge"),
        }
    }
}

/// `[web]`: mirrors [`WebConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub bind_addr: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Default for WebSection {
    fn default() -> Self {
        let web = WebConfig::default();
        Self {
            bind_addr: web.bind_addr,
            port: web.port,
            cors_origin: web.cors_origin,
        }
    }
}

impl From<&WebSection> for WebConfig {
    fn from(section: &WebSection) -> Self {
        Self {
            bind_addr: section.bind_addr.clone(),
            port: section.port,
            cors_origin: section.cors_origin.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub providers: ProvidersSection,
    pub knowledge: KnowledgeSection,
    pub web: WebSection,
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or
    /// fall back to defaults.  An explicit path that does not exist is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    tracing::debug!("no config file, using defaults");
                    return Ok((Self::default(), None));
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok((config, Some(path)))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check everything that can be checked without network access.
    pub fn validate(&self) -> Result<()> {
        self.llm.provider()?;
        if self.llm.model.trim().is_empty() {
            bail!("[llm] model must not be empty");
        }
        if self.llm.request_timeout_secs == 0 {
            bail!("[llm] request_timeout_secs must be greater than zero");
        }

        let urls = [
            ("llm.base_url", &self.llm.base_url),
            ("providers.geocoding_url", &self.providers.geocoding_url),
            ("providers.forecast_url", &self.providers.forecast_url),
            ("providers.overpass_url", &self.providers.overpass_url),
        ];
        for (name, value) in urls {
            if let Some(raw) = value {
                validate_url(name, raw)?;
            }
        }

        self.workflow.validate()?;
        Ok(())
    }

    /// Resolve the LLM client configuration, reading the API key from the
    /// environment.
    pub fn llm_client_config(&self) -> Result<LlmClientConfig> {
        let variable = self.llm.key_variable()?;
        let key = env_non_empty(&variable).with_context(|| {
            format!(
                "no API key for the {} provider: set {variable}",
                self.llm.provider
            )
        })?;

        let mut config = match self.llm.provider()? {
            LlmProvider::Anthropic => LlmClientConfig::anthropic(key, &self.llm.model),
            LlmProvider::OpenAI => LlmClientConfig::openai(key, &self.llm.model),
        }
        .with_request_timeout(Duration::from_secs(self.llm.request_timeout_secs));

        if let Some(base_url) = &self.llm.base_url {
            config.base_url = base_url.trim_end_matches('/').to_owned();
        }
        config.max_tokens = self.workflow.synthesis_max_tokens;
        Ok(config)
    }
}

fn validate_url(name: &str, raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).with_context(|| format!("{name} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{name} must use http or https, got `{}`", parsed.scheme());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use wayfinder_intent::ClassifierMode;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.knowledge.dir, PathBuf::from("knowledge"));
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.workflow.top_k, 5);
        assert_eq!(config.llm.key_variable().unwrap(), "OPENAI_API_KEY");
    }

    #[test]
    fn sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [llm]
            provider = "anthropic"
            model = "claude-sonnet-4-20250514"

            [providers]
            overpass_url = "http://localhost:8080/api/interpreter"

            [web]
            port = 8088

            [workflow]
            top_k = 3
            classifier = "keywords"

            [workflow.confidence]
            retrieval = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.key_variable().unwrap(), "ANTHROPIC_API_KEY");
        assert_eq!(config.web.port, 8088);
        assert_eq!(config.web.bind_addr, "127.0.0.1");
        assert_eq!(config.workflow.top_k, 3);
        assert_eq!(config.workflow.classifier, ClassifierMode::Keywords);
        assert_eq!(config.workflow.confidence.retrieval, 0.5);
        assert_eq!(config.workflow.confidence.weather, 0.2);
    }

    #[test]
    fn rejects_bad_values() {
        for text in [
            "[llm]\nprovider = \"mystery\"",
            "[llm]\nbase_url = \"not a url\"",
            "[providers]\nforecast_url = \"ftp://example.com/forecast\"",
            "[workflow]\ntop_k = 0",
            "[workflow.confidence]\nfloor = 1.5",
        ] {
            assert!(AppConfig::from_toml(text).is_err(), "accepted: {text}");
        }
    }

    #[test]
    fn explicit_key_variable_wins() {
        let config = AppConfig::from_toml("[llm]\napi_key_env = \"TRIP_LLM_KEY\"").unwrap();
        assert_eq!(config.llm.key_variable().unwrap(), "TRIP_LLM_KEY");
    }

    #[test]
    fn missing_key_is_reported() {
        let config = AppConfig::from_toml(
            "[llm]\napi_key_env = \"WAYFINDER_TEST_KEY_THAT_IS_NEVER_SET\"",
        )
        .unwrap();
        let err = config.llm_client_config().unwrap_err();
        assert!(err.to_string().contains("WAYFINDER_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn loads_from_file_and_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[knowledge]\ndir = \"guides\"\n\n[web]\nport = 9000").unwrap();

        let (config, path) = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(path.as_deref(), Some(file.path()));
        assert_eq!(config.knowledge.dir, PathBuf::from("guides"));

        let reparsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.web.port, 9000);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
