//! Configuration types for EduForge.
//!
//! Configuration is assembled once at start-up: defaults, then an optional
//! `eduforge.json`, then environment variables. The resulting [`Config`] is
//! immutable and passed explicitly to the pipeline and the web layer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EduError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "eduforge.json";

/// Maximum number of refinement passes per run.
pub const MAX_REFINEMENT_PASSES: u32 = 1;

/// Default model identifier.
fn default_model_name() -> String {
    "llama-3.1-8b-instant".to_string()
}

/// Default sampling temperature for generation and refinement.
const fn default_generation_temperature() -> f32 {
    0.3
}

/// Default sampling temperature for review.
const fn default_review_temperature() -> f32 {
    0.0
}

/// Default bind host for the web server.
fn default_host() -> String {
    "127.0.0.1".to_string()
}

/// Default port for the web server.
const fn default_port() -> u16 {
    5006
}

/// Main configuration for EduForge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Model provider to call.
    #[serde(default)]
    pub provider: LlmProvider,

    /// API key for the provider. Never read from or written to the config file.
    #[serde(skip)]
    pub api_key: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Override for the provider's base URL (the part before `/chat/completions`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Temperature for generation and refinement calls.
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,

    /// Temperature for review calls.
    #[serde(default = "default_review_temperature")]
    pub review_temperature: f32,

    /// Maximum refinement passes; fixed at [`MAX_REFINEMENT_PASSES`].
    #[serde(skip, default = "default_max_refinement_passes")]
    pub max_refinement_passes: u32,

    /// Bind host for the web server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the web server.
    #[serde(default = "default_port")]
    pub port: u16,
}

const fn default_max_refinement_passes() -> u32 {
    MAX_REFINEMENT_PASSES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: String::new(),
            model_name: default_model_name(),
            base_url: None,
            generation_temperature: default_generation_temperature(),
            review_temperature: default_review_temperature(),
            max_refinement_passes: MAX_REFINEMENT_PASSES,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Loads configuration from the current directory and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `eduforge.json` exists but is invalid, or if the
    /// resulting configuration fails validation.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            EduError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        let mut config = Self::load_from_file(&current_dir.join(CONFIG_FILE_NAME))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `EduError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `EduError::ConfigValidationError` if the values are
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(EduError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| EduError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides using the given lookup function.
    ///
    /// Recognized variables: `LLM_PROVIDER`, `GROQ_API_KEY`,
    /// `OPENROUTER_API_KEY`, `MODEL_NAME`, `LLM_BASE_URL`. Empty values are
    /// ignored. The API key is taken from the variable belonging to the
    /// selected provider.
    ///
    /// # Errors
    ///
    /// Returns `EduError::ConfigValidationError` for an unknown provider name
    /// or if the result fails validation.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("LLM_PROVIDER") {
            self.provider = LlmProvider::from_str_case_insensitive(name.trim()).ok_or_else(|| {
                EduError::config_validation(
                    format!("unknown LLM_PROVIDER '{name}'"),
                    "Set LLM_PROVIDER to 'groq' or 'openrouter'",
                )
            })?;
        }
        if let Some(key) = get(self.provider.api_key_env()) {
            self.api_key = key.trim().to_string();
        }
        if let Some(model) = get("MODEL_NAME") {
            self.model_name = model.trim().to_string();
        }
        if let Some(url) = get("LLM_BASE_URL") {
            self.base_url = Some(url.trim().to_string());
        }

        self.validate()
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Returns `true` if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `EduError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EduError::config_validation(
                "modelName must not be empty",
                "Set MODEL_NAME or modelName in eduforge.json",
            ));
        }

        for (name, value) in [
            ("generationTemperature", self.generation_temperature),
            ("reviewTemperature", self.review_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(EduError::config_validation(
                    format!("{name} must be between 0.0 and 2.0 (got {value})"),
                    format!("Set {name} to a value in [0.0, 2.0] in eduforge.json"),
                ));
            }
        }

        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(EduError::config_validation(
                    format!("baseUrl '{url}' is not an http(s) URL"),
                    "Use a full URL such as https://api.groq.com/openai/v1",
                ));
            }
        }

        if self.host.trim().is_empty() {
            return Err(EduError::config_validation(
                "host must not be empty",
                "Use 127.0.0.1 to listen locally or 0.0.0.0 for all interfaces",
            ));
        }

        Ok(())
    }
}

/// Supported model providers. Both speak the OpenAI chat-completions protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LlmProvider {
    /// Groq (default).
    #[default]
    Groq,
    /// OpenRouter.
    OpenRouter,
}

impl LlmProvider {
    /// Parses a string into an `LlmProvider`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "openrouter" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key.
    #[must_use]
    pub const fn api_key_env(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Base URL of the provider's OpenAI-compatible API.
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl<'de> Deserialize<'de> for LlmProvider {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid LLM provider '{s}': expected one of 'groq', 'openrouter'"
            ))
        })
    }
}

impl Serialize for LlmProvider {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
