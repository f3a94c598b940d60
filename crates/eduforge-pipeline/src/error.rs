//! Error types for the EduForge pipeline.
//!
//! This module defines the error hierarchy for every pipeline operation:
//! configuration loading, request validation, model provider calls, and
//! structured-output parsing.

use std::path::PathBuf;

/// A specialized `Result` type for EduForge pipeline operations.
pub type Result<T> = std::result::Result<T, EduError>;

/// Errors that can occur while generating and reviewing lesson content.
///
/// Variants are organized by subsystem and carry actionable suggestions
/// where one exists.
#[derive(Debug, thiserror::Error)]
pub enum EduError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your eduforge.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// No API key is configured for the selected provider.
    #[error("No API key configured for {provider}\n\nSuggestion: Set {env_var} in your environment or .env file")]
    MissingApiKey {
        /// Provider that needs the key.
        provider: String,
        /// Environment variable the key is read from.
        env_var: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The content request failed validation (blank topic, grade out of range).
    #[error("{message}")]
    InvalidRequest {
        /// User-facing description of the problem.
        message: String,
    },

    // ========================================================================
    // Model Provider Errors
    // ========================================================================
    /// The model provider returned an error or could not be reached.
    #[error("LLM API error ({kind}): {message}\n\nSuggestion: {suggestion}")]
    LlmApiError {
        /// The kind of API error (e.g., rate limit, authentication, server).
        kind: LlmErrorKind,
        /// Detailed error message from the API.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The model reply did not match the declared output shape.
    #[error("Model response does not match the {contract} contract: {message}")]
    SchemaError {
        /// Name of the output contract that was violated.
        contract: String,
        /// What was wrong with the reply.
        message: String,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid pipeline stage transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current stage.
        from: String,
        /// The attempted target stage.
        to: String,
    },
}

/// Categories of LLM API errors for structured error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// Other unclassified errors.
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl LlmErrorKind {
    /// Returns a suggestion message for this error kind.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Authentication => "Check your API key or credentials",
            Self::RateLimit => "Wait and retry, or reduce request frequency",
            Self::Server => "Retry later; the LLM service may be experiencing issues",
            Self::Network => "Check your network connection",
            Self::Other => "Check the LLM provider's status page",
        }
    }

    /// Classifies an HTTP status code returned by the provider.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl EduError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `LlmApiError` with automatic suggestion based on error kind.
    #[must_use]
    pub fn llm_api_error(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        let suggestion = kind.suggestion().to_string();
        Self::LlmApiError {
            kind,
            message: message.into(),
            suggestion,
        }
    }

    /// Creates a new `SchemaError` for the named output contract.
    #[must_use]
    pub fn schema(contract: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaError {
            contract: contract.into(),
            message: message.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error is transient and a later run may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LlmApiError {
                kind: LlmErrorKind::RateLimit | LlmErrorKind::Server | LlmErrorKind::Network,
                ..
            }
        )
    }

    /// Returns `true` if the error was caused by the caller's input.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}
