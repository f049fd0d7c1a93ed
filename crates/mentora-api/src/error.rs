//! Error types for the Mentora API.
//!
//! This module defines the error hierarchy for configuration loading,
//! request validation, content generation, and persistence.

use std::path::PathBuf;

use mentora_store::StoreError;

/// A specialized `Result` type for Mentora operations.
pub type Result<T> = std::result::Result<T, MentoraError>;

/// Errors that can occur while serving Mentora requests.
#[derive(Debug, thiserror::Error)]
pub enum MentoraError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your mentora.json with a JSON linter")]
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

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// A referenced user, course, module or quiz does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// What kind of entity was missing ("User", "Course", ...).
        entity: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// The request was well-formed JSON but semantically invalid.
    #[error("{message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // Generation Errors
    // ========================================================================
    /// The LLM call failed or its reply could not be parsed.
    #[error("Failed to {operation}: {cause}")]
    Generation {
        /// What was being generated, phrased as a verb ("generate course").
        operation: &'static str,
        /// The underlying cause.
        cause: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Document store failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl MentoraError {
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

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Generation` error from any displayable cause.
    #[must_use]
    pub fn generation(operation: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::Generation {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Returns `true` if the error was caused by the client's request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidRequest { .. })
    }
}
