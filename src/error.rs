//! Error types for model resolution and memory estimation
//!
//! Every failure carries one of five kinds. Resolution failures are
//! user-actionable (fix the identifier, supply a token, pick a library);
//! `InvalidInput` is always an integration bug and never worth retrying.

use thiserror::Error;

/// Result type for vram-calculator operations
pub type Result<T> = std::result::Result<T, VramError>;

/// Coarse classification of a [`VramError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Repository requires valid credentials
    GatedAccess,
    /// Identifier does not resolve to a repository
    NotFound,
    /// Repository lacks the metadata needed to pick a loader
    UnsupportedLibrary,
    /// Architecture could not be read for any other reason
    LoadError,
    /// Malformed parameter-size summary or unknown precision
    InvalidInput,
}

impl ErrorKind {
    /// Stable name used in CLI output
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GatedAccess => "GatedAccess",
            Self::NotFound => "NotFound",
            Self::UnsupportedLibrary => "UnsupportedLibrary",
            Self::LoadError => "LoadError",
            Self::InvalidInput => "InvalidInput",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while resolving a model or estimating its memory
#[derive(Debug, Error)]
pub enum VramError {
    /// Gated repository and no (or an unauthorized) token
    #[error("Model `{repo}` is gated. Please ensure to provide a valid access token. Access tokens can be found at https://huggingface.co/settings/tokens.")]
    GatedAccess { repo: String },

    /// Repository does not exist (or is private and invisible to this token)
    #[error("Model `{repo}` was not found on the Hub. Please try another model name.")]
    NotFound { repo: String },

    /// No config.json, so no way to choose how to read the architecture
    #[error("Model `{repo}` does not have library metadata on the Hub{}. Please manually select a `library_name` to use (e.g., `transformers`).", declared_library(.library))]
    UnsupportedLibrary {
        repo: String,
        library: Option<String>,
    },

    /// Anything else that stopped the architecture from being read
    #[error("Model `{repo}` encountered an error. Open a discussion on the model's page with the error message: `{message}`")]
    LoadError { repo: String, message: String },

    /// Negative/non-finite parameter size, unknown precision, empty request
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

fn declared_library(library: &Option<String>) -> String {
    match library {
        Some(name) => format!(" usable by this tool (declared library: `{name}`)"),
        None => String::new(),
    }
}

impl VramError {
    /// Build a load error, keeping the underlying message verbatim
    pub fn load(repo: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::LoadError {
            repo: repo.into(),
            message: message.to_string(),
        }
    }

    /// Build an invalid-input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GatedAccess { .. } => ErrorKind::GatedAccess,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnsupportedLibrary { .. } => ErrorKind::UnsupportedLibrary,
            Self::LoadError { .. } => ErrorKind::LoadError,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Error code for structured output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::GatedAccess => "E010",
            ErrorKind::NotFound => "E011",
            ErrorKind::UnsupportedLibrary => "E012",
            ErrorKind::LoadError => "E020",
            ErrorKind::InvalidInput => "E030",
        }
    }

    /// Check if the user can fix this without changing code
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::GatedAccess | ErrorKind::NotFound | ErrorKind::UnsupportedLibrary
        )
    }
}
