//! Error types for regcache
//!
//! All modules use `RegCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for regcache operations
pub type RegCacheResult<T> = Result<T, RegCacheError>;

/// All errors that can occur in regcache
#[derive(Error, Debug)]
pub enum RegCacheError {
    // Transport errors
    #[error("Registry transport error: {0}")]
    Transport(String),

    #[error("Malformed registry payload from {source_name}: {reason}")]
    MalformedPayload { source_name: String, reason: String },

    #[error(
        "Instance identity mismatch: filed under {filed_service}/{filed_id}, \
         declares {declared_service}/{declared_id}"
    )]
    IdentityMismatch {
        filed_service: String,
        filed_id: String,
        declared_service: String,
        declared_id: String,
    },

    // Lifecycle errors
    #[error("Registry cache already initialized")]
    AlreadyInitialized,

    #[error("Bootstrap full fetch gave up after {attempts} attempts: {last_error}")]
    BootstrapExhausted { attempts: u32, last_error: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl RegCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// Create a malformed payload error
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Run: regcache config show"),
            Self::AlreadyInitialized => Some("Call initialize() once per cache instance"),
            Self::BootstrapExhausted { .. } => {
                Some("Check registry reachability; the next reconcile will refetch")
            }
            _ => None,
        }
    }
}
