//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │  Authorization  │  │     Provider            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Configuration  │  │  AuthRejected   │  │  Provider {code, ...}   │ │
//! │  │  InvalidUrl     │  │   (1 refresh +  │  │  Transport              │ │
//! │  │  ConfigLoad/Save│  │    1 retry)     │  │                         │ │
//! │  │                 │  │  AuthRetry-     │  │  never retried          │ │
//! │  │  fatal          │  │   Exhausted     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │  Serialization  │   Per-product problems are  │
//! │  │  (store failure │  │  (local JSON)   │   ImportFailure data, not   │
//! │  │   outside a     │  │                 │   errors.                    │
//! │  │   product write)│  │                 │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Missing or undecryptable credential field, or an invalid setting.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// The provider rejected the access token (HTTP 401/403 or an auth code).
    #[error("Authorization rejected{}: {message}", .code.map(|c| format!(" (code {})", c)).unwrap_or_default())]
    AuthRejected { code: Option<i64>, message: String },

    /// The call was rejected again after a refresh.
    #[error("Authorization failed after token refresh: {0}")]
    AuthRetryExhausted(String),

    // =========================================================================
    // Provider Errors
    // =========================================================================
    /// Non-zero envelope code, or a non-2xx response with a readable envelope.
    #[error("Provider error {code}: {message}{}", .request_id.as_ref().map(|r| format!(" (request {})", r)).unwrap_or_default())]
    Provider {
        code: i64,
        message: String,
        request_id: Option<String>,
    },

    /// Network failure or a response that could not be decoded.
    #[error("Transport error: {0}")]
    Transport(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Store failure outside a single product write.
    #[error("Database error: {0}")]
    Database(String),

    /// Local JSON encode/decode failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl SyncError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Configuration(message.into())
    }

    /// Shorthand for a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        SyncError::Transport(message.into())
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<shoplink_db::DbError> for SyncError {
    fn from(err: shoplink_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Transport(format!("request timed out: {}", err))
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// True when the single refresh-and-retry rule applies.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, SyncError::AuthRejected { .. })
    }

    /// True for any authorization failure, retried or not.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SyncError::AuthRejected { .. } | SyncError::AuthRetryExhausted(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::Configuration(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the remote side (or the path to it) failed.
    pub fn is_provider_error(&self) -> bool {
        matches!(self, SyncError::Provider { .. } | SyncError::Transport(_))
    }
}
