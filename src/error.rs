//! Error types for CRM operations
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, 5xx and 429 responses
//! - NonRetryable: validation failures, missing records, malformed payloads
//! - RequiresUserAction: missing configuration, expired or under-scoped Meta tokens

use thiserror::Error;

use crate::meta::MetaApiError;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum CrmError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error! status: {status}")]
    Http { status: u16, body: String },

    // Non-retryable errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Requires user action
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Meta(#[from] MetaApiError),
}

impl CrmError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        CrmError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            CrmError::Network(_) => true,
            CrmError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        match self {
            CrmError::Configuration(_) => true,
            CrmError::Http { status, .. } => *status == 401 || *status == 403,
            CrmError::Meta(e) => e.requires_user_action(),
            _ => false,
        }
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CrmError::Network(_) => "Check your internet connection and try again.",
            CrmError::Http { status, .. } if *status == 401 || *status == 403 => {
                "Sign in again to refresh your CRM session."
            }
            CrmError::Http { .. } => "The CRM backend rejected the request. Try again later.",
            CrmError::Validation(_) => "Fill in the required fields and submit again.",
            CrmError::NotFound { .. } => "The record may have been deleted. Refresh and retry.",
            CrmError::InvalidUrl(_) => "Check the API base URL in ~/.crmdesk/config.json",
            CrmError::Io(_) => "Check file permissions and disk space.",
            CrmError::Json(_) => "Check the payload format is correct.",
            CrmError::Configuration(_) => "Check your configuration in ~/.crmdesk/config.json",
            CrmError::Meta(_) => "Reconnect your Meta account from the Ads Sync page.",
        }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CrmError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => CrmError::Network(err.to_string()),
        }
    }
}

impl From<url::ParseError> for CrmError {
    fn from(err: url::ParseError) -> Self {
        CrmError::InvalidUrl(err.to_string())
    }
}

/// Serializable error representation for HTTP responses
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&CrmError> for ErrorBody {
    fn from(err: &CrmError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        ErrorBody {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
