//! Error types for the climate viewer.

use thiserror::Error;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// Primary error type shared by every crate in the workspace.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Data Errors (recoverable: keep the last good frame) ===
    #[error("Data not available for {key}: {reason}")]
    DataUnavailable { key: String, reason: String },

    #[error("Malformed payload for {key}: {reason}")]
    MalformedPayload { key: String, reason: String },

    // === Storage Errors ===
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    // === Startup Errors (fatal to the session) ===
    #[error("Initialization failed: {0}")]
    InitializationFailure(String),

    // === Request / Configuration Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid grid extent: {0}")]
    InvalidExtent(String),

    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ClimateError {
    pub fn data_unavailable(key: impl Into<String>, reason: impl ToString) -> Self {
        ClimateError::DataUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        ClimateError::MalformedPayload {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        ClimateError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Whether a viewing session survives this error.
    ///
    /// Only initialization failures end the session; everything else is
    /// reported and the previous display is kept.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ClimateError::InitializationFailure(_))
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ClimateError::InvalidParameter { .. } | ClimateError::InvalidExtent(_) => 400,
            ClimateError::DataUnavailable { .. } => 404,
            ClimateError::MalformedPayload { .. } => 502,
            ClimateError::StorageUnavailable(_) | ClimateError::InitializationFailure(_) => 503,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for ClimateError {
    fn from(err: std::io::Error) -> Self {
        ClimateError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ClimateError {
    fn from(err: serde_json::Error) -> Self {
        ClimateError::MalformedPayload {
            key: "json".to_string(),
            reason: err.to_string(),
        }
    }
}
