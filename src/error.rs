use thiserror::Error;

/// Errors surfaced by the MUN assistant.
#[derive(Error, Debug)]
pub enum MunAssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required field is missing or out of range. Raised before any network call.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The remote generation call could not be completed.
    #[error("Generation service error: {0}")]
    Service(String),

    /// A request for this feature is already in flight.
    #[error("{feature} request already in progress")]
    Busy { feature: String },

    /// The owning view was torn down before the response arrived.
    #[error("The {feature} request was cancelled before it completed")]
    Cancelled { feature: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MunAssistantError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors the user can fix by changing their input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, MunAssistantError>;
