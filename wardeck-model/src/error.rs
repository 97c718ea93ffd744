use std::fmt::{self, Display};

/// Errors produced when decoding or validating scan payloads.
#[derive(Debug)]
pub enum ModelError {
    Json(serde_json::Error),
    InvalidPayload(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Json(err) => write!(f, "json error: {err}"),
            ModelError::InvalidPayload(msg) => {
                write!(f, "invalid scan payload: {msg}")
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Json(err) => Some(err),
            ModelError::InvalidPayload(_) => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Json(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
