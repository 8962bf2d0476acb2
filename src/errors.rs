// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Faults raised below the analysis boundary. These carry diagnostic detail
/// for the log and are never shown to the user directly.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Image encoding error: {0}")]
    Encoding(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Capability call timed out after {0}s")]
    Timeout(u64),

    #[error("Capability error (status {status}): {message}")]
    Capability {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("Capability returned no text content")]
    EmptyResponse,

    #[error("Failed to parse analysis JSON: {0}")]
    Parse(String),

    #[error("Incomplete analysis response: missing field `{0}`")]
    IncompleteResponse(&'static str),

    #[error("Analysis field `{field}` has {count} entries, expected {expected}")]
    Cardinality {
        field: &'static str,
        count: usize,
        expected: &'static str,
    },
}

/// The only failures a caller ever sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    #[error("The configured API key is invalid. Please check your credential and try again.")]
    InvalidCredential,

    #[error("The image could not be analyzed. Please try again.")]
    GenericAnalysis,

    #[error("Please select an image before starting the analysis.")]
    NoImageSelected,
}

impl ErrorCategory {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidCredential => "invalid_credential",
            ErrorCategory::GenericAnalysis => "analysis_failed",
            ErrorCategory::NoImageSelected => "no_image_selected",
        }
    }
}

impl ResponseError for ErrorCategory {
    fn status_code(&self) -> StatusCode {
        match self {
            ErrorCategory::InvalidCredential => StatusCode::UNAUTHORIZED,
            ErrorCategory::GenericAnalysis => StatusCode::BAD_GATEWAY,
            ErrorCategory::NoImageSelected => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string()
        }))
    }
}
