// src/services/classifier.rs
use crate::errors::{AnalysisError, ErrorCategory};

const INVALID_KEY_REASON: &str = "API_KEY_INVALID";

// Message fragments the capability uses when it rejects a key. Only consulted
// when the fault carries no structured reason or status that settles it.
const INVALID_KEY_MESSAGES: &[&str] = &["api key not valid", "invalid api key"];

pub fn classify(error: &AnalysisError) -> ErrorCategory {
    if let AnalysisError::Capability { status, reason, .. } = error {
        if reason.as_deref() == Some(INVALID_KEY_REASON) || matches!(status, 401 | 403) {
            return ErrorCategory::InvalidCredential;
        }
    }

    let message = error.to_string().to_ascii_lowercase();
    if INVALID_KEY_MESSAGES.iter().any(|m| message.contains(m)) {
        return ErrorCategory::InvalidCredential;
    }

    ErrorCategory::GenericAnalysis
}
