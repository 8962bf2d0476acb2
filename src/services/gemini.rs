// src/services/gemini.rs
use crate::config::Config;
use crate::errors::AnalysisError;
use crate::models::EncodedImage;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Everything the external capability receives for one analysis.
#[derive(Debug, Clone)]
pub struct CapabilityCall {
    pub image: EncodedImage,
    pub instructions: String,
    pub response_schema: Value,
}

/// A generative service that answers an instruction about an image with text.
#[async_trait]
pub trait VisionCapability: Send + Sync {
    async fn generate(&self, call: &CapabilityCall) -> Result<String, AnalysisError>;
    fn name(&self) -> &str;
}

pub struct GeminiCapability {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

impl GeminiCapability {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        if config.api_key.trim().is_empty() {
            return Err(AnalysisError::Configuration(
                "Gemini API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_request_body(call: &CapabilityCall) -> Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": call.image.media_type,
                            "data": call.image.data
                        }
                    },
                    { "text": call.instructions }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": call.response_schema
            }
        })
    }

    /// Joins the text parts of the first candidate.
    pub fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let parts = &response.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }

    pub fn parse_error(status: u16, body: &str) -> AnalysisError {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => AnalysisError::Capability {
                status,
                reason: envelope.error.details.into_iter().find_map(|d| d.reason),
                message: truncate(&envelope.error.message, 200).to_string(),
            },
            Err(_) => AnalysisError::Capability {
                status,
                reason: None,
                message: truncate(body, 200).to_string(),
            },
        }
    }
}

#[async_trait]
impl VisionCapability for GeminiCapability {
    async fn generate(&self, call: &CapabilityCall) -> Result<String, AnalysisError> {
        let body = Self::build_request_body(call);

        debug!(
            "Gemini request: model={} image={} ({} b64 chars) instructions={} chars",
            self.model,
            call.image.media_type,
            call.image.data.len(),
            call.instructions.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.timeout.as_secs())
                } else {
                    AnalysisError::Transport(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        let result: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::Timeout(self.timeout.as_secs())
            } else {
                AnalysisError::Parse(format!("Failed to parse Gemini response: {}", e))
            }
        })?;

        Self::extract_text(&result).ok_or(AnalysisError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
