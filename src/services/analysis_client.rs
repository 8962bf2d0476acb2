// src/services/analysis_client.rs
use crate::config::Config;
use crate::errors::{AnalysisError, ErrorCategory};
use crate::models::{AnalysisRequest, AnalysisResult};
use crate::services::classifier::classify;
use crate::services::gemini::{CapabilityCall, GeminiCapability, VisionCapability};
use crate::services::image_encoder::ImageEncoder;
use crate::services::instruction_composer::compose;
use log::{error, info, warn};
use serde_json::{Value, json};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const REQUIRED_FIELDS: [&str; 4] = [
    "mainPrompt",
    "styleKeywords",
    "colorPalette",
    "alternativePrompts",
];

const REQUIRED_ALTERNATIVES: [(&str, &str); 2] = [
    ("concise", "alternativePrompts.concise"),
    ("poetic", "alternativePrompts.poetic"),
];

const STYLE_KEYWORD_COUNT: RangeInclusive<usize> = 5..=10;
const PALETTE_SIZE: usize = 6;

pub struct AnalysisClient {
    capability: Arc<dyn VisionCapability>,
    encoder: ImageEncoder,
    strict_cardinality: bool,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let capability = GeminiCapability::new(config)?;
        Ok(Self::with_capability(
            Arc::new(capability),
            config.strict_cardinality,
        ))
    }

    pub fn with_capability(capability: Arc<dyn VisionCapability>, strict_cardinality: bool) -> Self {
        Self {
            capability,
            encoder: ImageEncoder::new(),
            strict_cardinality,
        }
    }

    /// Runs one analysis. Every fault is logged here and reduced to the
    /// category the caller shows to the user.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, ErrorCategory> {
        let analysis_id = Uuid::new_v4();
        let start = Instant::now();
        let filename = request
            .image
            .filename
            .clone()
            .unwrap_or_else(|| "<unnamed>".to_string());

        match self.try_analyze(&request).await {
            Ok(result) => {
                info!(
                    "Analysis {} of {} completed via {} in {}ms",
                    analysis_id,
                    filename,
                    self.capability.name(),
                    start.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(e) => {
                let category = classify(&e);
                error!(
                    "Analysis {} of {} failed after {}ms ({}): {}",
                    analysis_id,
                    filename,
                    start.elapsed().as_millis(),
                    category.code(),
                    e
                );
                Err(category)
            }
        }
    }

    async fn try_analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let image = self.encoder.encode(&request.image)?;
        let call = CapabilityCall {
            image,
            instructions: compose(&request.options),
            response_schema: output_schema(),
        };

        let text = self.capability.generate(&call).await?;
        let result = parse_analysis(&text)?;
        self.check_cardinality(&result)?;

        Ok(result)
    }

    fn check_cardinality(&self, result: &AnalysisResult) -> Result<(), AnalysisError> {
        let keywords = result.style_keywords.len();
        if !STYLE_KEYWORD_COUNT.contains(&keywords) {
            if self.strict_cardinality {
                return Err(AnalysisError::Cardinality {
                    field: "styleKeywords",
                    count: keywords,
                    expected: "5-10",
                });
            }
            warn!("Analysis returned {} style keywords, expected 5-10", keywords);
        }

        let colors = result.color_palette.len();
        if colors != PALETTE_SIZE {
            if self.strict_cardinality {
                return Err(AnalysisError::Cardinality {
                    field: "colorPalette",
                    count: colors,
                    expected: "6",
                });
            }
            warn!("Analysis returned {} palette colors, expected 6", colors);
        }

        Ok(())
    }
}

/// The response shape declared to the capability.
pub fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "mainPrompt": { "type": "STRING" },
            "styleKeywords": { "type": "ARRAY", "items": { "type": "STRING" } },
            "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
            "alternativePrompts": {
                "type": "OBJECT",
                "properties": {
                    "concise": { "type": "STRING" },
                    "poetic": { "type": "STRING" }
                },
                "required": ["concise", "poetic"]
            }
        },
        "required": REQUIRED_FIELDS,
        "propertyOrdering": REQUIRED_FIELDS
    })
}

/// Removes a surrounding ```json ... ``` (or bare ```) fence if present.
/// The language tag is matched case-insensitively.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AnalysisError::Parse(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::Parse("Analysis is not a JSON object".to_string()))?;

    for field in REQUIRED_FIELDS {
        if object.get(field).is_none_or(Value::is_null) {
            return Err(AnalysisError::IncompleteResponse(field));
        }
    }

    let alternatives = &object["alternativePrompts"];
    for (key, field) in REQUIRED_ALTERNATIVES {
        if alternatives.get(key).is_none_or(Value::is_null) {
            return Err(AnalysisError::IncompleteResponse(field));
        }
    }

    let result: AnalysisResult =
        serde_json::from_value(value).map_err(|e| AnalysisError::Parse(e.to_string()))?;

    if result.main_prompt.trim().is_empty() {
        return Err(AnalysisError::IncompleteResponse("mainPrompt"));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageOptions, ImageUpload};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const PAYLOAD: &str = r##"{
        "mainPrompt": "A lone lighthouse on a rocky cliff at dusk",
        "styleKeywords": ["cinematic", "moody", "photorealistic", "coastal", "golden hour"],
        "colorPalette": ["#1B2A41", "#324A5F", "#0C1821", "#CCC9DC", "#F2A541", "#F3CA40"],
        "alternativePrompts": {
            "concise": "Lighthouse on a cliff at dusk.",
            "poetic": "A keeper of light stands watch as the sea swallows the sun."
        }
    }"##;

    struct FakeCapability {
        reply: Result<String, (u16, Option<&'static str>, &'static str)>,
        calls: Mutex<Vec<CapabilityCall>>,
    }

    impl FakeCapability {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16, reason: Option<&'static str>, message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err((status, reason, message)),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionCapability for FakeCapability {
        async fn generate(&self, call: &CapabilityCall) -> Result<String, AnalysisError> {
            self.calls.lock().unwrap().push(call.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err((status, reason, message)) => Err(AnalysisError::Capability {
                    status: *status,
                    reason: reason.map(str::to_string),
                    message: message.to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn request(options: ImageOptions) -> AnalysisRequest {
        AnalysisRequest {
            image: ImageUpload {
                filename: Some("photo.png".to_string()),
                media_type: Some("image/png".to_string()),
                data: vec![1, 2, 3, 4],
            },
            options,
        }
    }

    #[test]
    fn test_fenced_and_plain_payloads_parse_identically() {
        let fenced = format!("```json\n{}\n```", PAYLOAD);
        assert_eq!(parse_analysis(&fenced).unwrap(), parse_analysis(PAYLOAD).unwrap());

        let bare_fence = format!("```\n{}\n```", PAYLOAD);
        assert_eq!(parse_analysis(&bare_fence).unwrap(), parse_analysis(PAYLOAD).unwrap());
    }

    #[test]
    fn test_strip_code_fences_leaves_plain_text() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
    }

    #[test]
    fn test_missing_palette_is_incomplete() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value.as_object_mut().unwrap().remove("colorPalette");
        let err = parse_analysis(&value.to_string()).unwrap_err();
        assert!(matches!(err, AnalysisError::IncompleteResponse("colorPalette")));
    }

    #[test]
    fn test_uppercase_fence_tag_is_stripped() {
        let fenced = format!("```JSON\n{}\n```", PAYLOAD);
        assert_eq!(parse_analysis(&fenced).unwrap(), parse_analysis(PAYLOAD).unwrap());
        assert_eq!(strip_code_fences("```Json\n{}\n```"), "{}");
    }

    #[test]
    fn test_missing_alternative_is_incomplete() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value["alternativePrompts"]
            .as_object_mut()
            .unwrap()
            .remove("poetic");
        let err = parse_analysis(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::IncompleteResponse("alternativePrompts.poetic")
        ));
    }

    #[test]
    fn test_null_field_is_incomplete() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value["alternativePrompts"] = Value::Null;
        let err = parse_analysis(&value.to_string()).unwrap_err();
        assert!(matches!(err, AnalysisError::IncompleteResponse("alternativePrompts")));
    }

    #[test]
    fn test_wrong_types_are_parse_errors() {
        let err = parse_analysis(r#"{"mainPrompt": 3, "styleKeywords": [], "colorPalette": [], "alternativePrompts": {"concise": "a", "poetic": "b"}}"#)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));

        assert!(matches!(parse_analysis("not json"), Err(AnalysisError::Parse(_))));
        assert!(matches!(parse_analysis("[1, 2]"), Err(AnalysisError::Parse(_))));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = output_schema();
        assert_eq!(schema["required"], json!(REQUIRED_FIELDS));
        assert_eq!(schema["properties"]["styleKeywords"]["type"], "ARRAY");
        assert_eq!(
            schema["properties"]["alternativePrompts"]["required"],
            json!(["concise", "poetic"])
        );
    }

    #[tokio::test]
    async fn test_analyze_sends_image_instructions_and_schema() {
        let fake = FakeCapability::replying(PAYLOAD);
        let client = AnalysisClient::with_capability(fake.clone(), false);
        let options = ImageOptions {
            remove_text: true,
            ..Default::default()
        };

        let result = client.analyze(request(options.clone())).await.unwrap();
        assert_eq!(result.color_palette.len(), 6);

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].image.media_type, "image/png");
        assert_eq!(calls[0].image.data, "AQIDBA==");
        assert_eq!(calls[0].instructions, compose(&options));
        assert_eq!(calls[0].response_schema, output_schema());
    }

    #[tokio::test]
    async fn test_analyze_classifies_invalid_key() {
        let fake = FakeCapability::failing(400, None, "API key not valid. Please pass a valid API key.");
        let client = AnalysisClient::with_capability(fake, false);
        let err = client.analyze(request(ImageOptions::default())).await.unwrap_err();
        assert_eq!(err, ErrorCategory::InvalidCredential);
    }

    #[tokio::test]
    async fn test_analyze_classifies_other_faults_as_generic() {
        let fake = FakeCapability::failing(500, None, "Internal error");
        let client = AnalysisClient::with_capability(fake, false);
        let err = client.analyze(request(ImageOptions::default())).await.unwrap_err();
        assert_eq!(err, ErrorCategory::GenericAnalysis);
    }

    #[tokio::test]
    async fn test_incomplete_response_never_returns_partial_result() {
        let fake = FakeCapability::replying(r#"{"mainPrompt": "A cat", "styleKeywords": ["cute"]}"#);
        let client = AnalysisClient::with_capability(fake, false);
        let err = client.analyze(request(ImageOptions::default())).await.unwrap_err();
        assert_eq!(err, ErrorCategory::GenericAnalysis);
    }

    #[tokio::test]
    async fn test_encoding_failure_skips_capability() {
        let fake = FakeCapability::replying(PAYLOAD);
        let client = AnalysisClient::with_capability(fake.clone(), false);
        let mut req = request(ImageOptions::default());
        req.image.data.clear();

        let err = client.analyze(req).await.unwrap_err();
        assert_eq!(err, ErrorCategory::GenericAnalysis);
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cardinality_is_advisory_unless_strict() {
        let mut value: Value = serde_json::from_str(PAYLOAD).unwrap();
        value["colorPalette"] = json!(["#000000"]);
        let text = value.to_string();

        let lenient = AnalysisClient::with_capability(FakeCapability::replying(&text), false);
        assert!(lenient.analyze(request(ImageOptions::default())).await.is_ok());

        let strict = AnalysisClient::with_capability(FakeCapability::replying(&text), true);
        assert_eq!(
            strict.analyze(request(ImageOptions::default())).await.unwrap_err(),
            ErrorCategory::GenericAnalysis
        );
    }
}
