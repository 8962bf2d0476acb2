// src/models.rs
use serde::{Deserialize, Serialize};

/// Editing preferences selected by the user before an analysis.
///
/// The white and black background flags are mutually exclusive when set
/// through [`ImageOptions::set_white_background`] and
/// [`ImageOptions::set_black_background`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    pub remove_text: bool,
    pub white_background: bool,
    pub black_background: bool,
    pub additional_instructions: String,
}

impl ImageOptions {
    pub fn set_remove_text(&mut self, enabled: bool) {
        self.remove_text = enabled;
    }

    pub fn set_white_background(&mut self, enabled: bool) {
        self.white_background = enabled;
        if enabled {
            self.black_background = false;
        }
    }

    pub fn set_black_background(&mut self, enabled: bool) {
        self.black_background = enabled;
        if enabled {
            self.white_background = false;
        }
    }

    pub fn set_additional_instructions(&mut self, text: impl Into<String>) {
        self.additional_instructions = text.into();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An image as received from the caller, before transport encoding.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

/// Base64 payload plus the media type it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: String,
}

/// Built fresh for each analysis and dropped once the call resolves.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: ImageUpload,
    pub options: ImageOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub main_prompt: String,
    pub style_keywords: Vec<String>,
    pub color_palette: Vec<String>,
    pub alternative_prompts: AlternativePrompts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativePrompts {
    pub concise: String,
    pub poetic: String,
}
