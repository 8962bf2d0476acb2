// src/services/mod.rs
pub mod analysis_client;
pub mod classifier;
pub mod gemini;
pub mod image_encoder;
pub mod instruction_composer;

pub use analysis_client::AnalysisClient;
pub use gemini::{GeminiCapability, VisionCapability};
pub use image_encoder::ImageEncoder;
