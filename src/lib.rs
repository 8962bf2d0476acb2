// src/lib.rs
//! Image-to-prompt analysis service.
//!
//! Accepts an uploaded image plus editing preferences, asks a vision model
//! for a structured description (main prompt, style keywords, color palette
//! and two alternative phrasings) and returns it as JSON.

use actix_web::web;
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use crate::services::AnalysisClient;

#[derive(Clone)]
pub struct AppState {
    pub analysis_client: Arc<AnalysisClient>,
    pub max_upload_bytes: usize,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/analyze", web::post().to(handlers::analyze_image))
            .route("/instructions", web::post().to(handlers::preview_instructions)),
    )
    .route("/health", web::get().to(handlers::health_check));
}
