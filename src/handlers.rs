// src/handlers.rs
use crate::{AppState, config::parse_bool, errors::ErrorCategory, models::*};
use crate::services::instruction_composer::compose;
use actix_multipart::{Field, Multipart};
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::debug;

pub async fn analyze_image(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut image: Option<ImageUpload> = None;
    let mut options = ImageOptions::default();

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field.content_disposition();
        let name = content_disposition.get_name().unwrap_or_default().to_string();
        let filename = content_disposition.get_filename().map(str::to_string);

        match name.as_str() {
            "image" => {
                let media_type = field.content_type().map(|ct| ct.to_string());
                let bytes = read_field(&mut field, data.max_upload_bytes).await?;
                image = Some(ImageUpload {
                    filename,
                    media_type,
                    data: bytes.to_vec(),
                });
            }
            "removeText" => options.set_remove_text(read_flag(&mut field, &name).await?),
            "whiteBackground" => options.set_white_background(read_flag(&mut field, &name).await?),
            "blackBackground" => options.set_black_background(read_flag(&mut field, &name).await?),
            "additionalInstructions" => {
                options.set_additional_instructions(read_text(&mut field, &name).await?)
            }
            _ => {
                debug!("Ignoring unknown form field: {}", name);
                while field.try_next().await?.is_some() {}
            }
        }
    }

    // Guard owned by the caller layer, not the analysis client.
    let image = match image {
        Some(image) if !image.data.is_empty() => image,
        _ => return Err(ErrorCategory::NoImageSelected.into()),
    };

    let result = data
        .analysis_client
        .analyze(AnalysisRequest { image, options })
        .await?;

    Ok(HttpResponse::Ok().json(&result))
}

pub async fn preview_instructions(body: web::Json<ImageOptions>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "instructions": compose(&body)
    }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "promptlens",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn read_field(field: &mut Field, limit: usize) -> Result<BytesMut, Error> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.try_next().await? {
        if buffer.len() + chunk.len() > limit {
            return Err(actix_web::error::ErrorPayloadTooLarge(format!(
                "Upload exceeds {} bytes",
                limit
            )));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

async fn read_text(field: &mut Field, name: &str) -> Result<String, Error> {
    let bytes = read_field(field, MAX_TEXT_FIELD_BYTES).await?;
    String::from_utf8(bytes.to_vec()).map_err(|_| {
        actix_web::error::ErrorBadRequest(format!("Field {} is not valid UTF-8", name))
    })
}

async fn read_flag(field: &mut Field, name: &str) -> Result<bool, Error> {
    let text = read_text(field, name).await?;
    parse_bool(name, &text).map_err(actix_web::error::ErrorBadRequest)
}
