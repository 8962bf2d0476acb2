// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

use promptlens::config::Config;
use promptlens::services::AnalysisClient;
use promptlens::{AppState, configure};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting promptlens service...");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Using model {} (timeout {:?})", config.model, config.timeout);

    let analysis_client =
        Arc::new(AnalysisClient::new(&config).context("Failed to create analysis client")?);

    let app_state = AppState {
        analysis_client,
        max_upload_bytes: config.max_upload_bytes,
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}
