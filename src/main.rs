use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod model;
mod retriever;
mod service;

use model::Config;
use retriever::GammaClient;
use service::{AiRuleParser, AnalysisService};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    // AI extraction is optional; the deterministic strategies always run
    let ai_parser = if config.analysis.ai_enabled {
        AiRuleParser::from_env(config.analysis.model.as_deref())
    } else {
        tracing::info!("AI extraction disabled by configuration");
        None
    };

    let retriever = Arc::new(GammaClient::new());
    let analysis_service = web::Data::new(AnalysisService::new(retriever, ai_parser));

    tracing::info!("Starting rulegraph server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(analysis_service.clone())
            .configure(api::analysis::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
