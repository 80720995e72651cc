//! REST API endpoint for market rule analysis

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi};

use crate::api::error::ApiError;
use crate::service::AnalysisService;

/// Query parameters for the analysis endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalysisParams {
    /// Attempt AI extraction before the deterministic fallback (default: true)
    pub ai: Option<bool>,
}

/// Analyze a market's resolution rules
///
/// Fetches the market by slug, extracts the resolution graph (AI first when
/// enabled, deterministic strategies otherwise) and scores the rule text.
#[utoipa::path(
    get,
    path = "/v1/markets/{slug}/analysis",
    params(
        ("slug" = String, Path, description = "Market slug"),
        AnalysisParams
    ),
    responses(
        (status = 200, description = "Market analyzed successfully", body = crate::service::MarketAnalysis),
        (status = 404, description = "Market not found"),
        (status = 502, description = "Upstream market API failure")
    ),
    tag = "analysis"
)]
#[get("/v1/markets/{slug}/analysis")]
pub async fn analyze_market(
    service: web::Data<AnalysisService>,
    path: web::Path<String>,
    query: web::Query<AnalysisParams>,
) -> Result<HttpResponse, ApiError> {
    let slug = path.into_inner();
    let use_ai = query.ai.unwrap_or(true);

    tracing::debug!(slug = %slug, use_ai = use_ai, "Analysis requested");

    let analysis = service.analyze(&slug, use_ai).await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// OpenAPI documentation for the service
#[derive(OpenApi)]
#[openapi(
    paths(analyze_market, crate::api::health::liveness, crate::api::health::readiness),
    components(schemas(
        crate::service::MarketAnalysis,
        crate::service::analysis::RuleAnalysis,
        crate::service::analysis::ExtractionEngine,
        crate::model::MarketSnapshot,
        crate::model::SubMarket,
        crate::model::LogicNode,
        crate::model::NodeKind,
        crate::model::RiskAssessment,
        crate::model::RiskLevel,
        crate::api::health::HealthStatus,
        crate::api::health::ReadinessStatus,
        crate::api::health::DependencyHealth,
    )),
    tags(
        (name = "analysis", description = "Market rule analysis"),
        (name = "health", description = "Service health probes")
    ),
    info(
        title = "rulegraph",
        description = "Prediction-market resolution-rule parsing, flowchart generation and risk scoring"
    )
)]
pub struct ApiDoc;

/// Configure analysis routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze_market);
}
