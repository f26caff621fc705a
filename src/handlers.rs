use crate::aggregate::{organization_stats, top_n, MetricField};
use crate::config::Config;
use crate::date_range::{filter_by_range, parse_bound, BoundSide, DateRange};
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::normalizer::RecordNormalizer;
use crate::schema::USAGE_SUMMARY_SCHEMA;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Shared application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Normalizer configured with the display options from `config`.
    pub normalizer: RecordNormalizer,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let normalizer = RecordNormalizer::new(config.display_options()?);
        Ok(Self { config, normalizer })
    }
}

/// Builds the application router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    let api_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // Normalization endpoints
        .route(
            "/api/v1/organizations/normalize",
            post(normalize_organizations),
        )
        .route("/api/v1/organizations/stats", post(organization_stats_handler))
        .route("/api/v1/leads/normalize", post(normalize_leads))
        .route(
            "/api/v1/usage/top-organizations",
            post(top_usage_organizations),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit
                .layer(RequestBodyLimitLayer::new(body_limit)),
        );

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-admin-dashboard",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

async fn not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

/// POST /api/v1/organizations/normalize
///
/// Normalizes a batch of raw organization records into canonical views, in input order.
pub async fn normalize_organizations(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecordBatch>, JsonRejection>,
) -> Result<Json<Vec<OrganizationView>>, AppError> {
    let Json(batch) = payload?;
    let records = batch.into_records();
    tracing::info!("POST /organizations/normalize - {} record(s)", records.len());

    Ok(Json(state.normalizer.normalize_organizations(&records)))
}

/// POST /api/v1/organizations/stats
///
/// Tier/status distributions and the top organizations by conversation count, over the
/// organizations created inside the optional `from`/`to` range.
///
/// # Arguments
///
/// * `params` - `from`, `to` and `limit` query parameters.
/// * `batch` - Raw organization records.
pub async fn organization_stats_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQueryParams>, QueryRejection>,
    payload: Result<Json<RecordBatch>, JsonRejection>,
) -> Result<Json<OrganizationStats>, AppError> {
    let Query(params) = query?;
    let Json(batch) = payload?;
    let range = parse_range(&params).context("Invalid date range")?;
    let limit = resolve_limit(params.limit, state.config.default_top_n);

    let records = batch.into_records();
    let views = state.normalizer.normalize_organizations(&records);
    let stats = organization_stats(&views, range.as_ref(), limit);

    tracing::info!(
        "Organization stats: {} of {} record(s) in range, {} tier(s), {} status(es)",
        stats.total_organizations,
        records.len(),
        stats.tier_distribution.len(),
        stats.status_distribution.len()
    );

    Ok(Json(stats))
}

/// POST /api/v1/leads/normalize
///
/// Normalizes raw leads and keeps those whose timestamp lies in the optional range.
pub async fn normalize_leads(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQueryParams>, QueryRejection>,
    payload: Result<Json<RecordBatch>, JsonRejection>,
) -> Result<Json<Vec<LeadView>>, AppError> {
    let Query(params) = query?;
    let Json(batch) = payload?;
    let range = parse_range(&params).context("Invalid date range")?;

    let records = batch.into_records();
    let leads = state.normalizer.normalize_leads(&records);
    let leads = filter_by_range(&leads, range.as_ref());

    tracing::info!(
        "POST /leads/normalize - {} record(s), {} returned",
        records.len(),
        leads.len()
    );

    Ok(Json(leads))
}

/// POST /api/v1/usage/top-organizations
///
/// Ranks the organizations of a usage-analytics summary by conversation count.
pub async fn top_usage_organizations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RangeQueryParams>, QueryRejection>,
    payload: Result<Json<UsageAnalytics>, JsonRejection>,
) -> Result<Json<Vec<RankedEntry>>, AppError> {
    let Query(params) = query?;
    let Json(payload) = payload?;
    let limit = resolve_limit(params.limit, state.config.default_top_n);

    let records = payload.into_records();
    let views = state
        .normalizer
        .normalize_organizations_with(&USAGE_SUMMARY_SCHEMA, &records);
    let ranked = top_n(&views, MetricField::TotalConversations, limit);

    tracing::info!(
        "POST /usage/top-organizations - {} record(s), top {} returned",
        records.len(),
        ranked.len()
    );

    Ok(Json(ranked))
}

/// Negative limits mean "nothing"; a missing limit uses the configured default.
fn resolve_limit(limit: Option<i64>, default: usize) -> usize {
    match limit {
        None => default,
        Some(n) if n <= 0 => 0,
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
    }
}

/// Parses `from`/`to` query parameters; `None` when neither is present.
fn parse_range(params: &RangeQueryParams) -> Result<Option<DateRange>, AppError> {
    let parse = |raw: &Option<String>, side: BoundSide, name: &str| {
        match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(value) => parse_bound(value, side).map(Some).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "'{}' must be YYYY-MM-DD or an RFC 3339 timestamp, got '{}'",
                    name, value
                ))
            }),
        }
    };

    let from = parse(&params.from, BoundSide::From, "from")?;
    let to = parse(&params.to, BoundSide::To, "to")?;

    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    Ok(Some(DateRange::new(from, to)))
}

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the working directory; a missing file is a 404.
async fn serve_openapi_spec() -> Result<impl IntoResponse, AppError> {
    let content = tokio::fs::read_to_string("openapi.yml")
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound("OpenAPI spec not found".to_string())
            }
            _ => AppError::InternalError(e.to_string()),
        })
        .with_context(|| "Failed to read openapi.yml".to_string())?;

    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/yaml")],
        content,
    ))
}

/// Serves the Swagger UI HTML page pointing at `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Admin Dashboard API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(from: Option<&str>, to: Option<&str>) -> RangeQueryParams {
        RangeQueryParams {
            from: from.map(String::from),
            to: to.map(String::from),
            limit: None,
        }
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, 5), 5);
        assert_eq!(resolve_limit(Some(3), 5), 3);
        assert_eq!(resolve_limit(Some(0), 5), 0);
        assert_eq!(resolve_limit(Some(-2), 5), 0);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range(&params(None, None)).unwrap(), None);
        assert_eq!(parse_range(&params(Some(" "), None)).unwrap(), None);

        let range = parse_range(&params(Some("2024-01-01"), None)).unwrap().unwrap();
        assert!(range.from.is_some());
        assert!(range.to.is_none());

        let err = parse_range(&params(None, Some("tomorrow"))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
