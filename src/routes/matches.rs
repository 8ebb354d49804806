use crate::models::{
    ApiResponse, ExportLimitQuery, HealthResponse, InvestorMatchQuery, MemoResponse,
    StartupArtifactQuery, StartupMatchQuery, SubjectKind,
};
use crate::routes::error::ApiError;
use crate::services::{AuthError, CacheManager, Caller, MatchService, PostgresStore, TokenVerifier};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchService>,
    pub verifier: Arc<TokenVerifier>,
    pub cache: Arc<CacheManager>,
    /// `None` when running on the in-process store
    pub postgres: Option<Arc<PostgresStore>>,
}

/// Configure all match-related routes
///
/// Literal paths are registered ahead of the `{id}` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches/export.csv", web::get().to(export_startup_csv))
        .route("/matches/memo", web::get().to(deal_memo))
        .route("/matches/startup/{startup_id}", web::get().to(startup_matches))
        .route("/matches/startup/{startup_id}/stats", web::get().to(startup_stats))
        .route("/matches/startup/{startup_id}/rematch", web::get().to(startup_rematch_status))
        .route("/matches/startup/{startup_id}/rematch", web::post().to(startup_rematch))
        .route("/matches/investor/{investor_id}", web::get().to(investor_matches))
        .route("/matches/investor/{investor_id}/stats", web::get().to(investor_stats))
        .route("/matches/investor/{investor_id}/export", web::get().to(export_investor_csv))
        .route("/matches/investor/{investor_id}/rematch", web::get().to(investor_rematch_status))
        .route("/matches/investor/{investor_id}/rematch", web::post().to(investor_rematch));
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };
    let cache_healthy = state.cache.ping().await;

    let status = if store_healthy && cache_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Identify the caller from the bearer token and look up their plan
///
/// The plan is read on every request so upgrades apply immediately.
pub(crate) async fn resolve_caller(state: &AppState, req: &HttpRequest) -> Result<Caller, ApiError> {
    let header_value = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
        None => None,
    };

    let caller_id = state.verifier.caller_from_header(header_value)?;
    Ok(state.service.resolve_caller(caller_id).await?)
}

/// Investor matches for a startup
///
/// GET /api/matches/startup/{startupId}?minScore=&sectors=&showAll=&sortBy=&limit=&offset=
///
/// The smart default threshold applies unless `showAll=true` or an explicit
/// `minScore` is given.
async fn startup_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<StartupMatchQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let data = state
        .service
        .list_startup_matches(&caller, &path, &query)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(data)))
}

/// Startup matches for an investor
///
/// GET /api/matches/investor/{investorId}?minGODScore=&hasRevenue=&minMRR=&sortBy=god_score
async fn investor_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<InvestorMatchQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let data = state
        .service
        .list_investor_matches(&caller, &path, &query)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(data)))
}

async fn startup_stats(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let stats = state.service.stats(SubjectKind::Startup, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

async fn investor_stats(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let stats = state.service.stats(SubjectKind::Investor, &path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

async fn startup_rematch_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    rematch_status(&state, &req, SubjectKind::Startup, &path).await
}

async fn investor_rematch_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    rematch_status(&state, &req, SubjectKind::Investor, &path).await
}

async fn rematch_status(
    state: &AppState,
    req: &HttpRequest,
    kind: SubjectKind,
    subject_id: &str,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(state, req).await?;
    let status = state.service.rematch_status(&caller, kind, subject_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(status)))
}

/// Recompute a startup's matches against the current investor roster
///
/// POST /api/matches/startup/{startupId}/rematch
async fn startup_rematch(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    rematch(&state, &req, SubjectKind::Startup, &path).await
}

/// Recompute an investor's matches against the current startup roster
///
/// POST /api/matches/investor/{investorId}/rematch
async fn investor_rematch(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    rematch(&state, &req, SubjectKind::Investor, &path).await
}

async fn rematch(
    state: &AppState,
    req: &HttpRequest,
    kind: SubjectKind,
    subject_id: &str,
) -> Result<HttpResponse, ApiError> {
    let caller = resolve_caller(state, req).await?;
    let outcome = state.service.rematch(&caller, kind, subject_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        outcome,
        format!("Rematched {} {}", kind.as_str(), subject_id),
    )))
}

/// CSV of a startup's investor matches (elite)
///
/// GET /api/matches/export.csv?startup_id={startupId}&limit=50
async fn export_startup_csv(
    state: web::Data<AppState>,
    query: web::Query<StartupArtifactQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let (filename, bytes) = state
        .service
        .export_startup_csv(&caller, &query.startup_id, query.limit)
        .await?;

    Ok(csv_response(&filename, bytes))
}

/// CSV of an investor's startup matches (elite)
///
/// GET /api/matches/investor/{investorId}/export?limit=50
async fn export_investor_csv(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ExportLimitQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let (filename, bytes) = state
        .service
        .export_investor_csv(&caller, &path, query.limit)
        .await?;

    Ok(csv_response(&filename, bytes))
}

/// Generated deal memo over the top matches (elite)
///
/// GET /api/matches/memo?startup_id={startupId}
///
/// Response body is `{ "memo": "..." }`, without the list envelope.
async fn deal_memo(
    state: web::Data<AppState>,
    query: web::Query<StartupArtifactQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let memo = state
        .service
        .deal_memo(&caller, &query.startup_id, query.limit)
        .await?;

    Ok(HttpResponse::Ok().json(MemoResponse { memo }))
}

fn csv_response(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes)
}
