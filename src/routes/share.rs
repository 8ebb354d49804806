use crate::models::CreateShareRequest;
use crate::routes::error::ApiError;
use crate::routes::matches::{resolve_caller, AppState};
use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

/// Configure share link routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/share/matches", web::post().to(create_share))
        .route("/share/{share_id}", web::get().to(get_share));
}

/// Snapshot the startup's current top matches behind a public link (elite)
///
/// POST /api/share/matches
///
/// Request body:
/// ```json
/// { "startup_id": "string", "limit": 10 }
/// ```
///
/// Responds 201 with `{ "url", "share_id", "expires_at" }` as the whole body.
async fn create_share(
    state: web::Data<AppState>,
    body: web::Json<CreateShareRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let caller = resolve_caller(&state, &req).await?;

    let created = state
        .service
        .create_share(&caller, &body.startup_id, body.limit)
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/// Public read of a share snapshot, no authentication
///
/// GET /api/share/{shareId}
async fn get_share(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let shared = state.service.get_share(&path).await?;
    Ok(HttpResponse::Ok().json(shared))
}
