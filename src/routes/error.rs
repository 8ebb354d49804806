use crate::core::visibility::Capability;
use crate::models::{ErrorResponse, Tier};
use crate::services::{AuthError, ServiceError, TextGenerationError};
use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;

/// Every failure an HTTP handler can answer with
///
/// 403 is reserved for "valid request, insufficient plan" so clients can show
/// an upgrade prompt instead of an error state.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Upgrade to {required_tier} required for {}", .capability.as_str())]
    UpgradeRequired {
        capability: Capability,
        required_tier: Tier,
    },

    #[error("Share link has expired")]
    ShareExpired,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    InvalidPayload { code: &'static str, message: String },

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::UpgradeRequired { .. } => "upgrade_required",
            ApiError::ShareExpired => "share_expired",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::InvalidPayload { code, .. } => *code,
            ApiError::Upstream(_) => "upstream_error",
            ApiError::StoreUnavailable(_) => "store_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpgradeRequired { .. } => StatusCode::FORBIDDEN,
            ApiError::ShareExpired => StatusCode::GONE,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let required_tier = match self {
            ApiError::UpgradeRequired { required_tier, .. } => Some(*required_tier),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
            required_tier,
        })
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ServiceError::UpgradeRequired {
                capability,
                required_tier,
            } => ApiError::UpgradeRequired {
                capability,
                required_tier,
            },
            ServiceError::ShareExpired => ApiError::ShareExpired,
            ServiceError::AuthenticationRequired => ApiError::Unauthorized(err.to_string()),
            ServiceError::InvalidRequest(message) => ApiError::BadRequest(message),
            ServiceError::EntityStore(e) => {
                tracing::error!("Entity store failure: {}", e);
                ApiError::Upstream(format!("Entity store unavailable: {}", e))
            }
            ServiceError::TextGeneration(TextGenerationError::NotConfigured) => {
                ApiError::Upstream("Memo generation is not configured".to_string())
            }
            ServiceError::TextGeneration(e) => {
                tracing::error!("Text generation failure: {}", e);
                ApiError::Upstream(format!("Memo generation failed: {}", e))
            }
            ServiceError::Store(e) => {
                tracing::error!("Match store failure: {}", e);
                ApiError::StoreUnavailable(format!("Match store unavailable: {}", e))
            }
            ServiceError::Artifact(e) => {
                tracing::error!("Artifact rendering failure: {}", e);
                ApiError::Internal(format!("Could not render export: {}", e))
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("Rejected credentials: {}", err);
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation failed: {}", errors))
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::InvalidPayload {
        code: "invalid_json",
        message: format!("Invalid JSON: {}", err),
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query error on {}: {}", req.path(), err);
    ApiError::InvalidPayload {
        code: "invalid_query",
        message: format!("Invalid query: {}", err),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_upgrade_required_body() {
        let err = ApiError::from(ServiceError::UpgradeRequired {
            capability: Capability::Export,
            required_tier: Tier::Elite,
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "upgrade_required");
        assert_eq!(parsed["required_tier"], "elite");
        assert_eq!(parsed["status_code"], 403);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::ShareExpired.status_code(), StatusCode::GONE);
        assert_eq!(
            ApiError::from(ServiceError::AuthenticationRequired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(ServiceError::InvalidRequest("x".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ServiceError::TextGeneration(TextGenerationError::EmptyCompletion)).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(AuthError::MalformedHeader).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
