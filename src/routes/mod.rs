// Route exports
pub mod error;
pub mod matches;
pub mod share;

use actix_web::web;

pub use error::{handle_json_payload_error, handle_query_payload_error, ApiError};
pub use matches::AppState;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(matches::health_check))
        .service(
            web::scope("/api")
                .configure(matches::configure)
                .configure(share::configure),
        );
}
