pub mod catalog;
pub mod collect;
pub mod metrics;
pub mod processes;

pub use catalog::{get_config_policy, get_meta, get_metric_types};
pub use collect::collect_metrics;
pub use metrics::get_metrics;
pub use processes::list_processes;

use actix_web::{web, HttpResponse, Responder};

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Mounts every adapter route.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/v1/meta", web::get().to(get_meta))
        .route("/v1/metric_types", web::get().to(get_metric_types))
        .route("/v1/config_policy", web::get().to(get_config_policy))
        .route("/v1/collect", web::post().to(collect_metrics))
        .route("/v1/processes", web::get().to(list_processes))
        .route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health));
}

pub(crate) fn error_body(message: impl std::fmt::Display) -> serde_json::Value {
    serde_json::json!({
        "status": "error",
        "message": message.to_string()
    })
}
