use actix_web::{web, HttpResponse, Responder};

use crate::api::error_body;
use crate::state::{try_lock_state, AppState};

/// Answers 503 instead of waiting while a collection pass holds the registry.
pub async fn list_processes(data: web::Data<AppState>) -> impl Responder {
    let Some(state) = try_lock_state(&data) else {
        return HttpResponse::ServiceUnavailable().json(error_body("collection in progress"));
    };
    HttpResponse::Ok().json(serde_json::json!({
        "initialized": state.registry.is_initialized(),
        "resolved_pids": state.registry.cached_pids(),
        "processes": state.registry.processes()
    }))
}
