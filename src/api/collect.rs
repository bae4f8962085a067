use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::error_body;
use crate::error::ProcstatError;
use crate::metrics::METRICS;
use crate::models::{ConfigTable, Namespace};
use crate::state::{lock_state, AppState, Settings};

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    /// Only read until the registry has been configured once.
    #[serde(default)]
    pub config: ConfigTable,
    /// Requested namespaces, e.g. `/staples/procfs/procstat/*/fds`.
    #[serde(default)]
    pub metrics: Vec<String>,
}

pub async fn collect_metrics(
    data: web::Data<AppState>,
    settings: web::Data<Settings>,
    req: web::Json<CollectRequest>,
) -> impl Responder {
    let req = req.into_inner();

    let namespaces = match req
        .metrics
        .iter()
        .map(|ns| ns.parse::<Namespace>())
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(namespaces) => namespaces,
        Err(e) => return HttpResponse::BadRequest().json(error_body(e)),
    };

    // the pass may shell out to pgrep, keep it off the async workers
    let state = data.get_ref().clone();
    let config = req.config;
    let task = web::block(move || {
        let mut state = lock_state(&state);
        state.registry.configure(&config)?;

        let collection = state.registry.collect(&namespaces);
        METRICS.observe(&collection, state.registry.cached_pids().len());
        Ok::<_, ProcstatError>(collection)
    });

    match tokio::time::timeout(settings.collect_timeout, task).await {
        Ok(Ok(Ok(collection))) => {
            log::debug!(
                "Collected {} metric(s), {} failure(s)",
                collection.metrics.len(),
                collection.failures.len()
            );
            HttpResponse::Ok().json(collection)
        }
        Ok(Ok(Err(e))) => {
            log::error!("Collection rejected: {}", e);
            HttpResponse::BadRequest().json(error_body(e))
        }
        Ok(Err(e)) => {
            log::error!("Collection task failed: {}", e);
            HttpResponse::InternalServerError().json(error_body(e))
        }
        Err(_) => {
            log::warn!(
                "Collection did not finish within {:?}",
                settings.collect_timeout
            );
            HttpResponse::GatewayTimeout().json(error_body("collection timed out"))
        }
    }
}
