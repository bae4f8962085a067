use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::time::Duration;

use procstat::api;
use procstat::cli::{CommandArgs, SearchBackend};
use procstat::models::{ConfigTable, ConfigValue};
use procstat::services::{PgrepSearch, PidSearch, ProcessRegistry, SysinfoProvider, SysinfoSearch};
use procstat::state::{new_state, Settings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();

    let search: Box<dyn PidSearch> = match args.search {
        SearchBackend::Pgrep => Box::new(PgrepSearch::new()),
        SearchBackend::Sysinfo => Box::new(SysinfoSearch::new()),
    };
    let mut registry = ProcessRegistry::new(Box::new(SysinfoProvider::new()), search)
        .with_default_mode(args.mode);

    if let Some(files) = &args.files {
        let mut cfg = ConfigTable::new();
        cfg.insert("files".to_string(), ConfigValue::Str(files.clone()));
        registry
            .configure(&cfg)
            .context("invalid --files option")?;
    }

    let state = new_state(registry);
    let settings = Settings {
        collect_timeout: Duration::from_secs(args.collect_timeout),
    };

    print_banner(&args);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(settings))
            .configure(api::routes)
    })
        .bind(&args.address)
        .with_context(|| format!("failed to bind {}", args.address))?
        .run()
        .await
        .context("server error")
}

fn print_banner(args: &CommandArgs) {
    log::info!("procstat collector v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Listening on http://{}", args.address);
    log::info!("  GET  /v1/meta            - plugin meta");
    log::info!("  GET  /v1/metric_types    - metric catalog");
    log::info!("  GET  /v1/config_policy   - config schema");
    log::info!("  POST /v1/collect         - collect metrics");
    log::info!("  GET  /v1/processes       - configured processes");
    log::info!("  GET  /metrics            - Prometheus metrics");
    log::info!("  GET  /health             - health check");
    match &args.files {
        Some(files) => log::info!("Preconfigured files ({:?} mode): {}", args.mode, files),
        None => log::info!("Waiting for the first collect request to configure files"),
    }
}
