use actix_web::{HttpResponse, Responder};
use serde::Serialize;

use crate::models::namespace::PLUGIN_NAME;
use crate::services::NamespaceCatalog;

pub const PLUGIN_VERSION: u32 = 1;
pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
pub struct PluginMeta {
    pub name: &'static str,
    pub version: u32,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub accept_content_types: Vec<&'static str>,
    pub return_content_types: Vec<&'static str>,
}

impl PluginMeta {
    pub fn procstat() -> Self {
        Self {
            name: PLUGIN_NAME,
            version: PLUGIN_VERSION,
            kind: "collector",
            accept_content_types: vec![CONTENT_TYPE],
            return_content_types: vec![CONTENT_TYPE],
        }
    }
}

pub async fn get_meta() -> impl Responder {
    HttpResponse::Ok().json(PluginMeta::procstat())
}

/// The catalog does not depend on configuration, so this never waits on a
/// running collection pass.
pub async fn get_metric_types() -> impl Responder {
    HttpResponse::Ok().json(NamespaceCatalog::metric_types())
}

pub async fn get_config_policy() -> impl Responder {
    HttpResponse::Ok().json(NamespaceCatalog::config_policy())
}
