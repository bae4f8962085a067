use serde::Serialize;

use crate::models::namespace::{
    NamespaceElement, CLASS, PLUGIN_NAME, VENDOR, WILDCARD,
};
use crate::models::{MetricType, Namespace, FIELD_NAMES};

/// Maps the fixed field list onto procstat namespaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamespaceCatalog;

impl NamespaceCatalog {
    /// One entry per field, with a dynamic process element.
    pub fn metric_types() -> Vec<MetricType> {
        FIELD_NAMES
            .iter()
            .map(|field| {
                MetricType::new(Namespace::from_elements([
                    NamespaceElement::fixed(VENDOR),
                    NamespaceElement::fixed(CLASS),
                    NamespaceElement::fixed(PLUGIN_NAME),
                    NamespaceElement::dynamic("processName", "Process Name"),
                    NamespaceElement::fixed(*field),
                ]))
            })
            .collect()
    }

    /// Whether a requested namespace selects the process called `display_name`.
    pub fn matches(ns: &Namespace, display_name: &str) -> bool {
        ns.process() == WILDCARD || ns.process() == display_name
    }

    /// Copy of `ns` with the process element bound to `display_name`.
    pub fn bind(ns: &Namespace, display_name: &str) -> Namespace {
        let mut bound = ns.clone();
        bound.set_process(display_name);
        bound
    }

    pub fn config_policy() -> ConfigPolicy {
        ConfigPolicy {
            namespace: vec![VENDOR.to_string(), CLASS.to_string(), PLUGIN_NAME.to_string()],
            rules: vec![
                ConfigRule {
                    key: "files",
                    kind: "string",
                    required: true,
                    default: None,
                    description: "comma separated list of source[:alias] entries; the first ':' starts \
                                  the alias, so patterns must not contain ':'",
                },
                ConfigRule {
                    key: "mode",
                    kind: "string",
                    required: false,
                    default: Some("file"),
                    description: "'file' for pid files, 'pattern' for command line patterns",
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigPolicy {
    pub namespace: Vec<String>,
    pub rules: Vec<ConfigRule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigRule {
    pub key: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub description: &'static str,
}
