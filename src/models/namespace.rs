use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ProcstatError;
use crate::models::stats::MetricValue;

pub const VENDOR: &str = "staples";
pub const CLASS: &str = "procfs";
pub const PLUGIN_NAME: &str = "procstat";
pub const WILDCARD: &str = "*";

/// Number of elements in every procstat namespace.
pub const NAMESPACE_LEN: usize = 5;
pub const PROCESS_INDEX: usize = 3;
pub const FIELD_INDEX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceElement {
    pub value: String,
    /// Set only for dynamic elements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NamespaceElement {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            name: None,
            description: None,
        }
    }

    pub fn dynamic(name: &str, description: &str) -> Self {
        Self {
            value: WILDCARD.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.name.is_some()
    }
}

/// `/vendor/class/plugin/process/field`, always five elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    elements: [NamespaceElement; NAMESPACE_LEN],
}

impl Namespace {
    /// A request namespace for `process` and `field` under the procstat prefix.
    pub fn new(process: &str, field: &str) -> Self {
        Self {
            elements: [
                NamespaceElement::fixed(VENDOR),
                NamespaceElement::fixed(CLASS),
                NamespaceElement::fixed(PLUGIN_NAME),
                NamespaceElement::fixed(process),
                NamespaceElement::fixed(field),
            ],
        }
    }

    pub fn from_elements(elements: [NamespaceElement; NAMESPACE_LEN]) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[NamespaceElement] {
        &self.elements
    }

    pub fn process(&self) -> &str {
        &self.elements[PROCESS_INDEX].value
    }

    pub fn field(&self) -> &str {
        &self.elements[FIELD_INDEX].value
    }

    pub fn set_process(&mut self, process: &str) {
        self.elements[PROCESS_INDEX].value = process.to_string();
    }

    pub fn strings(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.value.as_str()).collect()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "/{}", element.value)?;
        }
        Ok(())
    }
}

impl FromStr for Namespace {
    type Err = ProcstatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().trim_start_matches('/').split('/').collect();
        if parts.len() != NAMESPACE_LEN || parts.iter().any(|p| p.is_empty()) {
            return Err(ProcstatError::InvalidNamespace(s.to_string()));
        }
        Ok(Self {
            elements: [
                NamespaceElement::fixed(parts[0]),
                NamespaceElement::fixed(parts[1]),
                NamespaceElement::fixed(parts[2]),
                NamespaceElement::fixed(parts[3]),
                NamespaceElement::fixed(parts[4]),
            ],
        })
    }
}

impl Serialize for Namespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Catalog entry: a namespace with no attached value.
#[derive(Debug, Clone, Serialize)]
pub struct MetricType {
    pub namespace: Namespace,
    pub elements: Vec<NamespaceElement>,
}

impl MetricType {
    pub fn new(namespace: Namespace) -> Self {
        let elements = namespace.elements().to_vec();
        Self { namespace, elements }
    }
}

/// One collected value, with the process element bound to a concrete name.
#[derive(Debug, Clone, Serialize)]
pub struct MetricInstance {
    pub namespace: Namespace,
    pub value: MetricValue,
    pub pid: i32,
    /// Unix time in milliseconds.
    pub timestamp: u64,
}
