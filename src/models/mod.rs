pub mod config;
pub mod namespace;
pub mod process;
pub mod stats;

pub use config::{ConfigTable, ConfigValue};
pub use namespace::{MetricInstance, MetricType, Namespace, NamespaceElement};
pub use process::{BoundPid, PidSource, ProcessInfo, SourceMode};
pub use stats::{FieldMap, MetricValue, FIELD_NAMES};
