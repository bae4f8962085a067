use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

pub const NUM_THREADS: &str = "numThreads";
pub const FDS: &str = "fds";
pub const VOLUNTARY_CONTEXT_SWITCHES: &str = "voluntary_context_switches";
pub const INVOLUNTARY_CONTEXT_SWITCHES: &str = "involuntary_context_switches";
pub const READ_COUNT: &str = "read_count";
pub const WRITE_COUNT: &str = "write_count";
pub const READ_BYTES: &str = "read_bytes";
pub const WRITE_BYTES: &str = "write_bytes";
pub const CPU_TIME_USER: &str = "cpu_time_user";
pub const CPU_TIME_SYSTEM: &str = "cpu_time_system";
pub const PROCESS_UPTIME: &str = "process_uptime";
pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_RSS: &str = "memory_rss";
pub const MEMORY_VMS: &str = "memory_vms";
pub const MEMORY_SWAP: &str = "memory_swap";

/// Every field a process sample may carry, in catalog order.
pub const FIELD_NAMES: [&str; 15] = [
    NUM_THREADS,
    FDS,
    VOLUNTARY_CONTEXT_SWITCHES,
    INVOLUNTARY_CONTEXT_SWITCHES,
    READ_COUNT,
    WRITE_COUNT,
    READ_BYTES,
    WRITE_BYTES,
    CPU_TIME_USER,
    CPU_TIME_SYSTEM,
    PROCESS_UPTIME,
    CPU_USAGE,
    MEMORY_RSS,
    MEMORY_VMS,
    MEMORY_SWAP,
];

/// A single measurement. Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            MetricValue::Unsigned(v) => v as f64,
            MetricValue::Signed(v) => v as f64,
            MetricValue::Float(v) => v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Unsigned(v) => write!(f, "{}", v),
            MetricValue::Signed(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Unsigned(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Unsigned(v as u64)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Signed(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

/// Point-in-time sample of one process, keyed by field name.
///
/// Fields that could not be read in this cycle are simply absent.
pub type FieldMap = HashMap<&'static str, MetricValue>;
