use prometheus::{
    Encoder, Gauge, GaugeVec, CounterVec, Opts, Registry, TextEncoder,
    register_gauge_with_registry, register_gauge_vec_with_registry, register_counter_vec_with_registry,
};
use lazy_static::lazy_static;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::services::Collection;

/// Prometheus view of the most recent collection pass.
pub struct MetricsRegistry {
    registry: Registry,

    pub value: GaugeVec,
    pub resolved_processes: Gauge,
    pub last_collect_timestamp: Gauge,

    pub spec_failures: CounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let value = register_gauge_vec_with_registry!(
            Opts::new("procstat_value", "Last collected value of a procstat field"),
            &["process", "field", "pid"],
            registry
        ).unwrap();

        let resolved_processes = register_gauge_with_registry!(
            Opts::new("procstat_resolved_processes", "Number of processes bound to a stats handle"),
            registry
        ).unwrap();

        let last_collect_timestamp = register_gauge_with_registry!(
            Opts::new("procstat_last_collect_timestamp_seconds", "Unix timestamp of the last collection"),
            registry
        ).unwrap();

        let spec_failures = register_counter_vec_with_registry!(
            Opts::new("procstat_spec_failures_total", "Specs or pids skipped during collection"),
            &["spec"],
            registry
        ).unwrap();

        Self {
            registry,
            value,
            resolved_processes,
            last_collect_timestamp,
            spec_failures,
        }
    }

    /// Replaces the exported values with those of `collection`.
    pub fn observe(&self, collection: &Collection, resolved: usize) {
        // processes that disappeared must not linger
        self.value.reset();
        for metric in &collection.metrics {
            let pid = metric.pid.to_string();
            self.value
                .with_label_values(&[metric.namespace.process(), metric.namespace.field(), pid.as_str()])
                .set(metric.value.as_f64());
        }

        for failure in &collection.failures {
            self.spec_failures.with_label_values(&[failure.spec.as_str()]).inc();
        }

        self.resolved_processes.set(resolved as f64);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.last_collect_timestamp.set(now);
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricInstance, MetricValue, Namespace};
    use crate::services::SpecFailure;

    #[test]
    fn test_observe_and_render() {
        let metrics = MetricsRegistry::new();
        let collection = Collection {
            metrics: vec![MetricInstance {
                namespace: Namespace::new("nginx", "fds"),
                value: MetricValue::Unsigned(12),
                pid: 42,
                timestamp: 0,
            }],
            failures: vec![SpecFailure {
                spec: "/run/redis.pid".to_string(),
                pid: None,
                error: "unable to read pid from file".to_string(),
            }],
        };

        metrics.observe(&collection, 1);
        let text = metrics.render().unwrap();
        let line = text
            .lines()
            .find(|l| l.starts_with("procstat_value{"))
            .unwrap();
        assert!(line.contains(r#"process="nginx""#));
        assert!(line.contains(r#"field="fds""#));
        assert!(line.contains(r#"pid="42""#));
        assert!(line.ends_with(" 12"));
        assert!(text.contains(r#"procstat_spec_failures_total{spec="/run/redis.pid"} 1"#));
        assert!(text.contains("procstat_resolved_processes 1"));

        metrics.observe(&Collection::default(), 0);
        let text = metrics.render().unwrap();
        assert!(!text.contains(r#"process="nginx""#));
    }
}
