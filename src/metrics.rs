//! Metrics collection and export for resource pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
/// use std::convert::Infallible;
///
/// let pool = ResourcePool::new(
///     factory_fn(|_| Ok::<_, Infallible>(0u32)),
///     PoolConfiguration::new().with_max_resources(3),
/// ).unwrap();
///
/// {
///     let _resource = pool.acquire(None).unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_acquired, 1);
///     assert_eq!(metrics.checked_out, 1);
/// }
/// assert_eq!(pool.get_metrics().total_released, 1);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PoolMetrics {
    /// Total successful acquisitions
    pub total_acquired: usize,

    /// Total releases back into the store
    pub total_released: usize,

    /// Resources currently held by callers
    pub checked_out: usize,

    /// Resources currently waiting in the store
    pub available: usize,

    /// Acquisitions that gave up without a resource
    pub timeout_events: usize,

    /// Cleanup hook errors or panics
    pub cleanup_failures: usize,

    /// Pool utilization ratio (0.0 to 1.0)
    pub utilization: f64,

    pub capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("available".to_string(), self.available.to_string());
        metrics.insert("timeout_events".to_string(), self.timeout_events.to_string());
        metrics.insert("cleanup_failures".to_string(), self.cleanup_failures.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("capacity".to_string(), self.capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
    /// use std::collections::HashMap;
    /// use std::convert::Infallible;
    ///
    /// let pool = ResourcePool::new(
    ///     factory_fn(|_| Ok::<_, Infallible>(())),
    ///     PoolConfiguration::default(),
    /// ).unwrap();
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("db_pool", Some(&tags));
    /// assert!(output.contains("resourcepool_resources_checked_out"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let labels = Self::format_labels(pool_name, tags);
        let mut output = String::new();

        let gauges = [
            ("resourcepool_resources_checked_out", "Resources currently checked out", metrics.checked_out as f64),
            ("resourcepool_resources_available", "Resources currently available", metrics.available as f64),
            ("resourcepool_capacity", "Fixed pool capacity", metrics.capacity as f64),
        ];
        for (name, help, value) in gauges {
            Self::write_metric(&mut output, name, help, "gauge", &labels, &value.to_string());
        }
        Self::write_metric(
            &mut output,
            "resourcepool_utilization",
            "Pool utilization ratio",
            "gauge",
            &labels,
            &format!("{:.2}", metrics.utilization),
        );

        let counters = [
            ("resourcepool_acquired_total", "Total resources acquired", metrics.total_acquired),
            ("resourcepool_released_total", "Total resources released", metrics.total_released),
            ("resourcepool_timeouts_total", "Acquisitions that timed out", metrics.timeout_events),
            ("resourcepool_cleanup_failures_total", "Cleanup hook failures", metrics.cleanup_failures),
        ];
        for (name, help, value) in counters {
            Self::write_metric(&mut output, name, help, "counter", &labels, &value.to_string());
        }

        output
    }

    fn write_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: &str) {
        output.push_str(&format!("# HELP {name} {help}\n"));
        output.push_str(&format!("# TYPE {name} {kind}\n"));
        output.push_str(&format!("{name}{{{labels}}} {value}\n"));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut tags: Vec<_> = tags.iter().collect();
            tags.sort();
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub timeout_events: AtomicUsize,
    pub cleanup_failures: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_metrics(&self, checked_out: usize, available: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            checked_out,
            available,
            timeout_events: self.timeout_events.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
            utilization,
            capacity,
        }
    }
}
