//! Health monitoring for resource pools

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Health status of a resource pool
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
/// use std::convert::Infallible;
///
/// let pool = ResourcePool::new(
///     factory_fn(|_| Ok::<_, Infallible>(())),
///     PoolConfiguration::new().with_max_resources(3),
/// ).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.available, 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HealthStatus {
    pub is_healthy: bool,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    pub available: usize,

    pub checked_out: usize,

    pub capacity: usize,

    /// How long the oldest outstanding checkout has been held
    pub longest_checkout: Option<Duration>,

    pub warnings: Vec<String>,
}

impl HealthStatus {
    pub fn new(
        available: usize,
        checked_out: usize,
        capacity: usize,
        longest_checkout: Option<Duration>,
    ) -> Self {
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if available == 0 && capacity > 0 {
            warnings.push("Pool is exhausted".to_string());
        }

        Self {
            is_healthy,
            utilization,
            available,
            checked_out,
            capacity,
            longest_checkout,
            warnings,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_pool_is_healthy() {
        let health = HealthStatus::new(8, 0, 8, None);
        assert!(health.is_healthy());
        assert_eq!(health.warning_count(), 0);
    }

    #[test]
    fn test_exhausted_pool_warns() {
        let health = HealthStatus::new(0, 4, 4, Some(Duration::from_secs(2)));
        assert!(!health.is_healthy());
        assert_eq!(health.warning_count(), 2);
        assert_eq!(health.longest_checkout, Some(Duration::from_secs(2)));
    }
}
