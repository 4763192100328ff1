//! Pool configuration options

use crate::errors::{PoolError, PoolResult};
use crate::factory::CreationParameters;
use std::time::Duration;

/// Configuration for resource pool behavior
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{CreationParameters, PoolConfiguration};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_resources(16)
///     .with_worker_count(2)
///     .with_default_timeout(Duration::from_secs(5))
///     .with_creation_parameters(CreationParameters::new().with("host", "localhost"));
///
/// assert_eq!(config.max_resources, 16);
/// assert_eq!(config.worker_count, 2);
/// assert_eq!(config.default_timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration {
    /// Number of resources created at startup; fixed for the pool's lifetime
    pub max_resources: usize,

    /// Width of the worker group used to create resources at startup
    pub worker_count: usize,

    /// Passed verbatim to the factory for every resource
    pub creation_parameters: CreationParameters,

    /// Used by `acquire` only when the caller passes no timeout
    pub default_timeout: Option<Duration>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_resources: 8,
            worker_count: 4,
            creation_parameters: CreationParameters::default(),
            default_timeout: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of pooled resources
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_max_resources(50);
    ///
    /// assert_eq!(config.max_resources, 50);
    /// ```
    pub fn with_max_resources(mut self, count: usize) -> Self {
        self.max_resources = count;
        self
    }

    /// Set the startup worker group width
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn with_creation_parameters(mut self, params: CreationParameters) -> Self {
        self.creation_parameters = params;
        self
    }

    /// Set the fallback timeout for `acquire(None)`
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Check the configuration can produce a usable pool
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_resources == 0 {
            return Err(PoolError::InvalidConfiguration(
                "max_resources must be at least 1".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(PoolError::InvalidConfiguration(
                "worker_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout actually used for an acquisition; `None` means do not block
    pub(crate) fn resolve_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        requested
            .or(self.default_timeout)
            .filter(|timeout| !timeout.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();
        assert_eq!(config.max_resources, 8);
        assert_eq!(config.worker_count, 4);
        assert!(config.creation_parameters.is_empty());
        assert!(config.default_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let err = PoolConfiguration::new().with_max_resources(0).validate().unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));

        let err = PoolConfiguration::new().with_worker_count(0).validate().unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_explicit_timeout_wins_over_default() {
        let config = PoolConfiguration::new().with_default_timeout(Duration::from_secs(30));

        assert_eq!(
            config.resolve_timeout(Some(Duration::from_millis(50))),
            Some(Duration::from_millis(50))
        );
        assert_eq!(config.resolve_timeout(None), Some(Duration::from_secs(30)));
        assert_eq!(config.resolve_timeout(Some(Duration::ZERO)), None);
    }

    #[test]
    fn test_no_timeout_means_non_blocking() {
        let config = PoolConfiguration::new();
        assert_eq!(config.resolve_timeout(None), None);
        assert_eq!(config.resolve_timeout(Some(Duration::ZERO)), None);
    }
}
