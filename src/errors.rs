//! Error types for the resource pool

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a resource factory, kept behind an `Arc` so the
/// error stays cheap to clone.
pub type SourceError = Arc<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    /// Startup could not create every resource; the pool was never built.
    #[error("Pool initialization failed: {reason}")]
    Initialization {
        slot: Option<usize>,
        reason: String,
        #[source]
        source: Option<SourceError>,
    },

    #[error("No resource became available within {0:?}")]
    Timeout(Duration),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Operation was cancelled")]
    Cancelled,
}

impl PoolError {
    pub(crate) fn creation_failed<E>(slot: usize, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PoolError::Initialization {
            slot: Some(slot),
            reason: format!("factory failed to create resource for slot {slot}: {error}"),
            source: Some(Arc::new(error)),
        }
    }

    pub(crate) fn creation_panicked(slot: usize, message: &str) -> Self {
        PoolError::Initialization {
            slot: Some(slot),
            reason: format!("factory panicked creating resource for slot {slot}: {message}"),
            source: None,
        }
    }

    pub(crate) fn startup(reason: impl Into<String>) -> Self {
        PoolError::Initialization {
            slot: None,
            reason: reason.into(),
            source: None,
        }
    }

    /// Whether this error is a recoverable acquisition timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
