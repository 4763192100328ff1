//! # EsoxSolutions.ResourcePool
//!
//! Bounded, thread-safe pool of reusable resources (connections, handles,
//! heavyweight objects) with blocking and timeout-based acquisition.
//!
//! ## Features
//!
//! - Fixed capacity, every resource created eagerly at startup
//! - Parallel startup on a bounded worker group
//! - Automatic release of resources via RAII (Drop trait), including on panic
//! - Non-blocking, timed and async acquisition
//! - Per-release cleanup hook
//! - Health monitoring and metrics
//! - Prometheus metrics export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! let pool = ResourcePool::new(
//!     factory_fn(|params| Ok::<_, Infallible>(format!("conn to {}", params.get("host").unwrap_or("localhost")))),
//!     PoolConfiguration::new().with_max_resources(4),
//! ).unwrap();
//! {
//!     let conn = pool.acquire(Some(Duration::from_secs(1))).unwrap();
//!     println!("Got: {}", *conn);
//!     // Resource automatically returned when `conn` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 4);
//! ```

mod config;
mod errors;
mod factory;
mod health;
mod metrics;
mod pool;
mod startup;
mod store;

pub use config::PoolConfiguration;
pub use errors::{PoolError, PoolResult, SourceError};
pub use factory::{factory_fn, CreationParameters, FnFactory, ResourceFactory};
pub use health::HealthStatus;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{PooledResource, ResourcePool};
