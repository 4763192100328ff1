//! Core resource pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::factory::{CreationParameters, ResourceFactory};
use crate::health::HealthStatus;
#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::startup;
use crate::store::Store;

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

type ReturnFn<T> = Arc<dyn Fn(T, usize) + Send + Sync>;

/// A checked-out resource that automatically returns to the pool when dropped
///
/// The release runs exactly once, whether the holder's scope ends normally,
/// through `?`, or by unwinding.
pub struct PooledResource<T> {
    value: Option<T>,
    resource_id: usize,
    return_fn: ReturnFn<T>,
}

impl<T> PooledResource<T> {
    fn new(value: T, resource_id: usize, return_fn: ReturnFn<T>) -> Self {
        Self {
            value: Some(value),
            resource_id,
            return_fn,
        }
    }

    /// Slot the resource was created for; stable across checkouts
    pub fn id(&self) -> usize {
        self.resource_id
    }

    /// Return the resource to the pool now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Deref for PooledResource<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("resource already released")
    }
}

impl<T> DerefMut for PooledResource<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("resource already released")
    }
}

impl<T: fmt::Debug> fmt::Debug for PooledResource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledResource")
            .field("id", &self.resource_id)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Drop for PooledResource<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            (self.return_fn)(value, self.resource_id);
        }
    }
}

struct PoolInner<F: ResourceFactory> {
    factory: F,
    store: Store<(F::Resource, usize)>,
    checked_out: DashMap<usize, Instant>,
    config: PoolConfiguration,
    metrics: MetricsTracker,
}

impl<F: ResourceFactory> PoolInner<F> {
    fn release(&self, mut resource: F::Resource, id: usize) {
        // A failed cleanup still hands the resource back untouched.
        match panic::catch_unwind(AssertUnwindSafe(|| self.factory.cleanup(&mut resource))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.metrics.cleanup_failures.fetch_add(1, Ordering::Relaxed);
                warn!(resource_id = id, error = %err, "Cleanup failed, returning resource as-is");
            }
            Err(_) => {
                self.metrics.cleanup_failures.fetch_add(1, Ordering::Relaxed);
                warn!(resource_id = id, "Cleanup panicked, returning resource as-is");
            }
        }

        let held_for = self.checked_out.remove(&id).map(|(_, since)| since.elapsed());
        if self.store.push((resource, id)).is_err() {
            error!(resource_id = id, "Store is full on release, dropping resource");
            return;
        }
        self.metrics.total_released.fetch_add(1, Ordering::Relaxed);
        debug!(
            resource_id = id,
            held_us = held_for.map(|d| d.as_micros() as u64),
            "Released pooled resource"
        );
    }
}

/// Fixed-size pool of resources created in parallel at startup
///
/// Cloning is cheap and yields another handle to the same pool.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// let pool = ResourcePool::new(
///     factory_fn(|_| Ok::<_, Infallible>(Vec::<u8>::new())),
///     PoolConfiguration::new().with_max_resources(1),
/// ).unwrap();
///
/// {
///     let mut buffer = pool.acquire(None).unwrap();
///     buffer.push(1);
///     assert!(pool.acquire(Some(Duration::from_millis(10))).unwrap_err().is_timeout());
/// }
///
/// assert_eq!(pool.available_count(), 1);
/// ```
pub struct ResourcePool<F: ResourceFactory> {
    inner: Arc<PoolInner<F>>,
    return_fn: ReturnFn<F::Resource>,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Create the pool, blocking until every resource exists
    ///
    /// Fails with [`PoolError::Initialization`] if any resource cannot be
    /// created; no partially filled pool is ever returned.
    pub fn new(factory: F, config: PoolConfiguration) -> PoolResult<Self> {
        config.validate()?;

        let started = Instant::now();
        let store = Store::new(config.max_resources);
        startup::populate(
            &factory,
            &config.creation_parameters,
            config.max_resources,
            config.worker_count,
            &store,
        )?;

        info!(
            capacity = config.max_resources,
            workers = config.worker_count.min(config.max_resources),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resource pool ready"
        );

        let inner = Arc::new(PoolInner {
            factory,
            store,
            checked_out: DashMap::new(),
            config,
            metrics: MetricsTracker::new(),
        });
        let return_fn = Self::make_return_fn(&inner);

        Ok(Self { inner, return_fn })
    }

    /// Create the pool on the blocking thread pool
    pub async fn new_async(factory: F, config: PoolConfiguration) -> PoolResult<Self> {
        join_blocking(tokio::task::spawn_blocking(move || Self::new(factory, config)).await)
    }

    /// Check out a resource
    ///
    /// `None` falls back to the configured default timeout; with no default,
    /// or with a zero timeout, the call never blocks. An explicit timeout is
    /// always honored as given.
    pub fn acquire(&self, timeout: Option<Duration>) -> PoolResult<PooledResource<F::Resource>> {
        let wait = self.inner.config.resolve_timeout(timeout);
        let popped = match wait {
            Some(wait) => self.inner.store.pop_timeout(wait),
            None => self.inner.store.try_pop(),
        };

        match popped {
            Some((resource, id)) => {
                self.inner.checked_out.insert(id, Instant::now());
                self.inner.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
                debug!(resource_id = id, "Acquired pooled resource");
                Ok(PooledResource::new(resource, id, Arc::clone(&self.return_fn)))
            }
            None => {
                let waited = wait.unwrap_or(Duration::ZERO);
                self.inner.metrics.timeout_events.fetch_add(1, Ordering::Relaxed);
                debug!(
                    timeout_ms = waited.as_millis() as u64,
                    "No pooled resource available before timeout"
                );
                Err(PoolError::Timeout(waited))
            }
        }
    }

    /// Check out a resource only if one is available right now
    pub fn try_acquire(&self) -> Option<PooledResource<F::Resource>> {
        self.acquire(Some(Duration::ZERO)).ok()
    }

    /// Acquire without blocking the async runtime
    ///
    /// Blocking waits run on tokio's blocking thread pool. A resource obtained
    /// after the returned future was dropped goes straight back to the pool.
    pub async fn acquire_async(
        &self,
        timeout: Option<Duration>,
    ) -> PoolResult<PooledResource<F::Resource>> {
        if self.inner.config.resolve_timeout(timeout).is_none() {
            return self.acquire(timeout);
        }

        let pool = self.clone();
        join_blocking(tokio::task::spawn_blocking(move || pool.acquire(timeout)).await)
    }

    /// Run `body` with a checked-out resource, releasing it on every exit path
    ///
    /// The body does not run if no resource arrives within the timeout. If the
    /// body panics, the resource is released before the panic propagates.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
    /// use std::convert::Infallible;
    ///
    /// let pool = ResourcePool::new(
    ///     factory_fn(|_| Ok::<_, Infallible>(String::from("conn"))),
    ///     PoolConfiguration::new().with_max_resources(2),
    /// ).unwrap();
    ///
    /// let len = pool.with_resource(None, |conn| conn.len()).unwrap();
    /// assert_eq!(len, 4);
    /// assert_eq!(pool.available_count(), 2);
    /// ```
    pub fn with_resource<R, B>(&self, timeout: Option<Duration>, body: B) -> PoolResult<R>
    where
        B: FnOnce(&mut F::Resource) -> R,
    {
        let mut resource = self.acquire(timeout)?;
        Ok(body(&mut resource))
    }

    pub fn capacity(&self) -> usize {
        self.inner.store.capacity()
    }

    pub fn available_count(&self) -> usize {
        self.inner.store.len()
    }

    pub fn checked_out_count(&self) -> usize {
        self.inner.checked_out.len()
    }

    pub fn creation_parameters(&self) -> &CreationParameters {
        &self.inner.config.creation_parameters
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.get_metrics(
            self.checked_out_count(),
            self.available_count(),
            self.capacity(),
        )
    }

    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    pub fn get_health_status(&self) -> HealthStatus {
        let longest_checkout = self
            .inner
            .checked_out
            .iter()
            .map(|entry| entry.value().elapsed())
            .max();

        HealthStatus::new(
            self.available_count(),
            self.checked_out_count(),
            self.capacity(),
            longest_checkout,
        )
    }

    fn make_return_fn(inner: &Arc<PoolInner<F>>) -> ReturnFn<F::Resource> {
        let inner = Arc::clone(inner);
        Arc::new(move |resource, id| inner.release(resource, id))
    }
}

/// Unwrap a blocking task's result, re-raising its panic on the caller
fn join_blocking<T>(joined: Result<PoolResult<T>, JoinError>) -> PoolResult<T> {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
        Err(_) => Err(PoolError::Cancelled),
    }
}

impl<F: ResourceFactory> Clone for ResourcePool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            return_fn: Arc::clone(&self.return_fn),
        }
    }
}

impl<F: ResourceFactory> fmt::Debug for ResourcePool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.capacity())
            .field("available", &self.available_count())
            .field("checked_out", &self.checked_out_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::factory_fn;
    use std::convert::Infallible;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    fn counting_pool(capacity: usize) -> ResourcePool<impl ResourceFactory<Resource = usize>> {
        let next = AtomicUsize::new(1);
        let factory = factory_fn(move |_| Ok::<_, Infallible>(next.fetch_add(1, Ordering::SeqCst)));
        ResourcePool::new(factory, PoolConfiguration::new().with_max_resources(capacity)).unwrap()
    }

    struct Flaky;

    impl ResourceFactory for Flaky {
        type Resource = Vec<u8>;
        type Error = io::Error;

        fn create(&self, _params: &CreationParameters) -> Result<Vec<u8>, io::Error> {
            Ok(vec![1, 2, 3])
        }

        fn cleanup(&self, resource: &mut Vec<u8>) -> Result<(), io::Error> {
            if resource.contains(&0) {
                panic!("cannot reset poisoned buffer");
            }
            Err(io::Error::other("reset failed"))
        }
    }

    #[test]
    fn test_acquire_and_release() {
        let pool = counting_pool(3);

        {
            let resource = pool.acquire(None).unwrap();
            assert!((1..=3).contains(&*resource));
            assert_eq!(pool.available_count(), 2);
            assert_eq!(pool.checked_out_count(), 1);
        }

        assert_eq!(pool.available_count(), 3);
        assert_eq!(pool.checked_out_count(), 0);
    }

    #[test]
    fn test_explicit_release() {
        let pool = counting_pool(1);
        let resource = pool.acquire(None).unwrap();
        assert!(pool.try_acquire().is_none());

        resource.release();
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_zero_timeout_fails_immediately() {
        let pool = counting_pool(1);
        let _held = pool.acquire(None).unwrap();

        let err = pool.acquire(Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, PoolError::Timeout(d) if d.is_zero()));
        assert_eq!(pool.get_metrics().timeout_events, 1);
    }

    #[test]
    fn test_default_timeout_used_only_without_explicit_value() {
        let factory = factory_fn(|_| Ok::<_, Infallible>(()));
        let config = PoolConfiguration::new()
            .with_max_resources(1)
            .with_default_timeout(Duration::from_millis(40));
        let pool = ResourcePool::new(factory, config).unwrap();
        let _held = pool.acquire(None).unwrap();

        let start = Instant::now();
        let err = pool.acquire(None).unwrap_err();
        assert!(matches!(err, PoolError::Timeout(d) if d == Duration::from_millis(40)));
        assert!(start.elapsed() >= Duration::from_millis(40));

        let start = Instant::now();
        assert!(pool.acquire(Some(Duration::ZERO)).is_err());
        assert!(start.elapsed() < Duration::from_millis(40));
    }

    #[test]
    fn test_with_resource_releases_on_panic() {
        let pool = counting_pool(2);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.with_resource(None, |resource| {
                if *resource > 0 {
                    panic!("caller failed");
                }
                *resource
            })
            .unwrap()
        }));

        assert!(outcome.is_err());
        assert_eq!(pool.available_count(), 2);
        assert_eq!(pool.get_metrics().total_released, 1);
    }

    #[test]
    fn test_with_resource_skips_body_on_timeout() {
        let pool = counting_pool(1);
        let _held = pool.acquire(None).unwrap();
        let mut ran = false;

        let result = pool.with_resource(None, |_| ran = true);

        assert!(result.unwrap_err().is_timeout());
        assert!(!ran);
    }

    #[test]
    fn test_cleanup_failure_still_returns_resource() {
        let pool = ResourcePool::new(Flaky, PoolConfiguration::new().with_max_resources(1)).unwrap();

        pool.with_resource(None, |buffer| buffer.push(9)).unwrap();
        let mut buffer = pool.acquire(None).unwrap();
        buffer.push(0);
        buffer.release();

        let metrics = pool.get_metrics();
        assert_eq!(metrics.cleanup_failures, 2);
        assert_eq!(metrics.total_released, 2);
        assert_eq!(pool.available_count(), 1);

        let buffer = pool.acquire(None).unwrap();
        assert_eq!(*buffer, vec![1, 2, 3, 9, 0]);
    }

    #[test]
    fn test_resource_ids_are_stable() {
        let pool = counting_pool(1);
        let first = pool.acquire(None).unwrap();
        let (id, value) = (first.id(), *first);
        drop(first);

        let again = pool.acquire(None).unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(*again, value);
    }

    #[test]
    fn test_guard_outlives_pool_handle() {
        let pool = counting_pool(1);
        let resource = pool.acquire(None).unwrap();
        let other = pool.clone();
        drop(pool);

        drop(resource);
        assert_eq!(other.available_count(), 1);
    }

    #[test]
    fn test_health_tracks_checkouts() {
        let pool = counting_pool(1);
        let _held = pool.acquire(None).unwrap();

        let health = pool.get_health_status();
        assert!(!health.is_healthy());
        assert_eq!(health.checked_out, 1);
        assert!(health.longest_checkout.is_some());
    }

    #[tokio::test]
    async fn test_async_acquire() {
        let factory = factory_fn(|_| Ok::<_, Infallible>(5u8));
        let pool = ResourcePool::new_async(factory, PoolConfiguration::new().with_max_resources(1))
            .await
            .unwrap();

        let held = pool.acquire_async(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(*held, 5);

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire_async(Some(Duration::from_secs(5))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        let resource = waiter.await.unwrap().unwrap();
        assert_eq!(*resource, 5);
    }

    #[tokio::test]
    async fn test_dropped_async_acquire_returns_resource() {
        let pool = counting_pool(1);
        let held = pool.acquire(None).unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire_async(Some(Duration::from_secs(5))).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        drop(held);

        let deadline = Instant::now() + Duration::from_secs(2);
        while pool.available_count() < 1 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.checked_out_count(), 0);
    }

    #[tokio::test]
    async fn test_blocking_task_panic_is_resumed() {
        let joined = tokio::task::spawn_blocking(|| -> PoolResult<()> { panic!("acquire crashed") }).await;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| join_blocking(joined)));
        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"acquire crashed"));
    }

    #[tokio::test]
    async fn test_aborted_blocking_task_is_cancelled() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, PoolError>(())
        });
        handle.abort();

        assert!(matches!(join_blocking(handle.await), Err(PoolError::Cancelled)));
    }

    #[tokio::test]
    async fn test_async_acquire_times_out() {
        let pool = counting_pool(1);
        let _held = pool.acquire(None).unwrap();

        let err = pool.acquire_async(Some(Duration::from_millis(30))).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(pool.available_count(), 0);
    }
}
