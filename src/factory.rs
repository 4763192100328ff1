//! Resource factories and their creation parameters

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Key/value configuration handed verbatim to the factory for every resource
///
/// # Examples
///
/// ```
/// use esox_resourcepool::CreationParameters;
///
/// let params = CreationParameters::new()
///     .with("host", "localhost")
///     .with("port", "5432");
///
/// assert_eq!(params.get("host"), Some("localhost"));
/// assert_eq!(params.get_parsed::<u16>("port"), Some(Ok(5432)));
/// assert_eq!(params.get("user"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CreationParameters {
    values: BTreeMap<String, String>,
}

impl CreationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter, returning the previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse a parameter into `T`; `None` when the key is missing
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<Result<T, T::Err>> {
        self.get(key).map(str::parse)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CreationParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Produces the resources a pool manages
///
/// `create` is invoked once per pool slot at startup, concurrently from the
/// startup worker threads. `cleanup` runs on the releasing thread each time a
/// resource goes back into the pool; the same resource is always returned to
/// the store, even when cleanup reports an error.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{CreationParameters, ResourceFactory};
/// use std::convert::Infallible;
///
/// struct Buffers;
///
/// impl ResourceFactory for Buffers {
///     type Resource = Vec<u8>;
///     type Error = Infallible;
///
///     fn create(&self, params: &CreationParameters) -> Result<Vec<u8>, Infallible> {
///         let size = params.get_parsed("size").and_then(Result::ok).unwrap_or(1024);
///         Ok(Vec::with_capacity(size))
///     }
///
///     fn cleanup(&self, buffer: &mut Vec<u8>) -> Result<(), Infallible> {
///         buffer.clear();
///         Ok(())
///     }
/// }
/// ```
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create one resource
    fn create(&self, params: &CreationParameters) -> Result<Self::Resource, Self::Error>;

    /// Reset a resource before it re-enters circulation
    fn cleanup(&self, _resource: &mut Self::Resource) -> Result<(), Self::Error> {
        Ok(())
    }
}

type CleanupFn<T, E> = Box<dyn Fn(&mut T) -> Result<(), E> + Send + Sync>;

/// Factory assembled from closures, see [`factory_fn`]
pub struct FnFactory<C, T, E> {
    create: C,
    cleanup: Option<CleanupFn<T, E>>,
    _marker: PhantomData<fn() -> (T, E)>,
}

/// Build a factory from a creation closure
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{factory_fn, PoolConfiguration, ResourcePool};
/// use std::convert::Infallible;
///
/// let factory = factory_fn(|_| Ok::<_, Infallible>(String::new()))
///     .with_cleanup(|s: &mut String| {
///         s.clear();
///         Ok(())
///     });
///
/// let pool = ResourcePool::new(factory, PoolConfiguration::new().with_max_resources(2)).unwrap();
/// assert_eq!(pool.available_count(), 2);
/// ```
pub fn factory_fn<C, T, E>(create: C) -> FnFactory<C, T, E>
where
    C: Fn(&CreationParameters) -> Result<T, E> + Send + Sync + 'static,
{
    FnFactory {
        create,
        cleanup: None,
        _marker: PhantomData,
    }
}

impl<C, T, E> FnFactory<C, T, E> {
    /// Attach a cleanup closure run on every release
    pub fn with_cleanup<K>(mut self, cleanup: K) -> Self
    where
        K: Fn(&mut T) -> Result<(), E> + Send + Sync + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }
}

impl<C, T, E> fmt::Debug for FnFactory<C, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory")
            .field("cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

impl<C, T, E> ResourceFactory for FnFactory<C, T, E>
where
    C: Fn(&CreationParameters) -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Resource = T;
    type Error = E;

    fn create(&self, params: &CreationParameters) -> Result<T, E> {
        (self.create)(params)
    }

    fn cleanup(&self, resource: &mut T) -> Result<(), E> {
        match self.cleanup {
            Some(ref cleanup) => cleanup(resource),
            None => Ok(()),
        }
    }
}
