//! Read-through cache holding a single value plus the instant it was fetched.
//!
//! Readers load the current entry through an `ArcSwapOption`, so a refresh
//! swaps in a complete new entry and never exposes a torn value. Refreshes are
//! serialized by an async mutex; a caller that waited for another refresh
//! re-checks freshness before fetching again.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;

/// Decides whether a cached value of the given age may still be served.
pub trait FreshnessPolicy: Send + Sync {
    fn is_fresh(&self, age: Duration) -> bool;
}

/// Serves cached values strictly younger than the wrapped window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxAge(pub Duration);

impl FreshnessPolicy for MaxAge {
    fn is_fresh(&self, age: Duration) -> bool {
        age < self.0
    }
}

struct CachedValue<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

pub struct TtlCache<T> {
    entry: ArcSwapOption<CachedValue<T>>,
    freshness: Box<dyn FreshnessPolicy>,
    refresh_guard: Mutex<()>,
}

impl<T> std::fmt::Debug for TtlCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let age = self
            .entry
            .load()
            .as_ref()
            .map(|entry| entry.fetched_at.elapsed());
        f.debug_struct("TtlCache").field("age", &age).finish()
    }
}

impl<T> TtlCache<T>
where
    T: Send + Sync,
{
    pub fn new(freshness: impl FreshnessPolicy + 'static) -> Self {
        Self {
            entry: ArcSwapOption::empty(),
            freshness: Box::new(freshness),
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self::new(MaxAge(max_age))
    }

    /// Returns the cached value when one exists and is still fresh.
    pub fn get_fresh(&self) -> Option<Arc<T>> {
        let entry = self.entry.load_full()?;
        if self.freshness.is_fresh(entry.fetched_at.elapsed()) {
            Some(Arc::clone(&entry.value))
        } else {
            None
        }
    }

    /// Returns the fresh cached value or runs `fetch` and caches its output.
    ///
    /// A failed fetch leaves the previous entry untouched.
    pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get_fresh() {
            return Ok(value);
        }
        let _guard = self.refresh_guard.lock().await;
        if let Some(value) = self.get_fresh() {
            return Ok(value);
        }
        let value = fetch().await?;
        Ok(self.store(value))
    }

    /// Unconditionally fetches a new value and replaces the cached entry.
    pub async fn refresh<F, Fut, E>(&self, fetch: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let _guard = self.refresh_guard.lock().await;
        let value = fetch().await?;
        Ok(self.store(value))
    }

    pub fn store(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entry.store(Some(Arc::new(CachedValue {
            value: Arc::clone(&value),
            fetched_at: Instant::now(),
        })));
        value
    }

    pub fn invalidate(&self) {
        self.entry.store(None);
    }
}
