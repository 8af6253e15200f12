//! Query cache that orchestrates staleness, de-duplication and retries.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::result::{QueryError, QueryResult};
use super::retry::RetryPolicy;

/// A fetch in progress. Every clone resolves to the same value.
pub type InFlight<T> = Shared<BoxFuture<'static, Result<Arc<T>, QueryError>>>;

type EntryTable<T> = Arc<Mutex<HashMap<QueryKey, CacheEntry<T>>>>;

/// Per-read options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
  /// Disabled reads never hit the network
  pub enabled: bool,
  /// How long after a successful fetch data is served without refetching
  pub stale_time: Duration,
  pub retry: RetryPolicy,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: Duration::from_secs(5 * 60),
      retry: RetryPolicy::default(),
    }
  }
}

impl QueryOptions {
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }
}

struct CacheEntry<T> {
  data: Option<Arc<T>>,
  error: Option<QueryError>,
  failure_count: u32,
  /// Monotonic time of the last successful fetch, drives staleness
  resolved_at: Option<Instant>,
  /// Wall-clock time of the last successful fetch, for display
  updated_at: Option<DateTime<Utc>>,
  invalidated: bool,
  in_flight: Option<InFlight<T>>,
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self {
      data: None,
      error: None,
      failure_count: 0,
      resolved_at: None,
      updated_at: None,
      invalidated: false,
      in_flight: None,
    }
  }
}

impl<T> CacheEntry<T> {
  fn is_stale(&self, stale_time: Duration) -> bool {
    if self.invalidated {
      return true;
    }
    match self.resolved_at {
      Some(at) => at.elapsed() > stale_time,
      None => true,
    }
  }

  fn settle(&mut self, result: &Result<Arc<T>, QueryError>) {
    self.in_flight = None;
    match result {
      Ok(data) => {
        self.data = Some(Arc::clone(data));
        self.error = None;
        self.failure_count = 0;
        self.resolved_at = Some(Instant::now());
        self.updated_at = Some(Utc::now());
        self.invalidated = false;
      }
      Err(error) => {
        // Previously fetched data stays visible alongside the error
        self.failure_count = error.failure_count();
        self.error = Some(error.clone());
      }
    }
  }

  fn snapshot(&self, stale_time: Duration) -> QueryResult<T> {
    let is_fetching = self.in_flight.is_some();
    QueryResult {
      data: self.data.clone(),
      error: self.error.clone(),
      is_loading: self.data.is_none() && is_fetching,
      is_fetching,
      is_error: self.error.is_some(),
      is_success: self.data.is_some() && self.error.is_none(),
      is_stale: self.data.is_some() && self.is_stale(stale_time),
      failure_count: self.failure_count,
      updated_at: self.updated_at,
    }
  }
}

/// In-memory request cache.
///
/// Entries are created on first access and kept for the lifetime of the
/// cache. Cloning is cheap and every clone shares the same entry table, so
/// one cache can be handed to every view that needs it.
///
/// Fetches run on spawned tokio tasks: a reader that walks away does not
/// cancel the request, and a completed fetch only ever writes to the entry
/// of the key it was started for.
pub struct QueryCache<T> {
  entries: EntryTable<T>,
  defaults: QueryOptions,
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      entries: Arc::clone(&self.entries),
      defaults: self.defaults.clone(),
    }
  }
}

impl<T: Send + Sync + 'static> QueryCache<T> {
  /// Create a cache whose reads use `defaults` unless told otherwise.
  pub fn new(defaults: QueryOptions) -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      defaults,
    }
  }

  pub fn defaults(&self) -> &QueryOptions {
    &self.defaults
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry<T>>> {
    lock_table(&self.entries)
  }

  /// Read `key` with the default options.
  pub fn read<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let options = self.defaults.clone();
    self.read_with(key, fetcher, &options)
  }

  /// Return the current state of `key`, starting a fetch if needed.
  ///
  /// 1. Disabled - never fetch, report whatever is cached
  /// 2. Fetch already outstanding - join it
  /// 3. Missing, stale or invalidated - start a background fetch
  /// 4. Fresh - return cached data, no network call
  ///
  /// Must be called from within a tokio runtime.
  pub fn read_with<F, Fut, E>(
    &self,
    key: &QueryKey,
    fetcher: F,
    options: &QueryOptions,
  ) -> QueryResult<T>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let mut entries = self.lock();

    if !options.enabled {
      return entries
        .get(key)
        .map(|entry| entry.snapshot(options.stale_time))
        .unwrap_or_else(QueryResult::idle);
    }

    let entry = entries.entry(key.clone()).or_default();
    if entry.in_flight.is_some() {
      debug!(key = %key, "Joining in-flight fetch");
    } else if entry.is_stale(options.stale_time) {
      debug!(key = %key, has_data = entry.data.is_some(), "Cache miss or stale, fetching");
      self.spawn_fetch(entry, key, fetcher, options.retry.clone());
    } else {
      debug!(key = %key, "Cache fresh");
    }

    entry.snapshot(options.stale_time)
  }

  /// Resolve `key` with the default options.
  pub async fn fetch<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> Result<Arc<T>, QueryError>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let options = self.defaults.clone();
    self.fetch_with(key, fetcher, &options).await
  }

  /// Resolve `key`: fresh data returns immediately, otherwise the
  /// outstanding fetch is joined (or a new one started) and awaited.
  pub async fn fetch_with<F, Fut, E>(
    &self,
    key: &QueryKey,
    fetcher: F,
    options: &QueryOptions,
  ) -> Result<Arc<T>, QueryError>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let in_flight = {
      let mut entries = self.lock();
      let entry = entries.entry(key.clone()).or_default();
      match entry.in_flight.clone() {
        Some(in_flight) => in_flight,
        None => {
          if !entry.is_stale(options.stale_time) {
            if let Some(data) = &entry.data {
              return Ok(Arc::clone(data));
            }
          }
          self.spawn_fetch(entry, key, fetcher, options.retry.clone())
        }
      }
    };

    in_flight.await
  }

  /// Manual refetch with the default retry policy.
  pub fn refetch<F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> InFlight<T>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let retry = self.defaults.retry.clone();
    self.refetch_with(key, fetcher, retry)
  }

  /// Fetch `key` regardless of staleness.
  ///
  /// If a fetch is already outstanding it is returned instead of issuing a
  /// second request. The returned future may be dropped; the fetch keeps
  /// running and still updates the entry.
  pub fn refetch_with<F, Fut, E>(&self, key: &QueryKey, fetcher: F, retry: RetryPolicy) -> InFlight<T>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let mut entries = self.lock();
    let entry = entries.entry(key.clone()).or_default();
    match entry.in_flight.clone() {
      Some(in_flight) => {
        debug!(key = %key, "Refetch joined in-flight fetch");
        in_flight
      }
      None => {
        debug!(key = %key, "Manual refetch");
        self.spawn_fetch(entry, key, fetcher, retry)
      }
    }
  }

  /// Current state of `key` without triggering any fetch.
  pub fn peek(&self, key: &QueryKey) -> QueryResult<T> {
    self
      .lock()
      .get(key)
      .map(|entry| entry.snapshot(self.defaults.stale_time))
      .unwrap_or_else(QueryResult::idle)
  }

  /// Mark `key` stale so the next read refetches. Cached data stays visible.
  pub fn invalidate(&self, key: &QueryKey) {
    if let Some(entry) = self.lock().get_mut(key) {
      entry.invalidated = true;
    }
  }

  /// Wait until `key` has no fetch outstanding.
  pub async fn settled(&self, key: &QueryKey) {
    let in_flight = self.lock().get(key).and_then(|entry| entry.in_flight.clone());
    if let Some(in_flight) = in_flight {
      let _ = in_flight.await;
    }
  }

  fn spawn_fetch<F, Fut, E>(
    &self,
    entry: &mut CacheEntry<T>,
    key: &QueryKey,
    fetcher: F,
    retry: RetryPolicy,
  ) -> InFlight<T>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Error + Send + Sync + 'static,
  {
    let table = Arc::clone(&self.entries);
    let key = key.clone();

    let future = async move {
      let result = fetch_with_retry(&table, &key, fetcher, &retry).await;
      {
        let mut entries = lock_table(&table);
        entries.entry(key).or_default().settle(&result);
      }
      result
    }
    .boxed()
    .shared();

    entry.failure_count = 0;
    entry.in_flight = Some(future.clone());
    tokio::spawn(future.clone());
    future
  }
}

fn lock_table<T>(table: &EntryTable<T>) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry<T>>> {
  // Entry updates are single assignments, so a poisoned table is still consistent
  table.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn fetch_with_retry<T, F, Fut, E>(
  table: &EntryTable<T>,
  key: &QueryKey,
  fetcher: F,
  retry: &RetryPolicy,
) -> Result<Arc<T>, QueryError>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Error + Send + Sync + 'static,
{
  let mut failures = 0u32;
  loop {
    let error = match fetcher().await {
      Ok(data) => {
        debug!(key = %key, attempts = failures + 1, "Fetch succeeded");
        return Ok(Arc::new(data));
      }
      Err(error) => error,
    };

    failures += 1;
    if failures > retry.max_retries() {
      warn!(key = %key, failures, error = %error, "Fetch failed, giving up");
      return Err(QueryError::new(error, failures));
    }

    let delay = retry.delay_for(failures);
    warn!(
      key = %key,
      attempt = failures,
      delay_ms = delay.as_millis() as u64,
      error = %error,
      "Fetch failed, backing off"
    );
    drop(error);

    {
      let mut entries = lock_table(table);
      if let Some(entry) = entries.get_mut(key) {
        entry.failure_count = failures;
      }
    }

    tokio::time::sleep(delay).await;
  }
}
