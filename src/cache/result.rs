//! Observable state of a cache entry.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Failure recorded on a cache entry once retries are exhausted.
///
/// Cloneable so every caller awaiting the same in-flight fetch sees the same
/// error. The typed cause is kept and can be recovered with `downcast_ref`.
#[derive(Clone)]
pub struct QueryError {
  source: Arc<dyn Error + Send + Sync>,
  failure_count: u32,
}

impl QueryError {
  pub fn new<E>(source: E, failure_count: u32) -> Self
  where
    E: Error + Send + Sync + 'static,
  {
    Self {
      source: Arc::new(source),
      failure_count,
    }
  }

  /// Number of failed attempts, including retries.
  pub fn failure_count(&self) -> u32 {
    self.failure_count
  }

  pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
    self.source.downcast_ref::<E>()
  }
}

impl fmt::Debug for QueryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryError")
      .field("source", &self.source)
      .field("failure_count", &self.failure_count)
      .finish()
  }
}

impl fmt::Display for QueryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.source)
  }
}

impl Error for QueryError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    Some(self.source.as_ref())
  }
}

/// Coarse status for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data and nothing in flight (never read, or disabled)
  Idle,
  /// First fetch for this key is outstanding
  Loading,
  /// Data available and the last fetch succeeded
  Success,
  /// Last fetch failed after all retries
  Error,
}

/// Snapshot of a cache entry as seen by a reader.
#[derive(Debug)]
pub struct QueryResult<T> {
  pub data: Option<Arc<T>>,
  pub error: Option<QueryError>,
  /// No data yet and a fetch is outstanding
  pub is_loading: bool,
  /// Any fetch is outstanding, including background refreshes and retries
  pub is_fetching: bool,
  pub is_error: bool,
  pub is_success: bool,
  /// Data is older than the stale window (or was invalidated)
  pub is_stale: bool,
  /// Failed attempts of the current or last fetch
  pub failure_count: u32,
  /// When the data was last successfully fetched
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryResult<T> {
  /// Result for a key that has never been read or whose read is disabled.
  pub fn idle() -> Self {
    Self {
      data: None,
      error: None,
      is_loading: false,
      is_fetching: false,
      is_error: false,
      is_success: false,
      is_stale: false,
      failure_count: 0,
      updated_at: None,
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error_message(&self) -> Option<String> {
    self.error.as_ref().map(|e| e.to_string())
  }

  pub fn status(&self) -> QueryStatus {
    if self.is_error {
      QueryStatus::Error
    } else if self.is_loading {
      QueryStatus::Loading
    } else if self.is_success {
      QueryStatus::Success
    } else {
      QueryStatus::Idle
    }
  }

  /// Replace the data while keeping every status flag.
  pub fn map_data<U, F>(self, f: F) -> QueryResult<U>
  where
    F: FnOnce(Option<Arc<T>>) -> Option<Arc<U>>,
  {
    QueryResult {
      data: f(self.data),
      error: self.error,
      is_loading: self.is_loading,
      is_fetching: self.is_fetching,
      is_error: self.is_error,
      is_success: self.is_success,
      is_stale: self.is_stale,
      failure_count: self.failure_count,
      updated_at: self.updated_at,
    }
  }
}

impl<T> Clone for QueryResult<T> {
  fn clone(&self) -> Self {
    Self {
      data: self.data.clone(),
      error: self.error.clone(),
      is_loading: self.is_loading,
      is_fetching: self.is_fetching,
      is_error: self.is_error,
      is_success: self.is_success,
      is_stale: self.is_stale,
      failure_count: self.failure_count,
      updated_at: self.updated_at,
    }
  }
}
