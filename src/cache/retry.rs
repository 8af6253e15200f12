//! Retry policy for failed fetches.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type DelayFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// How many times a failed fetch is retried and how long to wait in between.
///
/// `delay_for(n)` is the pause before retry `n` (1-indexed), so with the
/// default policy the first retry waits 2s, the second 4s and the third 8s.
#[derive(Clone)]
pub struct RetryPolicy {
  max_retries: u32,
  delay: DelayFn,
}

impl RetryPolicy {
  /// Create a policy with a custom delay function.
  pub fn new<F>(max_retries: u32, delay: F) -> Self
  where
    F: Fn(u32) -> Duration + Send + Sync + 'static,
  {
    Self {
      max_retries,
      delay: Arc::new(delay),
    }
  }

  /// Exponential backoff: `min(base * 2^attempt, cap)`.
  pub fn exponential(max_retries: u32, base: Duration, cap: Duration) -> Self {
    Self::new(max_retries, move |attempt| {
      base
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(cap)
    })
  }

  /// Surface the first failure immediately.
  pub fn never() -> Self {
    Self::new(0, |_| Duration::ZERO)
  }

  pub fn max_retries(&self) -> u32 {
    self.max_retries
  }

  /// Delay before retry `attempt` (1-indexed).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    (self.delay)(attempt)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::exponential(3, Duration::from_millis(1000), Duration::from_millis(30_000))
  }
}

impl fmt::Debug for RetryPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RetryPolicy")
      .field("max_retries", &self.max_retries)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_schedule() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries(), 3);
    assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
  }

  #[test]
  fn test_delay_is_capped() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_for(5), Duration::from_millis(30_000));
    assert_eq!(policy.delay_for(40), Duration::from_millis(30_000));
  }

  #[test]
  fn test_custom_delay_fn() {
    let policy = RetryPolicy::new(2, |attempt| Duration::from_millis(10 * attempt as u64));
    assert_eq!(policy.delay_for(2), Duration::from_millis(20));
  }

  #[test]
  fn test_never() {
    assert_eq!(RetryPolicy::never().max_retries(), 0);
  }
}
