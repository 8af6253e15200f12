use crate::cache::{QueryResult, QueryStatus};
use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Border color for a panel backed by a query
pub fn status_color(status: QueryStatus) -> Color {
  match status {
    QueryStatus::Error => Color::Red,
    QueryStatus::Loading => Color::Yellow,
    QueryStatus::Success | QueryStatus::Idle => Color::Blue,
  }
}

/// Short suffix for a panel title, e.g. "refreshing" or "retry 2"
pub fn fetch_label<T>(result: &QueryResult<T>) -> Option<String> {
  if result.is_fetching && result.failure_count > 0 {
    Some(format!("retry {}", result.failure_count))
  } else if result.is_loading {
    Some("loading...".to_string())
  } else if result.is_fetching {
    Some("refreshing".to_string())
  } else if result.is_stale {
    Some("stale".to_string())
  } else {
    None
  }
}

/// Relative age of a timestamp, e.g. "12s ago"
pub fn age(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let secs = (now - updated_at).num_seconds().max(0);
  match secs {
    0..=59 => format!("{}s ago", secs),
    60..=3599 => format!("{}m ago", secs / 60),
    _ => format!("{}h ago", secs / 3600),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Zoë Ångström", 6), "Zoë...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(QueryStatus::Error), Color::Red);
    assert_eq!(status_color(QueryStatus::Loading), Color::Yellow);
    assert_eq!(status_color(QueryStatus::Success), Color::Blue);
  }

  #[test]
  fn test_fetch_label() {
    let mut result: QueryResult<()> = QueryResult::idle();
    assert_eq!(fetch_label(&result), None);

    result.is_fetching = true;
    result.is_loading = true;
    assert_eq!(fetch_label(&result).as_deref(), Some("loading..."));

    result.failure_count = 2;
    assert_eq!(fetch_label(&result).as_deref(), Some("retry 2"));

    result.is_loading = false;
    result.failure_count = 0;
    assert_eq!(fetch_label(&result).as_deref(), Some("refreshing"));

    result.is_fetching = false;
    result.is_stale = true;
    assert_eq!(fetch_label(&result).as_deref(), Some("stale"));
  }

  #[test]
  fn test_age() {
    let now = Utc::now();
    assert_eq!(age(now - Duration::seconds(12), now), "12s ago");
    assert_eq!(age(now - Duration::seconds(150), now), "2m ago");
    assert_eq!(age(now - Duration::hours(3), now), "3h ago");
    assert_eq!(age(now + Duration::seconds(5), now), "0s ago");
  }
}
