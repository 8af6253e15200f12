//! Structured cache keys.

use std::fmt;

/// One element of a cache key tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Text(String),
  Int(u64),
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    KeyPart::Text(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    KeyPart::Text(value)
  }
}

impl From<u64> for KeyPart {
  fn from(value: u64) -> Self {
    KeyPart::Int(value)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Text(s) => write!(f, "\"{}\"", s),
      KeyPart::Int(n) => write!(f, "{}", n),
    }
  }
}

/// Ordered tuple identifying one cache entry.
///
/// Keys compare structurally: `["users", "detail", 5]` and
/// `["users", "detail", "5"]` are different entries, as are keys of
/// different length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  /// Start a key with its first part.
  pub fn new(root: impl Into<KeyPart>) -> Self {
    Self(vec![root.into()])
  }

  /// Append a part to the key.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, ",")?;
      }
      write!(f, "{}", part)?;
    }
    write!(f, "]")
  }
}
