//! Cache keys for user queries.

use crate::cache::QueryKey;

const ROOT: &str = "users";

/// Query key types for user API calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserQueryKey {
  /// All users
  List,
  /// A single user by id
  Detail { id: u64 },
}

impl UserQueryKey {
  /// `("users","list")` or `("users","detail", id)`
  pub fn query_key(&self) -> QueryKey {
    match self {
      Self::List => QueryKey::new(ROOT).with("list"),
      Self::Detail { id } => QueryKey::new(ROOT).with("detail").with(*id),
    }
  }
}

impl From<UserQueryKey> for QueryKey {
  fn from(key: UserQueryKey) -> Self {
    key.query_key()
  }
}
