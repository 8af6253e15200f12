//! In-memory search and ordering for the user list.

use super::types::User;

/// Case-insensitive substring match on name or email. An empty query keeps everything.
///
/// Whitespace in the query is matched as typed.
pub fn filter_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
  let needle = query.to_lowercase();
  if needle.is_empty() {
    return users.iter().collect();
  }

  users
    .iter()
    .filter(|user| {
      user.name.to_lowercase().contains(&needle) || user.email.to_lowercase().contains(&needle)
    })
    .collect()
}

/// Order by name, case-insensitive. Equal names keep their original order.
pub fn sort_by_name(users: &mut [&User]) {
  users.sort_by_cached_key(|user| user.name.to_lowercase());
}
