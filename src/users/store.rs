//! Session-wide user state shared by every view.

use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::cache::{InFlight, QueryCache, QueryKey, QueryOptions, QueryResult};

use super::client::UserSource;
use super::error::TransportError;
use super::keys::UserQueryKey;
use super::types::{NewUser, User};

type ListFetcher = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<User>, TransportError>> + Send>;
type DetailFetcher = Box<dyn Fn() -> BoxFuture<'static, Result<User, TransportError>> + Send>;

/// User list and detail state backed by the request cache.
///
/// Created once at startup and cloned into each view; all clones share the
/// same cache entries, local additions and detail selection. Tests build an
/// isolated store per case over a fake `UserSource`.
#[derive(Clone)]
pub struct UserStore {
  source: Arc<dyn UserSource>,
  lists: QueryCache<Vec<User>>,
  details: QueryCache<User>,
  /// Users created in this session, never sent to the remote source
  local: Arc<Mutex<Vec<User>>>,
  selected: Arc<Mutex<Option<u64>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl UserStore {
  pub fn new(source: Arc<dyn UserSource>, options: QueryOptions) -> Self {
    Self {
      source,
      lists: QueryCache::new(options.clone()),
      details: QueryCache::new(options),
      local: Arc::new(Mutex::new(Vec::new())),
      selected: Arc::new(Mutex::new(None)),
    }
  }

  fn list_key() -> QueryKey {
    UserQueryKey::List.query_key()
  }

  fn detail_key(id: u64) -> QueryKey {
    UserQueryKey::Detail { id }.query_key()
  }

  fn list_fetcher(&self) -> ListFetcher {
    let source = Arc::clone(&self.source);
    Box::new(move || {
      let source = Arc::clone(&source);
      async move { source.list_users().await }.boxed()
    })
  }

  fn detail_fetcher(&self, id: u64) -> DetailFetcher {
    let source = Arc::clone(&self.source);
    Box::new(move || {
      let source = Arc::clone(&source);
      async move { source.get_user(id).await }.boxed()
    })
  }

  // ==========================================================================
  // List
  // ==========================================================================

  /// Read the user list, fetching it if missing or stale.
  pub fn load_list(&self) -> QueryResult<Vec<User>> {
    let result = self.lists.read(&Self::list_key(), self.list_fetcher());
    self.with_local(result)
  }

  /// Current user list without triggering a fetch.
  pub fn list(&self) -> QueryResult<Vec<User>> {
    self.with_local(self.lists.peek(&Self::list_key()))
  }

  /// Fetch the list again regardless of staleness.
  pub fn refetch_list(&self) -> InFlight<Vec<User>> {
    self.lists.refetch(&Self::list_key(), self.list_fetcher())
  }

  /// Remote users followed by local ones, in insertion order.
  fn with_local(&self, result: QueryResult<Vec<User>>) -> QueryResult<Vec<User>> {
    let local = {
      let remote = result.data().map(|v| v.as_slice()).unwrap_or(&[]);
      resolve_local_ids(&lock(&self.local), remote)
    };
    if local.is_empty() {
      return result;
    }

    result.map_data(|remote| {
      let mut users = remote.map(|r| r.as_ref().clone()).unwrap_or_default();
      users.extend(local);
      Some(Arc::new(users))
    })
  }

  fn remote_users(&self) -> Option<Arc<Vec<User>>> {
    self.lists.peek(&Self::list_key()).data
  }

  /// Append a locally-created user with the next free id.
  ///
  /// The id is one past the largest id currently listed (remote or local).
  pub fn add_local_user(&self, new_user: NewUser) -> User {
    let remote = self.remote_users();
    let remote = remote.as_deref().map(Vec::as_slice).unwrap_or(&[]);

    let mut local = lock(&self.local);
    let max_id = remote
      .iter()
      .map(|u| u.id)
      .chain(resolve_local_ids(&local, remote).iter().map(|u| u.id))
      .max()
      .unwrap_or(0);

    let user = new_user.with_id(max_id + 1);
    local.push(user.clone());
    info!(id = user.id, "Added local user");
    user
  }

  /// Local users with the ids they are currently listed under.
  pub fn local_users(&self) -> Vec<User> {
    let remote = self.remote_users();
    let remote = remote.as_deref().map(Vec::as_slice).unwrap_or(&[]);
    resolve_local_ids(&lock(&self.local), remote)
  }

  fn find_local(&self, id: u64) -> Option<User> {
    self.local_users().into_iter().find(|u| u.id == id)
  }

  // ==========================================================================
  // Detail
  // ==========================================================================

  /// Make `id` the current detail and start loading it.
  ///
  /// A previous selection's in-flight fetch keeps running and lands in its
  /// own entry; it never replaces the detail for `id`. Id 0 is treated as
  /// "nothing selected yet" and does not fetch.
  pub fn select_detail(&self, id: u64) -> QueryResult<User> {
    *lock(&self.selected) = Some(id);

    if let Some(user) = self.find_local(id) {
      debug!(id, "Selected local user");
      return local_result(user);
    }

    let options = self.details.defaults().clone().enabled(id > 0);
    self
      .details
      .read_with(&Self::detail_key(id), self.detail_fetcher(id), &options)
  }

  /// Drop the current selection. Cached details are kept.
  pub fn clear_detail(&self) {
    *lock(&self.selected) = None;
  }

  pub fn selected_id(&self) -> Option<u64> {
    *lock(&self.selected)
  }

  /// State of the currently selected detail, without triggering a fetch.
  pub fn detail(&self) -> QueryResult<User> {
    match self.selected_id() {
      None => QueryResult::idle(),
      Some(id) => match self.find_local(id) {
        Some(user) => local_result(user),
        None => self.details.peek(&Self::detail_key(id)),
      },
    }
  }

  /// Fetch the selected detail again. Returns None when there is nothing to fetch.
  pub fn refetch_detail(&self) -> Option<InFlight<User>> {
    let id = self.selected_id().filter(|id| *id > 0)?;
    if self.find_local(id).is_some() {
      return None;
    }
    Some(
      self
        .details
        .refetch(&Self::detail_key(id), self.detail_fetcher(id)),
    )
  }
}

/// Local users renumbered so none shares an id with `remote`.
///
/// A user added before the remote list loaded was numbered without it and
/// may collide with a remote id; it moves past the highest id seen so far.
/// Users added after the list loaded keep their id.
fn resolve_local_ids(local: &[User], remote: &[User]) -> Vec<User> {
  let mut last = remote.iter().map(|u| u.id).max().unwrap_or(0);
  local
    .iter()
    .map(|user| {
      let id = user.id.max(last + 1);
      last = id;
      User {
        id,
        ..user.clone()
      }
    })
    .collect()
}

fn local_result(user: User) -> QueryResult<User> {
  QueryResult {
    data: Some(Arc::new(user)),
    is_success: true,
    ..QueryResult::idle()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::RetryPolicy;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::time::Duration;

  struct FakeSource {
    users: Vec<User>,
    list_calls: AtomicUsize,
    detail_calls: Mutex<Vec<u64>>,
    fail_list: AtomicBool,
  }

  impl FakeSource {
    fn new(count: u64) -> Arc<Self> {
      let users = (1..=count)
        .map(|id| {
          NewUser {
            name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            ..Default::default()
          }
          .with_id(id)
        })
        .collect();
      Arc::new(Self {
        users,
        list_calls: AtomicUsize::new(0),
        detail_calls: Mutex::new(Vec::new()),
        fail_list: AtomicBool::new(false),
      })
    }
  }

  impl UserSource for FakeSource {
    fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TransportError>> {
      async move {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        if self.fail_list.load(Ordering::SeqCst) {
          return Err(TransportError::from_status(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "fake://users",
            "down",
          ));
        }
        Ok(self.users.clone())
      }
      .boxed()
    }

    fn get_user(&self, id: u64) -> BoxFuture<'_, Result<User, TransportError>> {
      async move {
        self.detail_calls.lock().unwrap().push(id);
        // Lower ids answer slower so earlier selections resolve last
        tokio::time::sleep(Duration::from_millis(1000 / id.max(1))).await;
        self
          .users
          .iter()
          .find(|u| u.id == id)
          .cloned()
          .ok_or_else(|| TransportError::NotFound {
            url: format!("fake://users/{}", id),
          })
      }
      .boxed()
    }
  }

  fn store(source: &Arc<FakeSource>) -> UserStore {
    let source: Arc<dyn UserSource> = source.clone();
    UserStore::new(source, QueryOptions::default())
  }

  async fn settle_list(store: &UserStore) {
    store.lists.settled(&UserStore::list_key()).await;
  }

  async fn settle_detail(store: &UserStore, id: u64) {
    store.details.settled(&UserStore::detail_key(id)).await;
  }

  fn new_user(name: &str) -> NewUser {
    NewUser {
      name: name.to_string(),
      email: "a@b.com".to_string(),
      ..Default::default()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_load_list() {
    let source = FakeSource::new(10);
    let store = store(&source);

    let result = store.load_list();
    assert!(result.is_loading);

    settle_list(&store).await;
    let result = store.list();
    assert!(result.is_success);
    assert_eq!(result.data().map(Vec::len), Some(10));
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_clones_share_state() {
    let source = FakeSource::new(3);
    let store = store(&source);
    let other = store.clone();

    store.load_list();
    other.load_list();
    settle_list(&store).await;

    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(other.list().data().map(Vec::len), Some(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_add_local_user_gets_next_id() {
    let source = FakeSource::new(10);
    let store = store(&source);
    store.load_list();
    settle_list(&store).await;

    let user = store.add_local_user(new_user("Ann"));
    assert_eq!(user.id, 11);

    let users = store.list();
    let users = users.data().unwrap();
    assert_eq!(users.len(), 11);
    assert_eq!(users.last().map(|u| u.name.as_str()), Some("Ann"));
    assert_eq!(users[..10].iter().map(|u| u.id).collect::<Vec<_>>(), (1..=10u64).collect::<Vec<_>>());

    let second = store.add_local_user(new_user("Bo"));
    assert_eq!(second.id, 12);
    assert_eq!(store.list().data().map(Vec::len), Some(12));
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_add_local_user_before_list_loads() {
    let source = FakeSource::new(10);
    let store = store(&source);

    let user = store.add_local_user(new_user("Ann"));
    assert_eq!(user.id, 1);

    let result = store.list();
    assert_eq!(result.data().map(Vec::len), Some(1));
    assert!(!result.is_success);
  }

  #[tokio::test(start_paused = true)]
  async fn test_early_local_user_moves_past_remote_ids() {
    let source = FakeSource::new(10);
    let store = store(&source);

    let ann = store.add_local_user(new_user("Ann"));
    assert_eq!(ann.id, 1);

    store.load_list();
    settle_list(&store).await;

    let ids: Vec<u64> = store.list().data().unwrap().iter().map(|u| u.id).collect();
    assert_eq!(ids, (1..=11u64).collect::<Vec<_>>());
    assert_eq!(store.local_users()[0].id, 11);

    // id 1 is the remote user again
    assert!(store.select_detail(1).is_loading);
    settle_detail(&store, 1).await;
    assert_eq!(store.detail().data().map(|u| u.name.as_str()), Some("User 1"));

    let result = store.select_detail(11);
    assert_eq!(result.data().map(|u| u.name.as_str()), Some("Ann"));
    assert_eq!(*source.detail_calls.lock().unwrap(), vec![1]);

    assert_eq!(store.add_local_user(new_user("Bo")).id, 12);
  }

  #[tokio::test(start_paused = true)]
  async fn test_local_users_survive_refetch() {
    let source = FakeSource::new(2);
    let store = store(&source);
    store.load_list();
    settle_list(&store).await;
    store.add_local_user(new_user("Ann"));

    store.refetch_list().await.unwrap();

    let ids: Vec<u64> = store.list().data().unwrap().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_list_error_is_captured() {
    let source = FakeSource::new(2);
    source.fail_list.store(true, Ordering::SeqCst);
    let store = store(&source);

    store.load_list();
    settle_list(&store).await;

    let result = store.list();
    assert!(result.is_error);
    assert!(!result.is_loading);
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 4);
    let error = result.error.unwrap();
    assert!(error.to_string().contains("503"));
    assert!(error.downcast_ref::<TransportError>().is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_detail_response_stays_in_its_entry() {
    let source = FakeSource::new(10);
    let store = store(&source);

    store.select_detail(5);
    store.select_detail(7);
    assert_eq!(store.selected_id(), Some(7));
    assert!(store.detail().is_loading);

    settle_detail(&store, 7).await;
    assert_eq!(store.detail().data().map(|u| u.id), Some(7));

    // id 5 answers later and must not replace the current detail
    settle_detail(&store, 5).await;
    assert_eq!(store.detail().data().map(|u| u.id), Some(7));
    let five = store.details.peek(&UserStore::detail_key(5));
    assert_eq!(five.data().map(|u| u.id), Some(5));

    // Both fetches ran once; the scheduler decides which started first
    let mut calls = source.detail_calls.lock().unwrap().clone();
    calls.sort_unstable();
    assert_eq!(calls, vec![5, 7]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reselecting_fresh_detail_uses_cache() {
    let source = FakeSource::new(10);
    let store = store(&source);

    store.select_detail(5);
    settle_detail(&store, 5).await;
    store.select_detail(7);
    settle_detail(&store, 7).await;
    let result = store.select_detail(5);

    assert!(result.is_success);
    assert!(!result.is_fetching);
    assert_eq!(*source.detail_calls.lock().unwrap(), vec![5, 7]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_zero_id_is_disabled() {
    let source = FakeSource::new(10);
    let store = store(&source);

    let result = store.select_detail(0);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!result.is_loading);
    assert!(!result.is_success);
    assert!(source.detail_calls.lock().unwrap().is_empty());
    assert!(store.refetch_detail().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_local_user_detail_needs_no_fetch() {
    let source = FakeSource::new(10);
    let store = store(&source);
    store.load_list();
    settle_list(&store).await;
    let ann = store.add_local_user(new_user("Ann"));

    let result = store.select_detail(ann.id);
    assert!(result.is_success);
    assert_eq!(result.data().map(|u| u.name.as_str()), Some("Ann"));
    assert!(source.detail_calls.lock().unwrap().is_empty());
    assert!(store.refetch_detail().is_none());
  }

  #[tokio::test(start_paused = true)]
  async fn test_missing_user_detail_errors() {
    let source = FakeSource::new(3);
    let options = QueryOptions::default().with_retry(RetryPolicy::never());
    let store = UserStore::new(source.clone(), options);

    store.select_detail(42);
    settle_detail(&store, 42).await;

    let result = store.detail();
    assert!(result.is_error);
    let error = result.error.unwrap();
    assert!(error
      .downcast_ref::<TransportError>()
      .is_some_and(TransportError::is_not_found));
  }

  #[tokio::test(start_paused = true)]
  async fn test_clear_detail_keeps_cache() {
    let source = FakeSource::new(10);
    let store = store(&source);

    store.select_detail(3);
    settle_detail(&store, 3).await;
    store.clear_detail();

    assert_eq!(store.selected_id(), None);
    assert!(store.detail().data().is_none());
    assert!(store.details.peek(&UserStore::detail_key(3)).is_success);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refetch_detail_hits_network() {
    let source = FakeSource::new(10);
    let store = store(&source);

    store.select_detail(2);
    settle_detail(&store, 2).await;
    let user = store.refetch_detail().unwrap().await.unwrap();

    assert_eq!(user.id, 2);
    assert_eq!(*source.detail_calls.lock().unwrap(), vec![2, 2]);
  }
}
