//! HTTP gateway for the remote user source.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

use super::error::TransportError;
use super::types::User;

/// Source of remote user records consumed by the store.
///
/// Implementations pass failures through unchanged; retrying is the cache's job.
pub trait UserSource: Send + Sync {
  fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TransportError>>;

  fn get_user(&self, id: u64) -> BoxFuture<'_, Result<User, TransportError>>;
}

/// REST client for `GET /users` and `GET /users/{id}`.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct UserClient {
  client: Client,
  base_url: Url,
}

impl UserClient {
  pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
    let mut builder = Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|source| TransportError::Request {
      url: config.base_url.clone(),
      source,
    })?;

    Self::with_client(client, &config.base_url)
  }

  /// Build a gateway around an existing reqwest client.
  pub fn with_client(client: Client, base_url: &str) -> Result<Self, TransportError> {
    let mut base_url = Url::parse(base_url)?;
    // Url::join replaces the last segment unless the path ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }
    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
    Ok(self.base_url.join(path)?)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
    let url = self.endpoint(path)?;
    debug!(url = %url, "GET");

    let response = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|source| TransportError::Request {
        url: url.to_string(),
        source,
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(TransportError::from_status(status, url.as_str(), &body));
    }

    response
      .json()
      .await
      .map_err(|source| TransportError::InvalidResponse {
        url: url.to_string(),
        source,
      })
  }

  /// Get all users
  pub async fn list_users(&self) -> Result<Vec<User>, TransportError> {
    self.get("users").await
  }

  /// Get a single user by id
  pub async fn get_user(&self, id: u64) -> Result<User, TransportError> {
    self.get(&format!("users/{}", id)).await
  }
}

impl UserSource for UserClient {
  fn list_users(&self) -> BoxFuture<'_, Result<Vec<User>, TransportError>> {
    UserClient::list_users(self).boxed()
  }

  fn get_user(&self, id: u64) -> BoxFuture<'_, Result<User, TransportError>> {
    UserClient::get_user(self, id).boxed()
  }
}
