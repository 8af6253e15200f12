use thiserror::Error;

/// Failure talking to the remote user source.
#[derive(Error, Debug)]
pub enum TransportError {
  #[error("Invalid URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("Not found: {url}")]
  NotFound { url: String },

  #[error("Status {status} from {url}: {body}")]
  Status {
    status: reqwest::StatusCode,
    url: String,
    body: String,
  },

  #[error("Invalid response from {url}: {source}")]
  InvalidResponse {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

impl TransportError {
  /// Truncate a response body to avoid carrying excessive data
  fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
      return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
      end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
  }

  pub fn from_status(status: reqwest::StatusCode, url: &str, body: &str) -> Self {
    if status == reqwest::StatusCode::NOT_FOUND {
      return TransportError::NotFound {
        url: url.to_string(),
      };
    }
    TransportError::Status {
      status,
      url: url.to_string(),
      body: Self::truncate_body(body),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, TransportError::NotFound { .. })
  }
}
