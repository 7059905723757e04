//! Error types for the catalog client, the cache and the fetch controller.
//!
//! The controller never lets any of these escape a fetch task. They are
//! converted into a [`FetchError`] and published on the error signal instead.

use thiserror::Error;

use crate::catalog::{Field, Kind};

/// Failure talking to the remote catalog API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
  /// HTTP 404. The catalog also answers this way past the last page and for
  /// filters with no matches.
  #[error("not found: {url} ({message})")]
  NotFound { url: String, message: String },

  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },

  #[error("request failed: {0}")]
  Transport(String),

  #[error("invalid response: {0}")]
  Decode(String),

  #[error("invalid url '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
}

impl ApiError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound { .. })
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Transport(err.to_string())
    }
  }
}

/// Failure in the local cache store.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
  #[error("failed to open cache: {0}")]
  Open(String),

  #[error("cache read failed: {0}")]
  Read(String),

  #[error("cache write failed: {0}")]
  Write(String),
}

/// A non-fatal error published to observers of a controller.
///
/// The `Display` output is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  #[error("Error fetching {}: {message}", kind.plural())]
  Network { kind: Kind, message: String },

  #[error("Error loading cached {}: {message}", kind.plural())]
  CacheRead { kind: Kind, message: String },

  #[error("Error caching {}: {message}", kind.plural())]
  CacheWrite { kind: Kind, message: String },

  #[error("Error fetching {}: {message}", kind.plural())]
  Aborted { kind: Kind, message: String },
}

/// Errors returned by the imperative controller entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
  #[error("controller has stopped")]
  Closed,

  #[error("{kind} cannot be filtered by {field}")]
  UnsupportedField { kind: Kind, field: Field },
}

/// Errors from loading a single entity with its relations.
#[derive(Debug, Error)]
pub enum DetailError {
  #[error("{kind} {id} not found")]
  NotFound { kind: Kind, id: u32 },

  #[error("{kind} {id} is unavailable offline: {source}")]
  Unavailable {
    kind: Kind,
    id: u32,
    #[source]
    source: ApiError,
  },

  #[error(transparent)]
  Cache(#[from] CacheError),
}
