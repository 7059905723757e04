use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::query::Predicates;

use super::api_types::{ApiErrorBody, PageResponse};
use super::kind::{Entity, Kind};

/// Read-only access to the remote catalog.
///
/// Implementations must be safe to call concurrently. Timeouts and retries
/// belong to the implementation, not to its callers.
pub trait ApiClient: Send + Sync + 'static {
  /// `GET /{kind}?page={n}`
  fn list<T: Entity>(
    &self,
    page: u32,
  ) -> impl Future<Output = Result<PageResponse<T>, ApiError>> + Send;

  /// `GET /{kind}?{field}={value}&...&page={n}`
  fn filter<T: Entity>(
    &self,
    predicates: &Predicates,
    page: u32,
  ) -> impl Future<Output = Result<PageResponse<T>, ApiError>> + Send;

  /// `GET /{kind}/{id}`
  fn get_by_id<T: Entity>(&self, id: u32) -> impl Future<Output = Result<T, ApiError>> + Send;

  /// `GET {url}` for a relation url embedded in another record.
  fn get_by_url<T: Entity>(&self, url: &str) -> impl Future<Output = Result<T, ApiError>> + Send;
}

/// HTTP client for the catalog REST API.
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: Url,
}

impl CatalogClient {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let base_url = parse_base_url(&config.base_url)?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
      ))
      .build()
      .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { http, base_url })
  }

  /// Create a client around a pre-built `reqwest::Client`.
  pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
    Self {
      http,
      base_url: with_trailing_slash(base_url),
    }
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
    self.base_url.join(path).map_err(|e| ApiError::InvalidUrl {
      url: format!("{}{}", self.base_url, path),
      reason: e.to_string(),
    })
  }

  fn page_url(
    &self,
    kind: Kind,
    predicates: Option<&Predicates>,
    page: u32,
  ) -> Result<Url, ApiError> {
    let mut url = self.endpoint(kind.path())?;
    {
      let mut query = url.query_pairs_mut();
      if let Some(predicates) = predicates {
        for (field, value) in predicates.iter() {
          query.append_pair(field.as_str(), value);
        }
      }
      query.append_pair("page", &page.to_string());
    }
    Ok(url)
  }

  async fn get_json<R: DeserializeOwned>(&self, url: Url) -> Result<R, ApiError> {
    debug!(%url, "GET");

    let response = self.http.get(url.clone()).send().await?;
    let status = response.status();

    if status.is_success() {
      return response.json::<R>().await.map_err(ApiError::from);
    }

    let body = response.text().await.unwrap_or_default();
    trace!(%url, %status, %body, "error response");
    let message = serde_json::from_str::<ApiErrorBody>(&body)
      .map(|b| b.error)
      .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());

    if status == StatusCode::NOT_FOUND {
      Err(ApiError::NotFound {
        url: url.to_string(),
        message,
      })
    } else {
      Err(ApiError::Status {
        status: status.as_u16(),
        message,
      })
    }
  }
}

impl ApiClient for CatalogClient {
  async fn list<T: Entity>(&self, page: u32) -> Result<PageResponse<T>, ApiError> {
    let url = self.page_url(T::KIND, None, page)?;
    self.get_json(url).await
  }

  async fn filter<T: Entity>(
    &self,
    predicates: &Predicates,
    page: u32,
  ) -> Result<PageResponse<T>, ApiError> {
    let url = self.page_url(T::KIND, Some(predicates), page)?;
    self.get_json(url).await
  }

  async fn get_by_id<T: Entity>(&self, id: u32) -> Result<T, ApiError> {
    let url = self.endpoint(&format!("{}/{}", T::KIND.path(), id))?;
    self.get_json(url).await
  }

  async fn get_by_url<T: Entity>(&self, url: &str) -> Result<T, ApiError> {
    let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl {
      url: url.to_string(),
      reason: e.to_string(),
    })?;
    self.get_json(parsed).await
  }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
  let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl {
    url: raw.to_string(),
    reason: e.to_string(),
  })?;
  Ok(with_trailing_slash(url))
}

/// `Url::join` drops the last path segment unless the base ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url
}
