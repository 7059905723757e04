//! Serde types matching the catalog API envelopes.

use serde::Deserialize;

/// Pagination metadata returned alongside every list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageInfo {
  #[serde(default)]
  pub count: u32,
  #[serde(default)]
  pub pages: u32,
  pub next: Option<String>,
  pub prev: Option<String>,
}

/// One page of a list or filter query.
///
/// End of data is signalled by an empty `results` or by a 404 response.
#[derive(Debug, Clone, Deserialize)]
pub struct PageResponse<T> {
  #[serde(default)]
  pub info: PageInfo,
  #[serde(default = "Vec::new")]
  pub results: Vec<T>,
}

impl<T> PageResponse<T> {
  pub fn new(results: Vec<T>) -> Self {
    Self {
      info: PageInfo::default(),
      results,
    }
  }
}

/// Error body, e.g. `{"error":"There is nothing here"}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
  pub error: String,
}
