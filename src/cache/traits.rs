//! The cache contract used by controllers and detail loaders.

use std::future::Future;

use crate::catalog::Entity;
use crate::error::CacheError;
use crate::query::{Predicates, QueryContext};

/// Local copy of records fetched from the catalog, partitioned by kind and
/// keyed by id.
///
/// Implementations must be safe for concurrent independent calls.
pub trait Cache: Send + Sync + 'static {
  /// Every cached record of `T`'s kind, ordered by id.
  fn get_all<T: Entity>(&self) -> impl Future<Output = Result<Vec<T>, CacheError>> + Send;

  /// Cached records whose fields contain each predicate's pattern.
  ///
  /// Best-effort: this approximates the server's filter semantics and may
  /// match more (or fewer) records than the remote query would.
  fn get_filtered<T: Entity>(
    &self,
    predicates: &Predicates,
  ) -> impl Future<Output = Result<Vec<T>, CacheError>> + Send;

  /// Cached records with the given ids, in request order. Missing ids are skipped.
  fn get_by_ids<T: Entity>(
    &self,
    ids: &[u32],
  ) -> impl Future<Output = Result<Vec<T>, CacheError>> + Send;

  /// Insert or overwrite records by id.
  fn upsert_all<T: Entity>(&self, items: &[T])
    -> impl Future<Output = Result<(), CacheError>> + Send;

  /// Cached records matching a query context.
  fn get_matching<T: Entity>(
    &self,
    context: &QueryContext,
  ) -> impl Future<Output = Result<Vec<T>, CacheError>> + Send {
    async move {
      match context {
        QueryContext::Browse => self.get_all().await,
        QueryContext::Filtered(predicates) => self.get_filtered(predicates).await,
      }
    }
  }
}
