//! Single-entity loading with related records.
//!
//! Online, the entity is fetched by id and its relation URLs are resolved
//! concurrently; everything fetched is written through to the cache. When
//! the network fails for any reason other than a 404, the entity and its
//! relations are assembled from the cache instead.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::catalog::{id_from_url, ApiClient, Entity};
use crate::error::{ApiError, DetailError};

/// Where a [`Detail`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  Network,
  /// Served from the cache because the network request failed
  Offline { reason: String },
}

#[derive(Debug, Clone)]
pub struct Detail<T: Entity> {
  pub entity: T,
  /// Resolved relations in the entity's relation order. Relations that could
  /// not be resolved are left out.
  pub related: Vec<T::Related>,
  pub source: Source,
}

impl<T: Entity> Detail<T> {
  pub fn is_offline(&self) -> bool {
    matches!(self.source, Source::Offline { .. })
  }
}

pub struct DetailLoader<A, C> {
  api: Arc<A>,
  cache: Arc<C>,
}

impl<A, C> Clone for DetailLoader<A, C> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
      cache: Arc::clone(&self.cache),
    }
  }
}

impl<A: ApiClient, C: Cache> DetailLoader<A, C> {
  pub fn new(api: Arc<A>, cache: Arc<C>) -> Self {
    Self { api, cache }
  }

  pub async fn load<T: Entity>(&self, id: u32) -> Result<Detail<T>, DetailError> {
    match self.api.get_by_id::<T>(id).await {
      Ok(entity) => Ok(self.resolve_online(entity).await),
      Err(error) if error.is_not_found() => Err(DetailError::NotFound { kind: T::KIND, id }),
      Err(error) => {
        warn!(kind = %T::KIND, id, %error, "detail fetch failed, trying cache");
        self.load_offline(id, error).await
      }
    }
  }

  async fn resolve_online<T: Entity>(&self, entity: T) -> Detail<T> {
    let urls = entity.relation_urls();
    let results = join_all(urls.iter().map(|url| self.api.get_by_url::<T::Related>(url))).await;

    let related: Vec<T::Related> = results
      .into_iter()
      .zip(urls)
      .filter_map(|(result, url)| match result {
        Ok(item) => Some(item),
        Err(error) => {
          warn!(%url, %error, "skipping unresolved relation");
          None
        }
      })
      .collect();

    debug!(
      kind = %T::KIND,
      id = entity.id(),
      related = related.len(),
      "resolved detail"
    );

    // Cache failures only cost offline coverage
    if let Err(error) = self.cache.upsert_all(std::slice::from_ref(&entity)).await {
      warn!(kind = %T::KIND, %error, "failed to cache detail");
    }
    if let Err(error) = self.cache.upsert_all(&related).await {
      warn!(kind = %T::KIND, %error, "failed to cache related records");
    }

    Detail {
      entity,
      related,
      source: Source::Network,
    }
  }

  async fn load_offline<T: Entity>(
    &self,
    id: u32,
    error: ApiError,
  ) -> Result<Detail<T>, DetailError> {
    let Some(entity) = self.cache.get_by_ids::<T>(&[id]).await?.into_iter().next() else {
      return Err(DetailError::Unavailable {
        kind: T::KIND,
        id,
        source: error,
      });
    };

    let ids: Vec<u32> = entity
      .relation_urls()
      .iter()
      .filter_map(|url| id_from_url(url))
      .collect();
    let related = self.cache.get_by_ids::<T::Related>(&ids).await?;

    Ok(Detail {
      entity,
      related,
      source: Source::Offline {
        reason: error.to_string(),
      },
    })
  }
}
