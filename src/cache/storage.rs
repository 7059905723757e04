//! SQLite cache implementation and a no-op fallback.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::catalog::Entity;
use crate::error::CacheError;
use crate::query::Predicates;

use super::traits::Cache;

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Records stored as the JSON returned by the API
CREATE TABLE IF NOT EXISTS entity_cache (
    kind TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    data TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (kind, entity_id)
);
"#;

const UPSERT: &str = "INSERT INTO entity_cache (kind, entity_id, data, cached_at)
   VALUES (?1, ?2, ?3, datetime('now'))
   ON CONFLICT (kind, entity_id) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at";

/// SQLite-based cache.
///
/// Queries run on the blocking thread pool; the connection is shared behind
/// a mutex.
#[derive(Clone)]
pub struct SqliteCache {
  conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
  /// Open (or create) the cache database at `path`, or at the default
  /// location when `path` is `None`.
  pub fn open(path: Option<&Path>) -> Result<Self, CacheError> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| CacheError::Open(format!("failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      CacheError::Open(format!(
        "failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;
    debug!(path = %path.display(), "opened cache database");

    Self::with_connection(conn)
  }

  /// Open a private, non-persistent cache.
  pub fn open_in_memory() -> Result<Self, CacheError> {
    let conn = Connection::open_in_memory().map_err(|e| CacheError::Open(e.to_string()))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf, CacheError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| CacheError::Open("could not determine data directory".to_string()))?;

    Ok(data_dir.join("citadel").join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self, CacheError> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| CacheError::Open(format!("failed to run cache migrations: {}", e)))?;

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
    })
  }

  /// Run `f` against the connection on the blocking pool, mapping every
  /// failure with `error`.
  async fn run<R, F>(&self, error: fn(String) -> CacheError, f: F) -> Result<R, CacheError>
  where
    R: Send + 'static,
    F: FnOnce(&mut Connection) -> rusqlite::Result<R> + Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || {
      let mut conn = conn
        .lock()
        .map_err(|e| error(format!("lock poisoned: {}", e)))?;
      f(&mut conn).map_err(|e| error(e.to_string()))
    })
    .await
    .map_err(|e| error(format!("cache task failed: {}", e)))?
  }

  async fn query_data(&self, sql: String, args: Vec<Value>) -> Result<Vec<String>, CacheError> {
    self
      .run(CacheError::Read, move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(args), |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await
  }
}

impl Cache for SqliteCache {
  async fn get_all<T: Entity>(&self) -> Result<Vec<T>, CacheError> {
    let sql = "SELECT data FROM entity_cache WHERE kind = ?1 ORDER BY entity_id".to_string();
    let rows = self
      .query_data(sql, vec![Value::Text(T::KIND.path().to_string())])
      .await?;
    Ok(decode_rows(rows))
  }

  async fn get_filtered<T: Entity>(&self, predicates: &Predicates) -> Result<Vec<T>, CacheError> {
    let (sql, args) = filtered_query(T::KIND.path(), predicates);
    let rows = self.query_data(sql, args).await?;
    Ok(decode_rows(rows))
  }

  async fn get_by_ids<T: Entity>(&self, ids: &[u32]) -> Result<Vec<T>, CacheError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let placeholders = (0..ids.len())
      .map(|i| format!("?{}", i + 2))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "SELECT data FROM entity_cache WHERE kind = ?1 AND entity_id IN ({})",
      placeholders
    );
    let mut args = vec![Value::Text(T::KIND.path().to_string())];
    args.extend(ids.iter().map(|&id| Value::Integer(i64::from(id))));

    let found: HashMap<u32, T> = decode_rows::<T>(self.query_data(sql, args).await?)
      .into_iter()
      .map(|entity| (entity.id(), entity))
      .collect();

    // Request order, each id at most once
    let mut seen = std::collections::HashSet::new();
    Ok(
      ids
        .iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| found.get(id).cloned())
        .collect(),
    )
  }

  async fn upsert_all<T: Entity>(&self, items: &[T]) -> Result<(), CacheError> {
    if items.is_empty() {
      return Ok(());
    }

    let kind = T::KIND.path();
    let rows = items
      .iter()
      .map(|item| serde_json::to_string(item).map(|data| (item.id(), data)))
      .collect::<Result<Vec<(u32, String)>, _>>()
      .map_err(|e| CacheError::Write(format!("failed to serialize {}: {}", kind, e)))?;
    let count = rows.len();

    self
      .run(CacheError::Write, move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(UPSERT)?;
          for (id, data) in &rows {
            stmt.execute(params![kind, id, data])?;
          }
        }
        tx.commit()
      })
      .await?;

    debug!(kind, count, "cached records");
    Ok(())
  }
}

/// Build the filtered scan. Field names come from a closed enum, patterns are
/// bound as parameters.
fn filtered_query(kind: &str, predicates: &Predicates) -> (String, Vec<Value>) {
  let mut sql = String::from("SELECT data FROM entity_cache WHERE kind = ?1");
  let mut args = vec![Value::Text(kind.to_string())];

  for (field, pattern) in predicates.iter() {
    args.push(Value::Text(format!("%{}%", escape_like(pattern))));
    sql.push_str(&format!(
      " AND COALESCE(json_extract(data, '$.{}'), '') LIKE ?{} ESCAPE '\\'",
      field.as_str(),
      args.len()
    ));
  }

  sql.push_str(" ORDER BY entity_id");
  (sql, args)
}

fn escape_like(pattern: &str) -> String {
  let mut escaped = String::with_capacity(pattern.len());
  for c in pattern.chars() {
    if matches!(c, '\\' | '%' | '_') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

/// Deserialize stored rows, skipping any that no longer match the record shape.
fn decode_rows<T: Entity>(rows: Vec<String>) -> Vec<T> {
  let kind = T::KIND;
  rows
    .into_iter()
    .filter_map(|data| match serde_json::from_str(&data) {
      Ok(entity) => Some(entity),
      Err(e) => {
        warn!(%kind, error = %e, "skipping unreadable cache row");
        None
      }
    })
    .collect()
}

/// Cache that doesn't store anything.
/// Used when caching is disabled - reads miss and writes are discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl Cache for NoopCache {
  async fn get_all<T: Entity>(&self) -> Result<Vec<T>, CacheError> {
    Ok(Vec::new())
  }

  async fn get_filtered<T: Entity>(&self, _predicates: &Predicates) -> Result<Vec<T>, CacheError> {
    Ok(Vec::new())
  }

  async fn get_by_ids<T: Entity>(&self, _ids: &[u32]) -> Result<Vec<T>, CacheError> {
    Ok(Vec::new())
  }

  async fn upsert_all<T: Entity>(&self, _items: &[T]) -> Result<(), CacheError> {
    Ok(())
  }
}
