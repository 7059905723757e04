//! Scripted collaborators shared by controller and detail tests.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::cache::Cache;
use crate::catalog::{ApiClient, Entity, Identified, Kind, PageResponse};
use crate::error::{ApiError, CacheError};
use crate::query::Predicates;

/// Minimal entity filed under the character partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toon {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub friends: Vec<String>,
}

impl Identified for Toon {
  fn id(&self) -> u32 {
    self.id
  }
}

impl Entity for Toon {
  const KIND: Kind = Kind::Character;
  type Related = Toon;

  fn relation_urls(&self) -> &[String] {
    &self.friends
  }
}

pub fn toon(id: u32, name: &str) -> Toon {
  Toon {
    id,
    name: name.to_string(),
    friends: Vec::new(),
  }
}

pub fn toons(ids: &[u32]) -> Vec<Toon> {
  ids.iter().map(|id| toon(*id, &format!("toon {}", id))).collect()
}

pub fn toon_url(id: u32) -> String {
  format!("https://catalog.test/api/character/{}", id)
}

#[derive(Debug, Clone)]
pub enum Reply {
  Ok(Value),
  NotFound,
  Fail(String),
  Panic,
}

impl Reply {
  pub fn items(items: &[Toon]) -> Self {
    Reply::Ok(serde_json::to_value(items).unwrap())
  }

  pub fn entity(item: &Toon) -> Self {
    Reply::Ok(serde_json::to_value(item).unwrap())
  }

  fn resolve<R: DeserializeOwned>(self, url: &str) -> Result<R, ApiError> {
    match self {
      Reply::Ok(value) => {
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
      }
      Reply::NotFound => Err(ApiError::NotFound {
        url: url.to_string(),
        message: "nothing here".to_string(),
      }),
      Reply::Fail(message) => Err(ApiError::Transport(message)),
      Reply::Panic => panic!("scripted panic"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  List(u32),
  Filter(Predicates, u32),
  ById(u32),
  ByUrl(String),
}

type PageKey = (Option<Predicates>, u32);

/// [`ApiClient`] answering from a script. Unscripted pages are empty,
/// unscripted entities are 404. A gated page waits for one `notify_one`.
#[derive(Default)]
pub struct ScriptedApi {
  pages: Mutex<HashMap<PageKey, Reply>>,
  gates: Mutex<HashMap<PageKey, Arc<Notify>>>,
  served: Mutex<HashMap<PageKey, Arc<Notify>>>,
  entities: Mutex<HashMap<String, Reply>>,
  calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reply_list(&self, page: u32, reply: Reply) {
    self.pages.lock().unwrap().insert((None, page), reply);
  }

  pub fn reply_filter(&self, predicates: Predicates, page: u32, reply: Reply) {
    self
      .pages
      .lock()
      .unwrap()
      .insert((Some(predicates), page), reply);
  }

  pub fn gate_list(&self, page: u32) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self
      .gates
      .lock()
      .unwrap()
      .insert((None, page), Arc::clone(&gate));
    gate
  }

  /// Notified once a browse page has been answered.
  pub fn served_list(&self, page: u32) -> Arc<Notify> {
    let served = Arc::new(Notify::new());
    self
      .served
      .lock()
      .unwrap()
      .insert((None, page), Arc::clone(&served));
    served
  }

  pub fn reply_id(&self, id: u32, reply: Reply) {
    self
      .entities
      .lock()
      .unwrap()
      .insert(format!("id:{}", id), reply);
  }

  pub fn reply_url(&self, url: &str, reply: Reply) {
    self.entities.lock().unwrap().insert(url.to_string(), reply);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn count(&self, call: &Call) -> usize {
    self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
  }

  async fn page<T: Entity>(&self, key: PageKey, call: Call) -> Result<PageResponse<T>, ApiError> {
    self.calls.lock().unwrap().push(call);

    let gate = self.gates.lock().unwrap().get(&key).cloned();
    if let Some(gate) = gate {
      gate.notified().await;
    }

    let reply = self.pages.lock().unwrap().get(&key).cloned();
    let url = format!("page:{}", key.1);
    let result = reply
      .unwrap_or(Reply::Ok(Value::Array(Vec::new())))
      .resolve::<Vec<T>>(&url)
      .map(PageResponse::new);

    if let Some(served) = self.served.lock().unwrap().get(&key) {
      served.notify_one();
    }
    result
  }

  async fn entity<T: Entity>(&self, key: String, call: Call) -> Result<T, ApiError> {
    self.calls.lock().unwrap().push(call);
    let reply = self.entities.lock().unwrap().get(&key).cloned();
    reply.unwrap_or(Reply::NotFound).resolve(&key)
  }
}

impl ApiClient for ScriptedApi {
  async fn list<T: Entity>(&self, page: u32) -> Result<PageResponse<T>, ApiError> {
    self.page((None, page), Call::List(page)).await
  }

  async fn filter<T: Entity>(
    &self,
    predicates: &Predicates,
    page: u32,
  ) -> Result<PageResponse<T>, ApiError> {
    self
      .page(
        (Some(predicates.clone()), page),
        Call::Filter(predicates.clone(), page),
      )
      .await
  }

  async fn get_by_id<T: Entity>(&self, id: u32) -> Result<T, ApiError> {
    self.entity(format!("id:{}", id), Call::ById(id)).await
  }

  async fn get_by_url<T: Entity>(&self, url: &str) -> Result<T, ApiError> {
    self.entity(url.to_string(), Call::ByUrl(url.to_string())).await
  }
}

/// Cache whose every operation fails. A gated cache holds each read until
/// one `notify_one`.
#[derive(Default)]
pub struct FailingCache {
  read_gate: Option<Arc<Notify>>,
}

impl FailingCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn gated() -> (Self, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let cache = Self {
      read_gate: Some(Arc::clone(&gate)),
    };
    (cache, gate)
  }

  async fn read<T>(&self) -> Result<Vec<T>, CacheError> {
    if let Some(gate) = &self.read_gate {
      gate.notified().await;
    }
    Err(CacheError::Read("disk unavailable".to_string()))
  }
}

impl Cache for FailingCache {
  async fn get_all<T: Entity>(&self) -> Result<Vec<T>, CacheError> {
    self.read().await
  }

  async fn get_filtered<T: Entity>(&self, _predicates: &Predicates) -> Result<Vec<T>, CacheError> {
    self.read().await
  }

  async fn get_by_ids<T: Entity>(&self, _ids: &[u32]) -> Result<Vec<T>, CacheError> {
    self.read().await
  }

  async fn upsert_all<T: Entity>(&self, _items: &[T]) -> Result<(), CacheError> {
    Err(CacheError::Write("disk full".to_string()))
  }
}
