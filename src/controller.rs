//! Paginated list controller.
//!
//! A [`FetchController`] is a cheap handle to a worker task that owns all
//! list state for one entity kind: the active [`QueryContext`], the
//! [`PageTracker`] and the [`EntityStore`]. Every page request is served by
//! its own spawned fetch task; fetch tasks never touch list state, they
//! report back over a channel and the worker applies the outcome. Mutation
//! therefore never spans an await point and needs no locking.
//!
//! Results are applied in completion order. A context switch bumps the
//! generation counter; outcomes from an older generation are dropped.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::catalog::{ApiClient, Entity};
use crate::error::{ApiError, CacheError, ControllerError, FetchError};
use crate::query::{Predicates, QueryContext};
use crate::state::ObservableState;
use crate::store::EntityStore;
use crate::tracker::PageTracker;

/// Pagination bookkeeping at a quiet moment, see [`FetchController::settled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatus {
  /// Number of context switches so far
  pub generation: u64,
  pub current_page: u32,
  pub is_last_page: bool,
}

enum Command {
  RequestPage(u32),
  RequestNextPage,
  SetContext(QueryContext),
  Settled(oneshot::Sender<PageStatus>),
}

/// Messages from fetch tasks back to the worker.
enum TaskEvent<T> {
  /// Sent before the cache fallback starts, so the error shows up early.
  NetworkFailed {
    generation: u64,
    page: u32,
    error: ApiError,
  },
  Finished {
    generation: u64,
    page: u32,
    outcome: Outcome<T>,
  },
}

enum Outcome<T> {
  Loaded {
    items: Vec<T>,
    cache_error: Option<CacheError>,
  },
  /// Empty page or 404
  EndOfData,
  Fallback(Result<Vec<T>, CacheError>),
  Aborted(String),
}

/// Handle to a running list controller.
///
/// All entry points are fire-and-forget; observe results through
/// [`state`](Self::state). The worker stops once every handle is dropped.
pub struct FetchController<T: Entity> {
  commands: mpsc::UnboundedSender<Command>,
  state: Arc<ObservableState<T>>,
}

impl<T: Entity> Clone for FetchController<T> {
  fn clone(&self) -> Self {
    Self {
      commands: self.commands.clone(),
      state: Arc::clone(&self.state),
    }
  }
}

impl<T: Entity> FetchController<T> {
  /// Start a controller on the current tokio runtime.
  ///
  /// It begins in browse mode with nothing loaded.
  pub fn spawn<A: ApiClient, C: Cache>(api: Arc<A>, cache: Arc<C>) -> Self {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let state = Arc::new(ObservableState::new());

    let worker = Worker {
      api,
      cache,
      state: Arc::clone(&state),
      events: events_tx,
      context: QueryContext::Browse,
      generation: 0,
      current_page: 1,
      tracker: PageTracker::new(),
      store: EntityStore::new(),
      outstanding: 0,
      waiters: Vec::new(),
    };
    tokio::spawn(worker.run(commands_rx, events_rx));

    Self {
      commands: commands_tx,
      state,
    }
  }

  /// Fetch `page` (1-indexed) under the active context.
  ///
  /// No-op if the page is already being fetched or the end of data has been
  /// reached.
  pub fn request_page(&self, page: u32) -> Result<(), ControllerError> {
    self.send(Command::RequestPage(page))
  }

  /// Fetch the page after the last one merged.
  pub fn request_next_page(&self) -> Result<(), ControllerError> {
    self.send(Command::RequestNextPage)
  }

  /// Switch context, reset pagination and fetch page 1.
  ///
  /// Semantically empty filters switch to browse mode. In-flight results from
  /// the previous context are discarded when they arrive.
  pub fn set_query_context(&self, context: QueryContext) -> Result<(), ControllerError> {
    context.validate(T::KIND)?;
    self.send(Command::SetContext(context))
  }

  /// Search by name. A blank query returns to browse mode.
  pub fn search(&self, query: &str) -> Result<(), ControllerError> {
    self.set_query_context(QueryContext::search(query))
  }

  pub fn filter(&self, predicates: Predicates) -> Result<(), ControllerError> {
    self.set_query_context(QueryContext::filter(predicates))
  }

  /// Wait until no fetch task (of any context) is outstanding.
  pub async fn settled(&self) -> Result<PageStatus, ControllerError> {
    let (tx, rx) = oneshot::channel();
    self.send(Command::Settled(tx))?;
    rx.await.map_err(|_| ControllerError::Closed)
  }

  pub fn state(&self) -> &ObservableState<T> {
    &self.state
  }

  fn send(&self, command: Command) -> Result<(), ControllerError> {
    self
      .commands
      .send(command)
      .map_err(|_| ControllerError::Closed)
  }
}

struct Worker<T: Entity, A, C> {
  api: Arc<A>,
  cache: Arc<C>,
  state: Arc<ObservableState<T>>,
  events: mpsc::UnboundedSender<TaskEvent<T>>,

  context: QueryContext,
  /// Bumped on every context switch
  generation: u64,
  current_page: u32,
  tracker: PageTracker,
  store: EntityStore<T>,

  /// Spawned fetch tasks that have not reported `Finished`, any generation
  outstanding: usize,
  waiters: Vec<oneshot::Sender<PageStatus>>,
}

impl<T: Entity, A: ApiClient, C: Cache> Worker<T, A, C> {
  async fn run(
    mut self,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<TaskEvent<T>>,
  ) {
    loop {
      tokio::select! {
        biased;
        command = commands.recv() => match command {
          Some(command) => self.handle_command(command),
          None => break,
        },
        Some(event) = events.recv() => self.handle_event(event),
      }
    }
    debug!(kind = %T::KIND, "controller stopped");
  }

  fn handle_command(&mut self, command: Command) {
    match command {
      Command::RequestPage(page) => self.request_page(page),
      Command::RequestNextPage => self.request_page(self.current_page.saturating_add(1)),
      Command::SetContext(context) => self.set_context(context),
      Command::Settled(reply) => {
        if self.outstanding == 0 {
          let _ = reply.send(self.status());
        } else {
          self.waiters.push(reply);
        }
      }
    }
  }

  fn handle_event(&mut self, event: TaskEvent<T>) {
    let kind = T::KIND;
    match event {
      TaskEvent::NetworkFailed {
        generation,
        page,
        error,
      } => {
        if generation != self.generation {
          return;
        }
        warn!(%kind, page, %error, "page fetch failed, falling back to cache");
        self.state.publish_error(FetchError::Network {
          kind,
          message: error.to_string(),
        });
      }
      TaskEvent::Finished {
        generation,
        page,
        outcome,
      } => {
        self.outstanding = self.outstanding.saturating_sub(1);

        if generation == self.generation {
          self.apply(page, outcome);
          self.tracker.release(page);
          self.state.set_loading(self.tracker.is_busy());
        } else {
          debug!(
            %kind,
            page,
            generation,
            current = self.generation,
            "discarding result for superseded context"
          );
        }

        if self.outstanding == 0 {
          let status = self.status();
          for waiter in self.waiters.drain(..) {
            let _ = waiter.send(status);
          }
        }
      }
    }
  }

  fn request_page(&mut self, page: u32) {
    let kind = T::KIND;
    if page == 0 {
      warn!(%kind, "ignoring request for page 0, pages start at 1");
      return;
    }
    if !self.tracker.try_acquire(page) {
      debug!(
        %kind,
        page,
        last_page = self.tracker.is_last_page(),
        "page request skipped"
      );
      return;
    }

    self.state.set_loading(true);
    self.outstanding += 1;

    let api = Arc::clone(&self.api);
    let cache = Arc::clone(&self.cache);
    let context = self.context.clone();
    let generation = self.generation;
    let events = self.events.clone();
    debug!(%kind, page, generation, %context, "fetching page");

    tokio::spawn(async move {
      let outcome = AssertUnwindSafe(fetch_page(
        api.as_ref(),
        cache.as_ref(),
        &context,
        page,
        generation,
        &events,
      ))
      .catch_unwind()
      .await
      .unwrap_or_else(|panic| Outcome::Aborted(panic_message(panic.as_ref())));

      // The worker is gone if this fails; nothing left to update.
      let _ = events.send(TaskEvent::Finished {
        generation,
        page,
        outcome,
      });
    });
  }

  fn set_context(&mut self, context: QueryContext) {
    let context = context.normalized();
    self.generation += 1;
    info!(kind = %T::KIND, %context, generation = self.generation, "switching query context");

    self.context = context;
    self.current_page = 1;
    self.tracker.reset();
    self.store.clear();
    self.state.publish_items(Vec::new());
    self.state.set_no_results(false);
    self.state.set_loading(false);

    self.request_page(1);
  }

  fn apply(&mut self, page: u32, outcome: Outcome<T>) {
    let kind = T::KIND;
    match outcome {
      Outcome::Loaded { items, cache_error } => {
        let count = items.len();
        if page == 1 {
          self.store.replace(items);
          self.current_page = 1;
        } else {
          self.store.append(items);
          self.current_page = self.current_page.max(page);
        }
        info!(%kind, page, count, total = self.store.len(), "merged page");

        // A later page may have reported end of data first
        self.tracker.clear_last_page();
        self.state.publish_items(self.store.snapshot());
        self.state.set_no_results(false);

        if let Some(error) = cache_error {
          warn!(%kind, page, %error, "write-through to cache failed");
          self.state.publish_error(FetchError::CacheWrite {
            kind,
            message: error.to_string(),
          });
        }
      }
      Outcome::EndOfData => {
        info!(%kind, page, "reached end of data");
        self.tracker.mark_last_page();
        if page == 1 {
          self.store.clear();
          self.state.publish_items(Vec::new());
          self.state.set_no_results(true);
        }
      }
      Outcome::Fallback(Ok(items)) => {
        info!(%kind, page, count = items.len(), "serving cached records");
        let empty = items.is_empty();
        self.store.replace(items);
        self.state.publish_items(self.store.snapshot());
        self.state.set_no_results(empty);
      }
      Outcome::Fallback(Err(error)) => {
        warn!(%kind, page, %error, "cache fallback failed");
        self.state.publish_error(FetchError::CacheRead {
          kind,
          message: error.to_string(),
        });
      }
      Outcome::Aborted(message) => {
        warn!(%kind, page, %message, "fetch task aborted");
        self.state.publish_error(FetchError::Aborted { kind, message });
      }
    }
  }

  fn status(&self) -> PageStatus {
    PageStatus {
      generation: self.generation,
      current_page: self.current_page,
      is_last_page: self.tracker.is_last_page(),
    }
  }
}

/// Fetch one page and, depending on the result, write it through to the
/// cache or read the cache fallback. Runs outside the worker.
async fn fetch_page<T: Entity, A: ApiClient, C: Cache>(
  api: &A,
  cache: &C,
  context: &QueryContext,
  page: u32,
  generation: u64,
  events: &mpsc::UnboundedSender<TaskEvent<T>>,
) -> Outcome<T> {
  let response = match context {
    QueryContext::Browse => api.list::<T>(page).await,
    QueryContext::Filtered(predicates) => api.filter::<T>(predicates, page).await,
  };

  match response {
    Ok(response) if response.results.is_empty() => Outcome::EndOfData,
    Ok(response) => {
      let cache_error = cache.upsert_all(&response.results).await.err();
      Outcome::Loaded {
        items: response.results,
        cache_error,
      }
    }
    Err(error) if error.is_not_found() => Outcome::EndOfData,
    Err(error) => {
      let _ = events.send(TaskEvent::NetworkFailed {
        generation,
        page,
        error,
      });
      Outcome::Fallback(cache.get_matching::<T>(context).await)
    }
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "fetch task panicked".to_string()
  }
}
