//! Observable list state published by a controller.
//!
//! Four independent `watch` signals. A new subscriber sees the last value
//! immediately; intermediate values may be skipped (last value wins).

use std::sync::Arc;
use tokio::sync::watch;

use crate::error::FetchError;

pub struct ObservableState<T> {
  items: watch::Sender<Arc<Vec<T>>>,
  is_loading: watch::Sender<bool>,
  error: watch::Sender<Option<FetchError>>,
  no_results: watch::Sender<bool>,
}

impl<T> Default for ObservableState<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> ObservableState<T> {
  pub fn new() -> Self {
    let (items, _) = watch::channel(Arc::new(Vec::new()));
    let (is_loading, _) = watch::channel(false);
    let (error, _) = watch::channel(None);
    let (no_results, _) = watch::channel(false);

    Self {
      items,
      is_loading,
      error,
      no_results,
    }
  }

  // ── Current values ──────────────────────────────────────────────

  pub fn items(&self) -> Arc<Vec<T>> {
    Arc::clone(&self.items.borrow())
  }

  pub fn is_loading(&self) -> bool {
    *self.is_loading.borrow()
  }

  pub fn error(&self) -> Option<FetchError> {
    self.error.borrow().clone()
  }

  /// The user-facing text of the last error, if any.
  pub fn error_message(&self) -> Option<String> {
    self.error.borrow().as_ref().map(ToString::to_string)
  }

  pub fn no_results(&self) -> bool {
    *self.no_results.borrow()
  }

  // ── Subscriptions ───────────────────────────────────────────────

  pub fn subscribe_items(&self) -> watch::Receiver<Arc<Vec<T>>> {
    self.items.subscribe()
  }

  pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
    self.is_loading.subscribe()
  }

  pub fn subscribe_error(&self) -> watch::Receiver<Option<FetchError>> {
    self.error.subscribe()
  }

  pub fn subscribe_no_results(&self) -> watch::Receiver<bool> {
    self.no_results.subscribe()
  }

  // ── Publishing (controller only) ────────────────────────────────
  //
  // `send_replace`/`send_if_modified` store the value even with zero
  // receivers, unlike `send`.

  pub(crate) fn publish_items(&self, items: Vec<T>) {
    self.items.send_replace(Arc::new(items));
  }

  pub(crate) fn set_loading(&self, loading: bool) {
    set_flag(&self.is_loading, loading);
  }

  pub(crate) fn publish_error(&self, error: FetchError) {
    self.error.send_replace(Some(error));
  }

  pub(crate) fn set_no_results(&self, no_results: bool) {
    set_flag(&self.no_results, no_results);
  }
}

fn set_flag(sender: &watch::Sender<bool>, value: bool) {
  sender.send_if_modified(|current| {
    let changed = *current != value;
    *current = value;
    changed
  });
}
