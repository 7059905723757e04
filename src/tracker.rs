//! Per-context page bookkeeping.

use std::collections::BTreeSet;

/// Tracks which pages are being fetched and whether the end of the result
/// set has been reached for the active query context.
#[derive(Debug, Default)]
pub struct PageTracker {
  in_flight: BTreeSet<u32>,
  is_last_page: bool,
}

impl PageTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Mark `page` as in flight.
  ///
  /// Returns false without changing anything if the page is already held
  /// or the last page has been seen.
  pub fn try_acquire(&mut self, page: u32) -> bool {
    if self.is_last_page {
      return false;
    }
    self.in_flight.insert(page)
  }

  /// Release `page`. Releasing a page that is not held is a no-op.
  pub fn release(&mut self, page: u32) {
    self.in_flight.remove(&page);
  }

  pub fn mark_last_page(&mut self) {
    self.is_last_page = true;
  }

  /// Reopen pagination after a non-empty page lands behind an end-of-data one.
  pub fn clear_last_page(&mut self) {
    self.is_last_page = false;
  }

  /// Forget all held pages and the end-of-data marker.
  pub fn reset(&mut self) {
    self.in_flight.clear();
    self.is_last_page = false;
  }

  pub fn is_last_page(&self) -> bool {
    self.is_last_page
  }

  pub fn is_in_flight(&self, page: u32) -> bool {
    self.in_flight.contains(&page)
  }

  /// True while any page is being fetched.
  pub fn is_busy(&self) -> bool {
    !self.in_flight.is_empty()
  }

  pub fn in_flight(&self) -> Vec<u32> {
    self.in_flight.iter().copied().collect()
  }
}
