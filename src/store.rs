//! In-memory list of records for the active query context.

use std::collections::HashMap;

use crate::catalog::Identified;

/// Ordered list of records, unique by id.
///
/// When an incoming record collides with one already held, the existing
/// position is kept and the record's fields are overwritten. Order is the
/// order in which ids were first seen since the last [`replace`](Self::replace).
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
  items: Vec<T>,
  /// id -> position in `items`
  index: HashMap<u32, usize>,
}

impl<T> Default for EntityStore<T> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      index: HashMap::new(),
    }
  }
}

impl<T: Identified + Clone> EntityStore<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Discard the current list and start over with `items`.
  pub fn replace(&mut self, items: Vec<T>) {
    self.clear();
    self.merge(items);
  }

  /// Merge `items` after the current list.
  pub fn append(&mut self, items: Vec<T>) {
    self.merge(items);
  }

  pub fn clear(&mut self) {
    self.items.clear();
    self.index.clear();
  }

  pub fn snapshot(&self) -> Vec<T> {
    self.items.clone()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  fn merge(&mut self, items: Vec<T>) {
    for item in items {
      match self.index.get(&item.id()) {
        Some(&position) => self.items[position] = item,
        None => {
          self.index.insert(item.id(), self.items.len());
          self.items.push(item);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[derive(Debug, Clone, PartialEq)]
  struct Row {
    id: u32,
    name: &'static str,
  }

  impl Identified for Row {
    fn id(&self) -> u32 {
      self.id
    }
  }

  fn rows(ids: &[u32]) -> Vec<Row> {
    ids.iter().map(|&id| Row { id, name: "v1" }).collect()
  }

  fn ids(store: &EntityStore<Row>) -> Vec<u32> {
    store.snapshot().iter().map(|r| r.id).collect()
  }

  #[test]
  fn test_replace_discards_previous_items() {
    let mut store = EntityStore::new();
    store.append(rows(&[1, 2, 3]));

    store.replace(rows(&[4, 5]));
    assert_eq!(ids(&store), vec![4, 5]);
  }

  #[test]
  fn test_append_skips_known_ids_but_takes_new_values() {
    let mut store = EntityStore::new();
    store.replace(rows(&[1, 2, 3]));

    store.append(vec![
      Row { id: 4, name: "v1" },
      Row { id: 2, name: "v2" },
      Row { id: 5, name: "v1" },
    ]);

    assert_eq!(ids(&store), vec![1, 2, 3, 4, 5]);
    assert_eq!(store.snapshot()[1].name, "v2");
  }

  #[test]
  fn test_duplicates_within_one_batch() {
    let mut store = EntityStore::new();
    store.replace(vec![
      Row { id: 7, name: "v1" },
      Row { id: 8, name: "v1" },
      Row { id: 7, name: "v2" },
    ]);

    assert_eq!(ids(&store), vec![7, 8]);
    assert_eq!(store.snapshot()[0].name, "v2");
  }

  #[test]
  fn test_ids_stay_unique_across_mixed_operations() {
    let mut store = EntityStore::new();
    let batches: [(bool, &[u32]); 6] = [
      (false, &[1, 2, 3]),
      (false, &[3, 4, 5]),
      (true, &[5, 5, 6]),
      (false, &[1, 6, 7, 1]),
      (false, &[]),
      (true, &[9, 8, 9, 7]),
    ];

    for (is_replace, batch) in batches {
      if is_replace {
        store.replace(rows(batch));
      } else {
        store.append(rows(batch));
      }
      let snapshot = ids(&store);
      let unique: HashSet<u32> = snapshot.iter().copied().collect();
      assert_eq!(unique.len(), snapshot.len(), "duplicate id in {:?}", snapshot);
    }

    assert_eq!(ids(&store), vec![9, 8, 7]);
  }

  #[test]
  fn test_clear() {
    let mut store = EntityStore::new();
    store.append(rows(&[1]));
    store.clear();
    assert!(store.is_empty());
    store.append(rows(&[1]));
    assert_eq!(store.len(), 1);
  }
}
