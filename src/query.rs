//! Query contexts: what a list controller is currently showing.
//!
//! A controller is either browsing the unfiltered catalog page by page, or
//! paging through the results of a filter/search. Switching between the two
//! (or between two filters) resets pagination.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::{Field, Kind};
use crate::error::ControllerError;

/// Field → pattern map sent as query parameters to the filter endpoint.
///
/// Values are stored trimmed; blank values are dropped on insert, so an
/// empty map means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicates(BTreeMap<Field, String>);

impl Predicates {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
    self.insert(field, value);
    self
  }

  /// Set `field` to `value`, or clear it if `value` is blank.
  pub fn insert(&mut self, field: Field, value: impl Into<String>) {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
      self.0.remove(&field);
    } else {
      self.0.insert(field, trimmed.to_string());
    }
  }

  pub fn get(&self, field: Field) -> Option<&str> {
    self.0.get(&field).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
    self.0.iter().map(|(field, value)| (*field, value.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Check every field is a valid filter for `kind`.
  pub fn validate(&self, kind: Kind) -> Result<(), ControllerError> {
    match self.0.keys().find(|field| !kind.supports(**field)) {
      Some(field) => Err(ControllerError::UnsupportedField {
        kind,
        field: *field,
      }),
      None => Ok(()),
    }
  }
}

impl FromIterator<(Field, String)> for Predicates {
  fn from_iter<I: IntoIterator<Item = (Field, String)>>(iter: I) -> Self {
    let mut predicates = Predicates::new();
    for (field, value) in iter {
      predicates.insert(field, value);
    }
    predicates
  }
}

impl fmt::Display for Predicates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, value) in self.iter() {
      if !first {
        f.write_str(", ")?;
      }
      write!(f, "{}={}", field, value)?;
      first = false;
    }
    Ok(())
  }
}

/// The active query of a list controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum QueryContext {
  /// No filter; sequential pages from 1 upward
  #[default]
  Browse,
  /// Filtered or searched results
  Filtered(Predicates),
}

impl QueryContext {
  /// Name search. A blank query means browse.
  pub fn search(query: &str) -> Self {
    Self::filter(Predicates::new().with(Field::Name, query))
  }

  /// Structured filter. All-blank predicates mean browse.
  pub fn filter(predicates: Predicates) -> Self {
    if predicates.is_empty() {
      QueryContext::Browse
    } else {
      QueryContext::Filtered(predicates)
    }
  }

  /// Collapse a semantically empty filter into `Browse`.
  pub fn normalized(self) -> Self {
    match self {
      QueryContext::Filtered(predicates) => Self::filter(predicates),
      browse => browse,
    }
  }

  pub fn is_browse(&self) -> bool {
    matches!(self, QueryContext::Browse)
  }

  pub fn predicates(&self) -> Option<&Predicates> {
    match self {
      QueryContext::Browse => None,
      QueryContext::Filtered(predicates) => Some(predicates),
    }
  }

  pub fn validate(&self, kind: Kind) -> Result<(), ControllerError> {
    match self {
      QueryContext::Browse => Ok(()),
      QueryContext::Filtered(predicates) => predicates.validate(kind),
    }
  }
}

impl fmt::Display for QueryContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueryContext::Browse => f.write_str("browse"),
      QueryContext::Filtered(predicates) => write!(f, "filter({})", predicates),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_blank_values_are_dropped() {
    let predicates = Predicates::new()
      .with(Field::Name, "  rick ")
      .with(Field::Status, "   ")
      .with(Field::Gender, "");

    assert_eq!(predicates.len(), 1);
    assert_eq!(predicates.get(Field::Name), Some("rick"));
    assert_eq!(predicates.get(Field::Status), None);
  }

  #[test]
  fn test_insert_blank_clears_field() {
    let mut predicates = Predicates::new().with(Field::Species, "Alien");
    predicates.insert(Field::Species, " ");
    assert!(predicates.is_empty());
  }

  #[test]
  fn test_blank_search_is_browse() {
    assert_eq!(QueryContext::search("   "), QueryContext::Browse);
    assert!(QueryContext::search("").is_browse());

    let context = QueryContext::search("morty");
    assert_eq!(
      context.predicates().and_then(|p| p.get(Field::Name)),
      Some("morty")
    );
  }

  #[test]
  fn test_normalized_collapses_empty_filter() {
    let context = QueryContext::Filtered(Predicates::new());
    assert_eq!(context.normalized(), QueryContext::Browse);
  }

  #[test]
  fn test_validate_rejects_foreign_fields() {
    let context = QueryContext::filter(Predicates::new().with(Field::Dimension, "C-137"));
    assert!(context.validate(Kind::Location).is_ok());
    assert_eq!(
      context.validate(Kind::Character),
      Err(ControllerError::UnsupportedField {
        kind: Kind::Character,
        field: Field::Dimension,
      })
    );
  }

  #[test]
  fn test_display() {
    let context = QueryContext::filter(
      Predicates::new()
        .with(Field::Status, "dead")
        .with(Field::Name, "rick"),
    );
    assert_eq!(context.to_string(), "filter(name=rick, status=dead)");
    assert_eq!(QueryContext::Browse.to_string(), "browse");
  }
}
