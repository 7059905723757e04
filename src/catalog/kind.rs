//! Entity kinds, filterable fields and the traits shared by all catalog records.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// The three categories of records served by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
  Character,
  Location,
  Episode,
}

impl Kind {
  /// Path segment under the API base url, also used as the cache partition.
  pub fn path(self) -> &'static str {
    match self {
      Kind::Character => "character",
      Kind::Location => "location",
      Kind::Episode => "episode",
    }
  }

  pub fn plural(self) -> &'static str {
    match self {
      Kind::Character => "characters",
      Kind::Location => "locations",
      Kind::Episode => "episodes",
    }
  }

  /// Fields the remote API accepts as filter parameters for this kind.
  pub fn filter_fields(self) -> &'static [Field] {
    match self {
      Kind::Character => &[
        Field::Name,
        Field::Status,
        Field::Species,
        Field::Type,
        Field::Gender,
      ],
      Kind::Location => &[Field::Name, Field::Type, Field::Dimension],
      Kind::Episode => &[Field::Name, Field::Episode],
    }
  }

  pub fn supports(self, field: Field) -> bool {
    self.filter_fields().contains(&field)
  }
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

/// A named filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
  Name,
  Status,
  Species,
  Type,
  Gender,
  Dimension,
  /// Episode code, e.g. "S01E03"
  Episode,
}

impl Field {
  /// Query parameter name, identical to the JSON key of the record field.
  pub fn as_str(self) -> &'static str {
    match self {
      Field::Name => "name",
      Field::Status => "status",
      Field::Species => "species",
      Field::Type => "type",
      Field::Gender => "gender",
      Field::Dimension => "dimension",
      Field::Episode => "episode",
    }
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Anything with a stable integer identity.
///
/// Identity is the only key used for de-duplication.
pub trait Identified {
  fn id(&self) -> u32;
}

/// A catalog record that can be fetched, cached and listed.
pub trait Entity:
  Identified + Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
  const KIND: Kind;

  /// The kind of record referenced by [`Entity::relation_urls`].
  type Related: Entity;

  /// Absolute urls of related records (episodes of a character, residents
  /// of a location, characters of an episode).
  fn relation_urls(&self) -> &[String];
}

/// Extract the trailing numeric id from a record url such as
/// `https://rickandmortyapi.com/api/episode/28`.
pub fn id_from_url(url: &str) -> Option<u32> {
  url
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .and_then(|segment| segment.parse().ok())
}
