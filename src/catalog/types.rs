//! Catalog records.
//!
//! Field names serialize to the same JSON keys the API uses, so the cache can
//! store a record verbatim and filter on its keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::{id_from_url, Entity, Identified, Kind};

/// Name + url reference to a location, as embedded in a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
  pub name: String,
  /// Empty when the location is unknown
  #[serde(default)]
  pub url: String,
}

impl LocationRef {
  pub fn id(&self) -> Option<u32> {
    id_from_url(&self.url)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub species: String,
  #[serde(rename = "type", default)]
  pub subtype: String,
  #[serde(default)]
  pub gender: String,
  #[serde(default)]
  pub origin: LocationRef,
  #[serde(default)]
  pub location: LocationRef,
  #[serde(default)]
  pub image: String,
  /// Urls of the episodes the character appears in
  #[serde(default)]
  pub episode: Vec<String>,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub id: u32,
  pub name: String,
  #[serde(rename = "type", default)]
  pub location_type: String,
  #[serde(default)]
  pub dimension: String,
  /// Urls of the characters last seen here
  #[serde(default)]
  pub residents: Vec<String>,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub air_date: String,
  /// Episode code, e.g. "S01E01"
  #[serde(default)]
  pub episode: String,
  #[serde(default)]
  pub characters: Vec<String>,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub created: Option<DateTime<Utc>>,
}

// ============================================================================
// Entity implementations
// ============================================================================

impl Identified for Character {
  fn id(&self) -> u32 {
    self.id
  }
}

impl Entity for Character {
  const KIND: Kind = Kind::Character;
  type Related = Episode;

  fn relation_urls(&self) -> &[String] {
    &self.episode
  }
}

impl Identified for Location {
  fn id(&self) -> u32 {
    self.id
  }
}

impl Entity for Location {
  const KIND: Kind = Kind::Location;
  type Related = Character;

  fn relation_urls(&self) -> &[String] {
    &self.residents
  }
}

impl Identified for Episode {
  fn id(&self) -> u32 {
    self.id
  }
}

impl Entity for Episode {
  const KIND: Kind = Kind::Episode;
  type Related = Character;

  fn relation_urls(&self) -> &[String] {
    &self.characters
  }
}

// ============================================================================
// One-line summaries for list output
// ============================================================================

impl fmt::Display for Character {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "#{:<4} {} ({}, {}, {})",
      self.id, self.name, self.status, self.species, self.gender
    )?;
    if !self.origin.name.is_empty() {
      write!(f, " from {}", self.origin.name)?;
    }
    Ok(())
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "#{:<4} {} ({}, {})",
      self.id, self.name, self.location_type, self.dimension
    )
  }
}

impl fmt::Display for Episode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "#{:<4} {} {} ({})",
      self.id, self.episode, self.name, self.air_date
    )
  }
}
