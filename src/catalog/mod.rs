//! The remote catalog: record types, entity kinds and the API client.

mod api_types;
mod client;
mod kind;
mod types;

pub use api_types::{PageInfo, PageResponse};
pub use client::{ApiClient, CatalogClient};
pub use kind::{id_from_url, Entity, Field, Identified, Kind};
pub use types::{Character, Episode, Location, LocationRef};
