//! Paginated, cache-backed browsing of the Rick and Morty catalog.
//!
//! A [`FetchController`](controller::FetchController) per entity kind pages
//! through the remote API, merges pages into one deduplicated list, writes
//! everything it fetches through to a local [`Cache`](cache::Cache) and
//! falls back to that cache when the network is unavailable.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod detail;
pub mod error;
pub mod logging;
pub mod query;
pub mod state;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod test_support;
