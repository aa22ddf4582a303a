//! Zone-balanced pallet loading for trailers.
//!
//! The `loader` module holds the X distribution strategy; `api` and `config`
//! expose it as an HTTP service.

pub mod api;
pub mod config;
pub mod geometry;
pub mod loader;
pub mod model;
pub mod search;
pub mod strategy;
pub mod types;
pub mod zones;
