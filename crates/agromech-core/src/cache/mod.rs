//! Local cache of slowly-changing reference data.
//!
//! The active-hub list backs the location directory and rarely changes, so it
//! is kept on disk as JSON and reused until it goes stale.

pub mod manager;

pub use manager::{CacheManager, CachedData};
