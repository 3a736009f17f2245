//! Local caching of fetch results.
//!
//! `CacheManager` stores the enriched user list as timestamped JSON so a
//! render can run without touching the network and a fetch can be skipped
//! while the data is still fresh.

pub mod manager;

pub use manager::{CacheManager, CachedData};
