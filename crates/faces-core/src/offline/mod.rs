//! Offline cache for the generated site.
//!
//! `OfflineCacheManager` mirrors what the page's service worker does:
//! cache the static manifest at install, drop old cache generations at
//! activate, and answer requests cache-first, except for `users.json`
//! which is refetched once its freshness stamp is older than three days.
//!
//! Network and storage are traits so the logic runs against reqwest and an
//! in-memory store in production, and against fakes in tests.

pub mod error;
pub mod manager;
pub mod network;
pub mod storage;

pub use error::OfflineError;
pub use manager::{
    default_policies, ExpirationPolicy, Intercept, LifecycleState, OfflineCacheManager,
    ServedFrom, CACHE_VERSION, DATA_FILE, DATA_FILE_MAX_AGE_DAYS, DEFAULT_MANIFEST,
};
pub use network::{HttpNetwork, Network, Response};
pub use storage::{CacheEntry, CacheStorage, MemoryStorage};
