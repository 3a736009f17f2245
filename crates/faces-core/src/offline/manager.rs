use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::{CacheEntry, CacheStorage, Network, OfflineError, Response};

/// Cache generation. Bumping it discards every older bucket on activate.
pub const CACHE_VERSION: &str = "github-faces-v1";

/// Data file refreshed on a date-based schedule.
pub const DATA_FILE: &str = "users.json";

/// Max age of the data file before it is fetched again.
pub const DATA_FILE_MAX_AGE_DAYS: i64 = 3;

/// Assets cached at install time, relative to the site origin.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./feed.xml",
    "./sitemap.xml",
    "./images/favicon.png",
];

/// Resources whose URL ends with `file_name` are refetched once their
/// freshness stamp is older than `max_age`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationPolicy {
    pub file_name: String,
    pub max_age: Duration,
}

impl ExpirationPolicy {
    pub fn new(file_name: impl Into<String>, max_age: Duration) -> Self {
        Self {
            file_name: file_name.into(),
            max_age,
        }
    }

    fn applies_to(&self, url: &Url) -> bool {
        url.path().ends_with(&self.file_name)
    }
}

pub fn default_policies() -> Vec<ExpirationPolicy> {
    vec![ExpirationPolicy::new(
        DATA_FILE,
        Duration::days(DATA_FILE_MAX_AGE_DAYS),
    )]
}

/// Lifecycle of one cache manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Created, nothing cached yet.
    Parsed = 0,
    /// Manifest cached; ready to replace an older instance right away.
    Installed = 1,
    /// Old buckets removed and open clients claimed.
    Activated = 2,
}

impl From<u8> for LifecycleState {
    fn from(v: u8) -> Self {
        match v {
            1 => LifecycleState::Installed,
            2 => LifecycleState::Activated,
            _ => LifecycleState::Parsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Network,
}

/// Outcome of intercepting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// Cross-origin: the cache does not touch it.
    Passthrough,
    Served {
        response: Response,
        source: ServedFrom,
        stored_at: Option<DateTime<Utc>>,
    },
}

impl Intercept {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Intercept::Passthrough => None,
            Intercept::Served { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ServedFrom> {
        match self {
            Intercept::Passthrough => None,
            Intercept::Served { source, .. } => Some(*source),
        }
    }
}

/// Serves the site's assets from a versioned cache.
///
/// Manifest assets are cached at install and served cache-first. Resources
/// matching an `ExpirationPolicy` are refetched when their freshness stamp
/// is missing or too old. Other same-origin requests read through the
/// cache but are never written to it.
pub struct OfflineCacheManager<N, S> {
    version: String,
    origin: Url,
    manifest: Vec<String>,
    policies: Vec<ExpirationPolicy>,
    network: N,
    storage: S,
    state: AtomicU8,
}

impl<N: Network, S: CacheStorage> OfflineCacheManager<N, S> {
    pub fn new(origin: Url, network: N, storage: S) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            origin,
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
            policies: default_policies(),
            network,
            storage,
            state: AtomicU8::new(LifecycleState::Parsed as u8),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_manifest(mut self, manifest: Vec<String>) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_policies(mut self, policies: Vec<ExpirationPolicy>) -> Self {
        self.policies = policies;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fetch every manifest asset and store them in the current bucket.
    ///
    /// All or nothing: if any fetch fails or returns a non-2xx status,
    /// nothing is written and the error is returned.
    pub async fn install(&self) -> Result<usize, OfflineError> {
        let urls = self
            .manifest
            .iter()
            .map(|path| self.origin.join(path))
            .collect::<Result<Vec<Url>, _>>()?;

        self.storage.open(&self.version).await?;

        let responses = try_join_all(urls.iter().map(|url| async move {
            let response = self.network.fetch(url).await?;
            if !response.is_success() {
                return Err(OfflineError::BadStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            }
            Ok((url.as_str(), response))
        }))
        .await?;

        let count = responses.len();
        for (key, response) in responses {
            self.storage
                .put(&self.version, key, CacheEntry::unstamped(response))
                .await?;
        }

        // Take over from any older instance without waiting
        self.state
            .store(LifecycleState::Installed as u8, Ordering::Release);
        info!(version = %self.version, assets = count, "Offline cache installed");
        Ok(count)
    }

    /// Delete every bucket from an older generation and claim clients.
    /// Returns the names of the deleted buckets.
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let mut deleted = Vec::new();
        for name in self.storage.bucket_names().await? {
            if name != self.version && self.storage.delete_bucket(&name).await? {
                debug!(bucket = %name, "Deleted stale cache bucket");
                deleted.push(name);
            }
        }

        self.state
            .store(LifecycleState::Activated as u8, Ordering::Release);
        info!(version = %self.version, removed = deleted.len(), "Offline cache activated");
        Ok(deleted)
    }

    /// Handle one request.
    pub async fn fetch(&self, url: &Url) -> Result<Intercept, OfflineError> {
        if url.origin() != self.origin.origin() {
            trace!(url = %url, "Cross-origin request, not intercepted");
            return Ok(Intercept::Passthrough);
        }

        match self.policies.iter().find(|p| p.applies_to(url)) {
            Some(policy) => self.fetch_with_policy(url, policy).await,
            None => self.cache_first(url).await,
        }
    }

    async fn fetch_with_policy(
        &self,
        url: &Url,
        policy: &ExpirationPolicy,
    ) -> Result<Intercept, OfflineError> {
        let key = url.as_str();
        let cached = self.lookup(key).await;

        if let Some(entry) = cached {
            if entry.is_fresh(policy.max_age, Utc::now()) {
                trace!(url = %url, "Serving fresh cached copy");
                return Ok(Intercept::Served {
                    response: entry.response,
                    source: ServedFrom::Cache,
                    stored_at: entry.stored_at,
                });
            }
            debug!(url = %url, stored_at = ?entry.stored_at, "Cached copy expired, refetching");
        }

        let response = self.network.fetch(url).await?;
        if !response.is_success() {
            return Ok(Intercept::Served {
                response,
                source: ServedFrom::Network,
                stored_at: None,
            });
        }

        let entry = CacheEntry::stamped(response);
        if let Err(e) = self.storage.put(&self.version, key, entry.clone()).await {
            warn!(url = %url, error = %e, "Failed to store refreshed response");
        }

        Ok(Intercept::Served {
            response: entry.response,
            source: ServedFrom::Network,
            stored_at: entry.stored_at,
        })
    }

    async fn cache_first(&self, url: &Url) -> Result<Intercept, OfflineError> {
        if let Some(entry) = self.lookup(url.as_str()).await {
            return Ok(Intercept::Served {
                response: entry.response,
                source: ServedFrom::Cache,
                stored_at: entry.stored_at,
            });
        }

        let response = self.network.fetch(url).await?;
        Ok(Intercept::Served {
            response,
            source: ServedFrom::Network,
            stored_at: None,
        })
    }

    /// Cache read; a storage error is treated as a miss.
    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.storage.get(&self.version, key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::offline::MemoryStorage;

    /// Network fake that counts calls and can fail on one path
    #[derive(Default)]
    struct FakeNetwork {
        calls: AtomicUsize,
        fail_path: Option<&'static str>,
    }

    #[async_trait]
    impl Network for FakeNetwork {
        async fn fetch(&self, url: &Url) -> Result<Response, OfflineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(url.path()) == self.fail_path {
                return Err(OfflineError::network(url.as_str(), "connection reset"));
            }
            Ok(Response::ok(format!("body of {}", url.path())))
        }
    }

    fn origin() -> Url {
        Url::parse("https://faces.example.org/").unwrap()
    }

    fn manager(network: FakeNetwork) -> OfflineCacheManager<FakeNetwork, MemoryStorage> {
        OfflineCacheManager::new(origin(), network, MemoryStorage::new())
    }

    fn data_url() -> Url {
        origin().join("users.json").unwrap()
    }

    async fn seed_data_file(m: &OfflineCacheManager<FakeNetwork, MemoryStorage>, age: Duration) {
        let entry = CacheEntry {
            response: Response::ok("old data"),
            stored_at: Some(Utc::now() - age),
        };
        m.storage()
            .put(CACHE_VERSION, data_url().as_str(), entry)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_data_file_is_refetched() {
        let m = manager(FakeNetwork::default());
        seed_data_file(&m, Duration::days(4)).await;
        let before = Utc::now();

        let result = m.fetch(&data_url()).await.unwrap();
        assert_eq!(result.source(), Some(ServedFrom::Network));
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 1);

        let stored = m
            .storage()
            .get(CACHE_VERSION, data_url().as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.response.body, "body of /users.json");
        assert!(stored.stored_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn test_fresh_data_file_served_from_cache() {
        let m = manager(FakeNetwork::default());
        seed_data_file(&m, Duration::days(1)).await;

        let result = m.fetch(&data_url()).await.unwrap();
        assert_eq!(result.source(), Some(ServedFrom::Cache));
        assert_eq!(result.response().unwrap().body, "old data");
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unstamped_data_file_is_refetched() {
        let m = manager(FakeNetwork::default());
        m.storage()
            .put(
                CACHE_VERSION,
                data_url().as_str(),
                CacheEntry::unstamped(Response::ok("no stamp")),
            )
            .await
            .unwrap();

        let result = m.fetch(&data_url()).await.unwrap();
        assert_eq!(result.source(), Some(ServedFrom::Network));
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_data_file_is_fetched_and_stored() {
        let m = manager(FakeNetwork::default());
        let first = m.fetch(&data_url()).await.unwrap();
        assert_eq!(first.source(), Some(ServedFrom::Network));

        let second = m.fetch(&data_url()).await.unwrap();
        assert_eq!(second.source(), Some(ServedFrom::Cache));
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cross_origin_is_not_intercepted() {
        let m = manager(FakeNetwork::default());
        let cdn = Url::parse("https://cdn.jsdelivr.net/npm/lib.js").unwrap();

        assert_eq!(m.fetch(&cdn).await.unwrap(), Intercept::Passthrough);
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 0);
        assert!(m.storage().bucket_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uncached_asset_is_read_through_not_stored() {
        let m = manager(FakeNetwork::default());
        let url = origin().join("images/faces/octocat.png").unwrap();

        let result = m.fetch(&url).await.unwrap();
        assert_eq!(result.source(), Some(ServedFrom::Network));
        assert!(m
            .storage()
            .get(CACHE_VERSION, url.as_str())
            .await
            .unwrap()
            .is_none());

        m.fetch(&url).await.unwrap();
        assert_eq!(m.network.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_install_caches_manifest() {
        let m = manager(FakeNetwork::default());
        let count = m.install().await.unwrap();
        assert_eq!(count, DEFAULT_MANIFEST.len());
        assert_eq!(m.state(), LifecycleState::Installed);

        let index = origin().join("index.html").unwrap();
        let result = m.fetch(&index).await.unwrap();
        assert_eq!(result.source(), Some(ServedFrom::Cache));
        assert_eq!(
            m.network.calls.load(Ordering::SeqCst),
            DEFAULT_MANIFEST.len()
        );
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let m = manager(FakeNetwork {
            fail_path: Some("/feed.xml"),
            ..Default::default()
        });

        let err = m.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::Network { .. }));
        assert_eq!(m.state(), LifecycleState::Parsed);

        let index = origin().join("index.html").unwrap();
        assert!(m
            .storage()
            .get(CACHE_VERSION, index.as_str())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_activate_removes_old_generations() {
        let m = manager(FakeNetwork::default());
        m.storage().open("github-faces-v0").await.unwrap();
        m.storage().open("something-else").await.unwrap();
        m.install().await.unwrap();

        let mut deleted = m.activate().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["github-faces-v0", "something-else"]);
        assert_eq!(m.storage().bucket_names().await.unwrap(), vec![CACHE_VERSION]);
        assert_eq!(m.state(), LifecycleState::Activated);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let m = manager(FakeNetwork {
            fail_path: Some("/users.json"),
            ..Default::default()
        });
        assert!(m.fetch(&data_url()).await.is_err());
    }

    #[test]
    fn test_policy_matching() {
        let policy = ExpirationPolicy::new("users.json", Duration::days(3));
        assert!(policy.applies_to(&Url::parse("https://x.org/users.json").unwrap()));
        assert!(policy.applies_to(&Url::parse("https://x.org/data/users.json?v=2").unwrap()));
        assert!(!policy.applies_to(&Url::parse("https://x.org/index.html").unwrap()));
    }
}
