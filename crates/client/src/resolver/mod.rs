//! Resource resolution: cache or network, and what to do when either fails.
//!
//! For every intercepted request the resolver decides which source to try
//! first, reconciles the outcome, and records network trouble so later
//! requests prefer the cache.
//!
//! ### Decision order
//! 1. Cache first when the caller asks for it, or when the adaptive mode is
//!    engaged and the caller did not opt out of it.
//! 2. A cache hit returns immediately, optionally refreshing the entry from
//!    the network in a detached task.
//! 3. Otherwise fetch. Only status 200 counts as success; the response is
//!    stored (GET only) and returned.
//! 4. On fetch failure: exact cache entry (network-first callers only, and
//!    engages the adaptive mode), then the entry stored without the query
//!    string, then a 408 placeholder.
//!
//! Resolution never fails. Cache and network errors are logged and treated
//! as misses.

pub mod adaptive;

use std::sync::Arc;

use offcache_core::{AppConfig, ResourceRequest, ResourceResponse, ResponseCache};

use crate::fetch::Fetcher;

pub use adaptive::AdaptiveMode;

/// Per-call resolution switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Consult the cache before the network.
    pub prefer_cache_first: bool,

    /// After a cache hit, fetch again in the background to update the entry
    /// for later requests. The current response is never affected.
    pub refresh_in_background: bool,

    /// Do not let the adaptive mode turn this call into a cache-first one.
    pub ignore_adaptive_flag: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { prefer_cache_first: true, refresh_in_background: false, ignore_adaptive_flag: false }
    }
}

impl From<&AppConfig> for ResolveOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            prefer_cache_first: config.prefer_cache_first,
            refresh_in_background: config.refresh_in_background,
            ignore_adaptive_flag: config.ignore_adaptive_flag,
        }
    }
}

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Exact cache entry.
    Cache,
    /// Fresh status-200 network response.
    Network,
    /// Cache entry stored under the identity without its query string.
    CacheWithoutQuery,
    /// Nothing answered; synthesized 408.
    Placeholder,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::CacheWithoutQuery => "cache_without_query",
            ResponseSource::Placeholder => "placeholder",
        }
    }
}

/// A response and its source.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub response: ResourceResponse,
    pub source: ResponseSource,
}

impl Resolved {
    fn new(response: ResourceResponse, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

/// Resolves requests against a [`ResponseCache`] and a [`Fetcher`].
pub struct Resolver<C, F> {
    cache: Arc<C>,
    fetcher: Arc<F>,
    adaptive: Arc<AdaptiveMode>,
}

impl<C, F> Clone for Resolver<C, F> {
    fn clone(&self) -> Self {
        Self { cache: Arc::clone(&self.cache), fetcher: Arc::clone(&self.fetcher), adaptive: Arc::clone(&self.adaptive) }
    }
}

impl<C, F> Resolver<C, F>
where
    C: ResponseCache + 'static,
    F: Fetcher + 'static,
{
    /// Create a resolver with a fresh, disengaged adaptive mode.
    pub fn new(cache: Arc<C>, fetcher: Arc<F>) -> Self {
        Self::with_adaptive_mode(cache, fetcher, Arc::new(AdaptiveMode::new()))
    }

    /// Create a resolver sharing an existing adaptive mode.
    pub fn with_adaptive_mode(cache: Arc<C>, fetcher: Arc<F>, adaptive: Arc<AdaptiveMode>) -> Self {
        Self { cache, fetcher, adaptive }
    }

    pub fn adaptive_mode(&self) -> &Arc<AdaptiveMode> {
        &self.adaptive
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Produce a response for `request`. Never fails.
    pub async fn resolve(&self, request: &ResourceRequest, options: ResolveOptions) -> ResourceResponse {
        self.resolve_with_source(request, options).await.response
    }

    /// Like [`Resolver::resolve`], also reporting where the response came from.
    pub async fn resolve_with_source(&self, request: &ResourceRequest, options: ResolveOptions) -> Resolved {
        let cache_first =
            options.prefer_cache_first || (self.adaptive.is_engaged() && !options.ignore_adaptive_flag);

        if cache_first && let Some(cached) = self.lookup(request.identity()).await {
            tracing::debug!("cache hit for {}", request.url);
            if options.refresh_in_background {
                self.spawn_refresh(request.clone());
            }
            return Resolved::new(cached, ResponseSource::Cache);
        }

        if let Some(fresh) = self.fetch_ok(request).await {
            self.store(request, &fresh).await;
            return Resolved::new(fresh, ResponseSource::Network);
        }

        if !options.prefer_cache_first
            && let Some(cached) = self.lookup(request.identity()).await
        {
            self.adaptive.engage();
            tracing::debug!("network failed, serving cached {}", request.url);
            return Resolved::new(cached, ResponseSource::Cache);
        }

        if let Some(base) = request.identity_without_query()
            && let Some(cached) = self.lookup(base).await
        {
            tracing::debug!("network failed, serving {} for {}", base, request.url);
            return Resolved::new(cached, ResponseSource::CacheWithoutQuery);
        }

        tracing::warn!("no cache or network response for {}", request.url);
        Resolved::new(ResourceResponse::network_error(), ResponseSource::Placeholder)
    }

    async fn lookup(&self, identity: &str) -> Option<ResourceResponse> {
        match self.cache.lookup(identity).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("cache lookup failed for {}: {}", identity, e);
                None
            }
        }
    }

    /// Fetch and keep the response only if it is a 200.
    async fn fetch_ok(&self, request: &ResourceRequest) -> Option<ResourceResponse> {
        match self.fetcher.fetch(request).await {
            Ok(response) if response.is_ok() => Some(response),
            Ok(response) => {
                tracing::debug!("can't fetch {} - status {}", request.url, response.status);
                None
            }
            Err(e) => {
                tracing::debug!("can't fetch {} - {}", request.url, e);
                None
            }
        }
    }

    async fn store(&self, request: &ResourceRequest, response: &ResourceResponse) {
        store_quietly(self.cache.as_ref(), request, response).await;
    }

    /// Refresh the entry for `request` without blocking the caller.
    fn spawn_refresh(&self, request: ResourceRequest) {
        let cache = Arc::clone(&self.cache);
        let fetcher = Arc::clone(&self.fetcher);

        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_ok() => store_quietly(cache.as_ref(), &request, &response).await,
                Ok(response) => tracing::debug!("background refresh of {} got {}", request.url, response.status),
                Err(e) => tracing::debug!("background refresh of {} failed: {}", request.url, e),
            }
        });
    }
}

/// Write to the cache, skipping non-GET requests and logging failures.
async fn store_quietly<C: ResponseCache + ?Sized>(cache: &C, request: &ResourceRequest, response: &ResourceResponse) {
    if !request.is_cacheable() {
        return;
    }

    if let Err(e) = cache.store(request, response).await {
        tracing::warn!("failed to cache {}: {}", request.url, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use offcache_core::{CacheDb, Error, MatchingCache, Method, NamedCache};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    const ORIGIN: &str = "https://app.test";

    /// Answers from a fixed route table; unknown URLs fail as unreachable.
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: Mutex<HashMap<String, ResourceResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn route(self, path: &str, status: u16, body: &'static str) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(format!("{ORIGIN}{path}"), ResourceResponse::new(status, vec![], body));
            self
        }

        fn calls_to(&self, path: &str) -> usize {
            let url = format!("{ORIGIN}{path}");
            self.calls.lock().unwrap().iter().filter(|c| **c == url).count()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
            self.calls.lock().unwrap().push(request.identity().to_string());
            self.routes
                .lock()
                .unwrap()
                .get(request.identity())
                .cloned()
                .ok_or_else(|| Error::NetworkUnreachable(format!("no route to {}", request.url)))
        }
    }

    /// Never answers.
    #[derive(Default)]
    struct StalledFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for StalledFetcher {
        async fn fetch(&self, _request: &ResourceRequest) -> Result<ResourceResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    /// A cache whose backend is gone.
    struct BrokenCache;

    #[async_trait]
    impl ResponseCache for BrokenCache {
        async fn lookup(&self, _identity: &str) -> Result<Option<ResourceResponse>, Error> {
            Err(Error::CorruptEntry("disk gone".into()))
        }

        async fn store(&self, _request: &ResourceRequest, _response: &ResourceResponse) -> Result<(), Error> {
            Err(Error::CorruptEntry("disk gone".into()))
        }
    }

    fn get(path: &str) -> ResourceRequest {
        ResourceRequest::get(Url::parse(&format!("{ORIGIN}{path}")).unwrap())
    }

    fn network_first() -> ResolveOptions {
        ResolveOptions { prefer_cache_first: false, ..Default::default() }
    }

    async fn cache() -> Arc<NamedCache> {
        let db = CacheDb::open_in_memory().await.unwrap();
        Arc::new(db.open_cache("app-cache-v1").await.unwrap())
    }

    async fn seed(cache: &NamedCache, path: &str, body: &'static str) {
        cache.put(&get(path), &ResourceResponse::new(200, vec![], body)).await.unwrap();
    }

    async fn cached_text(cache: &NamedCache, path: &str) -> Option<String> {
        cache
            .lookup(&format!("{ORIGIN}{path}"))
            .await
            .unwrap()
            .and_then(|r| r.text().map(str::to_string))
    }

    async fn eventually(mut check: impl AsyncFnMut() -> bool) {
        for _ in 0..200 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let cache = cache().await;
        seed(&cache, "/a.js", "cached").await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/a.js", 200, "fresh"));
        let resolver = Resolver::new(cache, Arc::clone(&fetcher));

        let resolved = resolver.resolve_with_source(&get("/a.js"), ResolveOptions::default()).await;

        assert_eq!(resolved.source, ResponseSource::Cache);
        assert_eq!(resolved.response.text(), Some("cached"));
        assert_eq!(fetcher.calls_to("/a.js"), 0);
    }

    #[tokio::test]
    async fn test_background_refresh_updates_cache_for_next_call() {
        let cache = cache().await;
        seed(&cache, "/a.js", "cached").await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/a.js", 200, "fresh"));
        let resolver = Resolver::new(Arc::clone(&cache), Arc::clone(&fetcher));
        let options = ResolveOptions { refresh_in_background: true, ..Default::default() };

        let response = resolver.resolve(&get("/a.js"), options).await;
        assert_eq!(response.text(), Some("cached"));

        eventually(async || cached_text(&cache, "/a.js").await.as_deref() == Some("fresh")).await;
        assert_eq!(fetcher.calls_to("/a.js"), 1);

        let next = resolver.resolve(&get("/a.js"), ResolveOptions::default()).await;
        assert_eq!(next.text(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_background_refresh_does_not_block_caller() {
        let cache = cache().await;
        seed(&cache, "/a.js", "cached").await;
        let fetcher = Arc::new(StalledFetcher::default());
        let resolver = Resolver::new(cache, Arc::clone(&fetcher));
        let options = ResolveOptions { refresh_in_background: true, ..Default::default() };

        let response = tokio::time::timeout(Duration::from_secs(1), resolver.resolve(&get("/a.js"), options))
            .await
            .expect("resolve waited on the refresh");

        assert_eq!(response.text(), Some("cached"));
        eventually(async || fetcher.calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_background_refresh_failure_keeps_entry() {
        let cache = cache().await;
        seed(&cache, "/a.js", "cached").await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/a.js", 503, "busy"));
        let resolver = Resolver::new(Arc::clone(&cache), Arc::clone(&fetcher));
        let options = ResolveOptions { refresh_in_background: true, ..Default::default() };

        let response = resolver.resolve(&get("/a.js"), options).await;
        assert_eq!(response.text(), Some("cached"));

        eventually(async || fetcher.calls_to("/a.js") == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cached_text(&cache, "/a.js").await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_cache_first_miss_goes_to_network() {
        let cache = cache().await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/a.js", 200, "fresh"));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);

        let resolved = resolver.resolve_with_source(&get("/a.js"), ResolveOptions::default()).await;

        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(cached_text(&cache, "/a.js").await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_network_first_success_populates_cache() {
        let cache = cache().await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/b.css", 200, "body{}"));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);

        let resolved = resolver.resolve_with_source(&get("/b.css"), network_first()).await;

        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(resolved.response.text(), Some("body{}"));
        assert_eq!(cached_text(&cache, "/b.css").await.as_deref(), Some("body{}"));
        assert!(!resolver.adaptive_mode().is_engaged());
    }

    #[tokio::test]
    async fn test_network_first_overwrites_previous_entry() {
        let cache = cache().await;
        seed(&cache, "/b.css", "old").await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/b.css", 200, "new"));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);

        resolver.resolve(&get("/b.css"), network_first()).await;

        assert_eq!(cached_text(&cache, "/b.css").await.as_deref(), Some("new"));
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_engages_cache_first() {
        let cache = cache().await;
        seed(&cache, "/c.js", "cached-c").await;
        seed(&cache, "/d.js", "cached-d").await;
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .route("/c.js", 500, "oops")
                .route("/d.js", 200, "fresh-d"),
        );
        let resolver = Resolver::new(cache, Arc::clone(&fetcher));

        let first = resolver.resolve_with_source(&get("/c.js"), network_first()).await;
        assert_eq!(first.source, ResponseSource::Cache);
        assert_eq!(first.response.text(), Some("cached-c"));
        assert!(resolver.adaptive_mode().is_engaged());

        let second = resolver.resolve_with_source(&get("/d.js"), network_first()).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.text(), Some("cached-d"));
        assert_eq!(fetcher.calls_to("/d.js"), 0);
    }

    #[tokio::test]
    async fn test_adaptive_mode_never_resets() {
        let cache = cache().await;
        seed(&cache, "/c.js", "cached-c").await;
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .route("/c.js", 500, "oops")
                .route("/e.js", 200, "fresh-e"),
        );
        let resolver = Resolver::new(cache, fetcher);

        resolver.resolve(&get("/c.js"), network_first()).await;
        let ok = resolver.resolve_with_source(&get("/e.js"), network_first()).await;

        assert_eq!(ok.source, ResponseSource::Network);
        assert!(resolver.adaptive_mode().is_engaged());
    }

    #[tokio::test]
    async fn test_ignore_adaptive_flag_keeps_network_first() {
        let cache = cache().await;
        seed(&cache, "/d.js", "cached-d").await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/d.js", 200, "fresh-d"));
        let adaptive = Arc::new(AdaptiveMode::new());
        adaptive.engage();
        let resolver = Resolver::with_adaptive_mode(cache, Arc::clone(&fetcher), adaptive);
        let options = ResolveOptions { ignore_adaptive_flag: true, ..network_first() };

        let resolved = resolver.resolve_with_source(&get("/d.js"), options).await;

        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(resolved.response.text(), Some("fresh-d"));
        assert_eq!(fetcher.calls_to("/d.js"), 1);
    }

    #[tokio::test]
    async fn test_network_first_failure_without_entry_leaves_flag() {
        let cache = cache().await;
        let resolver = Resolver::new(cache, Arc::new(ScriptedFetcher::default()));

        let resolved = resolver.resolve_with_source(&get("/missing.js"), network_first()).await;

        assert_eq!(resolved.source, ResponseSource::Placeholder);
        assert!(!resolver.adaptive_mode().is_engaged());
    }

    #[tokio::test]
    async fn test_query_string_fallback() {
        let cache = cache().await;
        seed(&cache, "/bundle.js", "bundle").await;
        let resolver = Resolver::new(cache, Arc::new(ScriptedFetcher::default()));

        for options in [ResolveOptions::default(), network_first()] {
            let resolved = resolver.resolve_with_source(&get("/bundle.js?v=3"), options).await;
            assert_eq!(resolved.source, ResponseSource::CacheWithoutQuery);
            assert_eq!(resolved.response.text(), Some("bundle"));
        }
        assert!(!resolver.adaptive_mode().is_engaged());
    }

    #[tokio::test]
    async fn test_exact_entry_wins_over_stripped_entry() {
        let cache = cache().await;
        seed(&cache, "/bundle.js", "plain").await;
        seed(&cache, "/bundle.js?v=3", "versioned").await;
        let resolver = Resolver::new(cache, Arc::new(ScriptedFetcher::default()));

        let resolved = resolver.resolve_with_source(&get("/bundle.js?v=3"), network_first()).await;

        assert_eq!(resolved.source, ResponseSource::Cache);
        assert_eq!(resolved.response.text(), Some("versioned"));
    }

    #[tokio::test]
    async fn test_total_exhaustion_returns_placeholder() {
        let cache = cache().await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/gone.js", 404, "not found"));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);

        let response = resolver.resolve(&get("/gone.js?v=1"), ResolveOptions::default()).await;

        assert_eq!(response.status, 408);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text(), Some("Network error happened"));
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_status_200_counts_as_success() {
        let cache = cache().await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/empty", 204, ""));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);

        let resolved = resolver.resolve_with_source(&get("/empty"), network_first()).await;

        assert_eq!(resolved.source, ResponseSource::Placeholder);
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_is_served_but_never_cached() {
        let cache = cache().await;
        let fetcher = Arc::new(ScriptedFetcher::default().route("/api", 200, "{\"ok\":true}"));
        let resolver = Resolver::new(Arc::clone(&cache), fetcher);
        let post = ResourceRequest::new(Method::Post, Url::parse(&format!("{ORIGIN}/api")).unwrap());

        let resolved = resolver.resolve_with_source(&post, network_first()).await;

        assert_eq!(resolved.source, ResponseSource::Network);
        assert_eq!(resolved.response.text(), Some("{\"ok\":true}"));
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_serves_entry_from_older_cache() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = db.open_cache("app-cache-v1").await.unwrap();
        seed(&old, "/a.js", "from-v1").await;
        let current = db.open_cache("app-cache-v2").await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default().route("/b.js", 200, "fresh-b"));
        let resolver = Resolver::new(Arc::new(MatchingCache::new(current.clone())), fetcher);

        for options in [ResolveOptions::default(), network_first()] {
            let resolved = resolver.resolve_with_source(&get("/a.js"), options).await;
            assert_eq!(resolved.source, ResponseSource::Cache);
            assert_eq!(resolved.response.text(), Some("from-v1"));
        }

        resolver.resolve(&get("/b.js"), network_first()).await;
        assert_eq!(current.keys().await.unwrap(), vec![format!("{ORIGIN}/b.js")]);
        assert_eq!(old.keys().await.unwrap(), vec![format!("{ORIGIN}/a.js")]);
    }

    #[tokio::test]
    async fn test_cache_errors_are_swallowed() {
        let fetcher = Arc::new(ScriptedFetcher::default().route("/a.js", 200, "fresh"));
        let resolver = Resolver::new(Arc::new(BrokenCache), fetcher);

        let ok = resolver.resolve_with_source(&get("/a.js"), ResolveOptions::default()).await;
        assert_eq!(ok.source, ResponseSource::Network);
        assert_eq!(ok.response.text(), Some("fresh"));

        let failed = resolver.resolve_with_source(&get("/b.js?v=2"), network_first()).await;
        assert_eq!(failed.source, ResponseSource::Placeholder);
    }

    #[test]
    fn test_options_from_app_config() {
        let config = AppConfig::default();
        let options = ResolveOptions::from(&config);
        assert!(options.prefer_cache_first);
        assert!(options.refresh_in_background);
        assert!(!options.ignore_adaptive_flag);

        let defaults = ResolveOptions::default();
        assert!(defaults.prefer_cache_first);
        assert!(!defaults.refresh_in_background);
    }
}
