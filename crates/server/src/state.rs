//! Shared server state built once at startup.

use std::sync::Arc;

use offcache_client::{FetchClient, FetchConfig, PrecacheReport, ResolveOptions, Resolver, precache};
use offcache_core::{AppConfig, CacheDb, MatchingCache, NamedCache};
use url::Url;

/// Everything a tool call needs: the store, the resolver, and per-call defaults.
pub struct AppState {
    pub db: CacheDb,
    pub cache: Arc<NamedCache>,
    pub resolver: Resolver<MatchingCache, FetchClient>,
    pub defaults: ResolveOptions,
    pub origin: Option<Url>,
}

impl AppState {
    /// Open the cache database, the configured named cache, and the fetch client.
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let db = CacheDb::open(&config.db_path).await?;
        let cache = Arc::new(db.open_cache(&config.cache_name).await?);
        let fetcher = Arc::new(FetchClient::new(FetchConfig::from(config))?);

        tracing::info!(cache = %config.cache_name, db = %config.db_path.display(), "cache opened");

        Ok(Self {
            db,
            resolver: Resolver::new(Arc::new(MatchingCache::new(cache.as_ref().clone())), fetcher),
            cache,
            defaults: ResolveOptions::from(config),
            origin: config.origin_url()?,
        })
    }

    /// Populate the cache from the configured precache list.
    pub async fn install(&self, identities: &[String]) -> PrecacheReport {
        precache(self.cache.as_ref(), self.resolver.fetcher().as_ref(), self.origin.as_ref(), identities).await
    }
}
