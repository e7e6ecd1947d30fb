//! Reads across every named cache, writes to one.
//!
//! Lookups go through [`CacheDb::match_url`], so entries left in an older
//! cache are still served after the configured cache name changes.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::named::NamedCache;
use super::store::ResponseCache;
use crate::Error;
use crate::resource::{ResourceRequest, ResourceResponse};

/// [`ResponseCache`] that matches in all caches and stores in `writes`.
#[derive(Clone, Debug)]
pub struct MatchingCache {
    writes: NamedCache,
}

impl MatchingCache {
    pub fn new(writes: NamedCache) -> Self {
        Self { writes }
    }

    /// The cache new entries go to.
    pub fn writes(&self) -> &NamedCache {
        &self.writes
    }

    fn db(&self) -> &CacheDb {
        self.writes.db()
    }
}

#[async_trait]
impl ResponseCache for MatchingCache {
    async fn lookup(&self, identity: &str) -> Result<Option<ResourceResponse>, Error> {
        Ok(self.db().match_url(identity).await?.map(|e| e.response))
    }

    async fn store(&self, request: &ResourceRequest, response: &ResourceResponse) -> Result<(), Error> {
        self.writes.put(request, response).await
    }
}
