//! The cache seam used by the resolver.

use async_trait::async_trait;

use crate::Error;
use crate::resource::{ResourceRequest, ResourceResponse};

/// Key-value response store keyed by request identity.
///
/// Implementations must tolerate concurrent readers and last-write-wins
/// concurrent writers.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a response by exact identity.
    async fn lookup(&self, identity: &str) -> Result<Option<ResourceResponse>, Error>;

    /// Insert or overwrite the response stored for `request`.
    async fn store(&self, request: &ResourceRequest, response: &ResourceResponse) -> Result<(), Error>;
}
