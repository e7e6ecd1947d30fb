//! cache_purge tool implementation.
//!
//! Entries never expire on their own; this is how they leave the cache.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use offcache_client::fetch::resolve_identity;
use offcache_core::{Error, NamedCache};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete only this resource. When omitted, the whole cache is cleared.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Cache that was purged.
    pub cache_name: String,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    cache: &NamedCache, origin: Option<&Url>, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    let deleted = match params.url {
        Some(url) => {
            let url = resolve_identity(&url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            u64::from(cache.delete(url.as_str()).await?)
        }
        None => cache.clear().await?,
    };

    tracing::info!(cache = cache.name(), deleted, "cache purged");

    let output = CachePurgeOutput { cache_name: cache.name().to_string(), deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
