//! cache_get tool implementation.
//!
//! Looks up a stored response across all named caches, without touching
//! the network.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use offcache_client::fetch::resolve_identity;
use offcache_core::{CacheDb, Error};

use crate::tools::ResponseView;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL or root-relative path of the cached resource.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Cache the entry was found in.
    pub cache_name: String,
    /// Stored identity.
    pub url: String,
    /// Method of the request that stored it.
    pub method: String,
    /// RFC 3339 time the entry was written.
    pub stored_at: String,
    /// The stored response.
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(db: &CacheDb, origin: Option<&Url>, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve_identity(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let entry = db
        .match_url(url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        response: ResponseView::from(&entry.response),
        cache_name: entry.cache_name,
        url: entry.url,
        method: entry.method,
        stored_at: entry.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
