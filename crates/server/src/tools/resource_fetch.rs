//! resource_fetch tool implementation.
//!
//! The interception hook: every call is one intercepted request handed to
//! the resolver. Per-call switches fall back to the configured defaults.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use offcache_client::{Fetcher, ResolveOptions, Resolver, fetch::resolve_identity};
use offcache_core::{Error, Method, ResourceRequest, ResponseCache};

use super::ResponseView;

/// Input parameters for resource_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Absolute URL, or a root-relative path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are cached.
    #[serde(default)]
    pub method: Option<String>,

    /// Consult the cache before the network.
    #[serde(default)]
    pub prefer_cache_first: Option<bool>,

    /// After a cache hit, refresh the entry from the network in the background.
    #[serde(default)]
    pub refresh_in_background: Option<bool>,

    /// Keep this call network-first even if the server switched to cache-first.
    #[serde(default)]
    pub ignore_adaptive_flag: Option<bool>,
}

impl ResourceFetchParams {
    fn options(&self, defaults: ResolveOptions) -> ResolveOptions {
        ResolveOptions {
            prefer_cache_first: self.prefer_cache_first.unwrap_or(defaults.prefer_cache_first),
            refresh_in_background: self.refresh_in_background.unwrap_or(defaults.refresh_in_background),
            ignore_adaptive_flag: self.ignore_adaptive_flag.unwrap_or(defaults.ignore_adaptive_flag),
        }
    }
}

/// Output structure for resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchOutput {
    /// Canonical identity the request was resolved under.
    pub url: String,
    /// Method used.
    pub method: String,
    /// Where the response came from: cache, network, cache_without_query, or placeholder.
    pub source: String,
    /// Whether the server has switched to cache-first after network trouble.
    pub adaptive_cache_first: bool,
    /// The resolved response.
    pub response: ResponseView,
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl<C, F>(
    resolver: &Resolver<C, F>, defaults: ResolveOptions, origin: Option<&Url>, params: ResourceFetchParams,
) -> Result<CallToolResult, McpError>
where
    C: ResponseCache + 'static,
    F: Fetcher + 'static,
{
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve_identity(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method: Method = match params.method.as_deref() {
        Some(m) => m.parse()?,
        None => Method::Get,
    };

    let options = params.options(defaults);
    let request = ResourceRequest::new(method, url);
    let resolved = resolver.resolve_with_source(&request, options).await;

    let output = ResourceFetchOutput {
        url: request.identity().to_string(),
        method: request.method.to_string(),
        source: resolved.source.as_str().to_string(),
        adaptive_cache_first: resolver.adaptive_mode().is_engaged(),
        response: ResponseView::from(&resolved.response),
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
