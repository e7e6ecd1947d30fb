//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offcache server.

pub mod cache;
pub mod resource_fetch;

use offcache_core::ResourceResponse;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Response snapshot as returned to tool callers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// HTTP status code.
    pub status: u16,
    /// Header name/value pairs in received order.
    pub headers: Vec<(String, String)>,
    /// Content-Type header, if present.
    pub content_type: Option<String>,
    /// Body as text; absent when the body is not valid UTF-8.
    pub body: Option<String>,
    /// Body length in bytes.
    pub body_bytes: usize,
}

impl From<&ResourceResponse> for ResponseView {
    fn from(response: &ResourceResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            content_type: response.content_type().map(str::to_string),
            body: response.text().map(str::to_string),
            body_bytes: response.body.len(),
        }
    }
}

/// Pull the JSON text out of a successful tool result.
#[cfg(test)]
pub(crate) fn output_json<T: serde::de::DeserializeOwned>(result: &rmcp::model::CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
