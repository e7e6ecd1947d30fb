//! Request and response values passed between the resolver, the cache, and
//! the network fetcher.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Body of the response synthesized when neither cache nor network can answer.
pub const NETWORK_ERROR_BODY: &str = "Network error happened";

/// Status of the synthesized placeholder response (Request Timeout).
pub const NETWORK_ERROR_STATUS: u16 = 408;

/// HTTP request method.
///
/// Only [`Method::Get`] is cacheable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Other(m) => m,
        }
    }

    /// Whether responses to this method may be written to the cache.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let method = match upper.as_str() {
            "" => return Err(Error::InvalidInput("method cannot be empty".into())),
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            _ if upper.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => Method::Other(upper),
            _ => return Err(Error::InvalidInput(format!("invalid method: {s}"))),
        };
        Ok(method)
    }
}

/// An intercepted request.
///
/// The cache identity is the URL string, query included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub method: Method,
    pub url: Url,
}

impl ResourceRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// A GET request for `url`.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Exact cache identity.
    pub fn identity(&self) -> &str {
        self.url.as_str()
    }

    /// Identity with everything from the first `?` removed.
    ///
    /// Returns `None` when the URL carries no query string, since the
    /// fallback key would equal the exact identity.
    pub fn identity_without_query(&self) -> Option<&str> {
        strip_query(self.identity())
    }

    pub fn is_cacheable(&self) -> bool {
        self.method.is_cacheable()
    }
}

/// Split `identity` on its first `?` and return the part before it.
pub fn strip_query(identity: &str) -> Option<&str> {
    identity.split_once('?').map(|(base, _)| base)
}

/// A response snapshot.
///
/// `Clone` is the duplicate operation: the body is a shared immutable
/// buffer, so the copy handed to the cache and the copy returned to the
/// caller can both be read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResourceResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// The placeholder returned once every cache and network option is exhausted.
    pub fn network_error() -> Self {
        Self::new(
            NETWORK_ERROR_STATUS,
            vec![("Content-Type".to_string(), "text/plain".to_string())],
            Bytes::from_static(NETWORK_ERROR_BODY.as_bytes()),
        )
    }

    /// Exactly status 200. Other 2xx codes do not count for resolution.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as UTF-8, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
