//! Best-effort cache population at startup.

use url::Url;

use offcache_core::{Error, ResourceRequest, ResourceResponse, ResponseCache};

use crate::fetch::{Fetcher, resolve_identity};

/// Outcome of a precache run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecacheReport {
    /// Identities stored, in list order.
    pub cached: Vec<String>,
    /// Identities that could not be stored, with the reason.
    pub failed: Vec<(String, String)>,
}

impl PrecacheReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetch and store one resource. Any non-2xx status is rejected.
pub async fn add<C, F>(cache: &C, fetcher: &F, request: &ResourceRequest) -> Result<ResourceResponse, Error>
where
    C: ResponseCache + ?Sized,
    F: Fetcher + ?Sized,
{
    let response = fetcher.fetch(request).await?;
    if !response.is_success() {
        return Err(Error::NetworkRejected(response.status));
    }
    cache.store(request, &response).await?;
    Ok(response)
}

/// Add every identity in `identities` to `cache`, in order.
///
/// Relative identities are resolved against `origin`. A failure is logged
/// and recorded in the report; the remaining entries are still attempted.
pub async fn precache<C, F>(cache: &C, fetcher: &F, origin: Option<&Url>, identities: &[String]) -> PrecacheReport
where
    C: ResponseCache + ?Sized,
    F: Fetcher + ?Sized,
{
    let mut report = PrecacheReport::default();

    for identity in identities {
        let result = match resolve_identity(identity, origin) {
            Ok(url) => add(cache, fetcher, &ResourceRequest::get(url)).await.map(|_| ()),
            Err(e) => Err(Error::InvalidUrl(e.to_string())),
        };

        match result {
            Ok(()) => report.cached.push(identity.clone()),
            Err(e) => {
                tracing::error!("can't precache {}: {}", identity, e);
                report.failed.push((identity.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "precache finished");

    report
}
