//! Entry operations within one named cache.

use async_trait::async_trait;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use super::store::ResponseCache;
use crate::Error;
use crate::resource::{ResourceRequest, ResourceResponse};

/// A stored response together with where and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_name: String,
    pub url: String,
    pub method: String,
    pub stored_at: String,
    pub response: ResourceResponse,
}

/// Row shape as read from SQLite, before the headers are decoded.
pub(crate) struct RawEntry {
    cache_name: String,
    url: String,
    method: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    /// Column order: cache_name, url, method, status_code, headers_json, body, stored_at.
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cache_name: row.get(0)?,
            url: row.get(1)?,
            method: row.get(2)?,
            status_code: row.get(3)?,
            headers_json: row.get(4)?,
            body: row.get(5)?,
            stored_at: row.get(6)?,
        })
    }
}

impl TryFrom<RawEntry> for CacheEntry {
    type Error = Error;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&raw.headers_json)?;
        let status = u16::try_from(raw.status_code)
            .map_err(|_| Error::CorruptEntry(format!("status out of range: {}", raw.status_code)))?;

        Ok(Self {
            cache_name: raw.cache_name,
            url: raw.url,
            method: raw.method,
            stored_at: raw.stored_at,
            response: ResourceResponse::new(status, headers, raw.body),
        })
    }
}

/// Handle to one named cache. Obtained from [`CacheDb::open_cache`].
#[derive(Clone, Debug)]
pub struct NamedCache {
    db: CacheDb,
    name: String,
}

impl NamedCache {
    pub(crate) fn new(db: CacheDb, name: String) -> Self {
        Self { db, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Insert or overwrite the entry for `request`.
    ///
    /// Fails with `InvalidInput` for non-GET requests.
    pub async fn put(&self, request: &ResourceRequest, response: &ResourceResponse) -> Result<(), Error> {
        if !request.is_cacheable() {
            return Err(Error::InvalidInput(format!("{} requests cannot be cached", request.method)));
        }

        let hash = compute_entry_key(&self.name, request.identity());
        let cache_name = self.name.clone();
        let url = request.identity().to_string();
        let method = request.method.to_string();
        let status = i64::from(response.status);
        let content_type = response.content_type().map(str::to_string);
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO responses (
                        hash, cache_name, url, method, status_code,
                        content_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(hash) DO UPDATE SET
                        method = excluded.method,
                        status_code = excluded.status_code,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![hash, cache_name, url, method, status, content_type, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the full entry for an exact identity.
    pub async fn entry(&self, identity: &str) -> Result<Option<CacheEntry>, Error> {
        let hash = compute_entry_key(&self.name, identity);
        let raw = self
            .db
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT cache_name, url, method, status_code, headers_json, body, stored_at
                     FROM responses WHERE hash = ?1",
                )?;

                match stmt.query_row(params![hash], RawEntry::from_row) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(CacheEntry::try_from).transpose()
    }

    /// Delete the entry for an exact identity.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete(&self, identity: &str) -> Result<bool, Error> {
        let hash = compute_entry_key(&self.name, identity);
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let n = conn.execute("DELETE FROM responses WHERE hash = ?1", params![hash])?;
                Ok(n > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Identities stored in this cache, in first-insert order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM responses WHERE cache_name = ?1 ORDER BY rowid")?;
                let urls = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every entry, keeping the cache itself.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM responses WHERE cache_name = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl ResponseCache for NamedCache {
    async fn lookup(&self, identity: &str) -> Result<Option<ResourceResponse>, Error> {
        Ok(self.entry(identity).await?.map(|e| e.response))
    }

    async fn store(&self, request: &ResourceRequest, response: &ResourceResponse) -> Result<(), Error> {
        self.put(request, response).await
    }
}
