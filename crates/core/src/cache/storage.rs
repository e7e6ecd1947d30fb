//! Named cache management.
//!
//! A single database holds any number of named caches, mirroring a
//! browser's cache storage: open-or-create by name, list, delete, and a
//! lookup that searches every cache in creation order.

use super::connection::CacheDb;
use super::named::{CacheEntry, NamedCache, RawEntry};
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

impl CacheDb {
    /// Open the cache called `name`, creating it if needed.
    pub async fn open_cache(&self, name: &str) -> Result<NamedCache, Error> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("cache name cannot be empty".into()));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let insert_name = name.clone();
        let created = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let n = conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![insert_name, created_at],
                )?;
                Ok(n)
            })
            .await
            .map_err(Error::from)?;

        if created > 0 {
            tracing::debug!(cache = %name, "created cache");
        }

        Ok(NamedCache::new(self.clone(), name))
    }

    /// Whether a cache called `name` exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all caches, oldest first.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache and every entry in it.
    ///
    /// Returns false if no such cache existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let n = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(n > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Find an entry for `identity` in any cache, searching the oldest cache first.
    pub async fn match_url(&self, identity: &str) -> Result<Option<CacheEntry>, Error> {
        let identity = identity.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT r.cache_name, r.url, r.method, r.status_code, r.headers_json, r.body, r.stored_at
                     FROM responses r
                     JOIN caches c ON c.name = r.cache_name
                     WHERE r.url = ?1
                     ORDER BY c.rowid
                     LIMIT 1",
                )?;

                match stmt.query_row(params![identity], RawEntry::from_row) {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(CacheEntry::try_from).transpose()
    }
}
