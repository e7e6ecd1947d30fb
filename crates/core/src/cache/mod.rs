//! SQLite-backed response cache.
//!
//! Persistent storage for response snapshots using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Any number of named caches in one database
//! - Insert-or-overwrite entries keyed by request identity
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//!
//! Entries never expire. They stay until a cache is cleared or deleted.

pub mod connection;
pub mod hash;
pub mod matching;
pub mod migrations;
pub mod named;
pub mod storage;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use matching::MatchingCache;
pub use named::{CacheEntry, NamedCache};
pub use store::ResponseCache;
