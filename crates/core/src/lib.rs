//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Request/response values exchanged with the cache and the network
//! - Named response caches with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod resource;

pub use cache::{CacheDb, CacheEntry, MatchingCache, NamedCache, ResponseCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use resource::{Method, ResourceRequest, ResourceResponse};
