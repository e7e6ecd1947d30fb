//! Cache-related MCP tools.
//!
//! Inspect and clear the response cache directly, bypassing the resolver.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
