//! Client code for offcache.
//!
//! This crate provides the network fetcher, the resource resolver that
//! arbitrates between cache and network, and startup precaching.

pub mod fetch;
pub mod precache;
pub mod resolver;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use precache::{PrecacheReport, precache};
pub use resolver::{AdaptiveMode, ResolveOptions, Resolved, Resolver, ResponseSource};
