//! The cache-first switch flipped by observed network trouble.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-way "prefer cache" state shared by every resolution of a resolver.
///
/// Starts disengaged. [`AdaptiveMode::engage`] moves it to engaged exactly
/// once; nothing moves it back.
#[derive(Debug, Default)]
pub struct AdaptiveMode {
    prefer_cache: AtomicBool,
}

impl AdaptiveMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether resolutions should go to the cache first.
    pub fn is_engaged(&self) -> bool {
        self.prefer_cache.load(Ordering::Acquire)
    }

    /// Switch to cache-first.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn engage(&self) -> bool {
        let switched = self
            .prefer_cache
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if switched {
            tracing::warn!("forcing cache first because of possible network issues");
        }

        switched
    }
}
