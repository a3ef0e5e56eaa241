//! Fixed-window rate limiting over an atomic counter store.

use crate::cache::CounterStore;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-actor attempt limiter.
///
/// Fixed-window semantics: the first increment of a counter's lifetime sets
/// its expiry to the window length, and every attempt inside that window
/// bumps the same counter. Bursts straddling a window boundary can briefly
/// see up to twice the limit, which is accepted imprecision for an abuse
/// guard.
///
/// Failure policy is fail-open: if the counter store is unreachable the
/// attempt is allowed and a warning is logged. Payment creation still has
/// its own validation layer and the gateway applies its own abuse controls,
/// so an unavailable Redis must not take payments down with it.
pub struct RateLimiter<C: CounterStore> {
    store: C,
}

impl<C: CounterStore> RateLimiter<C> {
    pub fn new(store: C) -> Self {
        Self { store }
    }

    /// Count one attempt for `actor_key` and report whether it is allowed.
    ///
    /// Returns false once the post-increment count exceeds `max_attempts`.
    /// Atomicity rests entirely on the store's increment guarantee; two
    /// concurrent callers sharing a key can never both slip under the
    /// threshold when the true count is over it.
    pub async fn check_and_increment(
        &self,
        actor_key: &str,
        window: Duration,
        max_attempts: u32,
    ) -> bool {
        let count = match self.store.increment(actor_key).await {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    "Counter store unavailable for key '{}', failing open: {}",
                    actor_key, e
                );
                return true;
            }
        };

        if count == 1 {
            // First attempt in this counter's lifetime starts the window.
            if let Err(e) = self.store.expire(actor_key, window).await {
                warn!(
                    "Failed to set rate limit window for key '{}': {}",
                    actor_key, e
                );
            }
        }

        let allowed = count <= max_attempts as i64;
        if !allowed {
            debug!(
                "Rate limit exceeded for key '{}': {} > {}",
                actor_key, count, max_attempts
            );
        }
        allowed
    }
}
