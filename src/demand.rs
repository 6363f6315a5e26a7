//! Outstanding-demand bookkeeping for a single subscription.
//!
//! Demand is a non-negative credit: every unit permits exactly one element
//! emission. The counter saturates at `u64::MAX`, which is treated as
//! effectively unbounded and is never decremented.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic credit counter shared between a subscription and its drain loop.
///
/// Invariant: credit is consumed one-for-one with emission, and a consume
/// never succeeds when no credit is outstanding. All operations are
/// `SeqCst`: the drain-loop handshake needs a total order between adding
/// credit and re-reading it after the emitting flag is released.
#[derive(Debug)]
pub struct Demand {
    remaining: AtomicU64,
}

impl Demand {
    /// Create a counter with zero outstanding demand.
    pub fn new() -> Self {
        Demand {
            remaining: AtomicU64::new(0),
        }
    }

    /// Add `n` units of credit, saturating at `u64::MAX` (unbounded).
    /// Returns the new outstanding total.
    pub fn add(&self, n: u64) -> u64 {
        let mut current = self.remaining.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(n);
            match self.remaining.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    /// Consume one unit of credit if any is outstanding.
    ///
    /// Unbounded demand (`u64::MAX`) is never decremented.
    pub fn try_consume_one(&self) -> bool {
        let mut current = self.remaining.load(Ordering::SeqCst);
        loop {
            if current == u64::MAX {
                return true;
            }
            if current == 0 {
                return false;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Current outstanding credit.
    pub fn outstanding(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Whether the counter has saturated to unbounded demand.
    pub fn is_unbounded(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) == u64::MAX
    }
}

impl Default for Demand {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let demand = Demand::new();
        assert_eq!(demand.outstanding(), 0);
        assert!(!demand.try_consume_one());
    }

    #[test]
    fn add_then_consume() {
        let demand = Demand::new();
        assert_eq!(demand.add(3), 3);
        assert!(demand.try_consume_one());
        assert!(demand.try_consume_one());
        assert!(demand.try_consume_one());
        assert!(!demand.try_consume_one());
        assert_eq!(demand.outstanding(), 0);
    }

    #[test]
    fn saturates_to_unbounded() {
        let demand = Demand::new();
        demand.add(u64::MAX - 1);
        demand.add(10);
        assert!(demand.is_unbounded());
        // Unbounded demand is never decremented
        assert!(demand.try_consume_one());
        assert_eq!(demand.outstanding(), u64::MAX);
    }

    #[test]
    fn unbounded_request_is_unbounded() {
        let demand = Demand::new();
        demand.add(u64::MAX);
        assert!(demand.is_unbounded());
    }
}
