//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared abort flag.
///
/// The orchestrator sets it; passes poll it between top-level iterations
/// (per node, per entry) and stop early. Mid-operation abort is not
/// supported: a running replace or match always completes.
#[derive(Clone, Default)]
pub struct AbortFlag {
    flag: Arc<AtomicBool>,
}

impl AbortFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_cleared() {
        assert!(!AbortFlag::new().is_set());
    }

    #[test]
    fn set_is_visible_through_clones() {
        let flag = AbortFlag::new();
        let other = flag.clone();
        flag.set();
        assert!(other.is_set());
    }
}
