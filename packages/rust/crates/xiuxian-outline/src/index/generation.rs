use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Monotonic rebuild generation shared by every rebuild of one builder.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    /// Start a new generation; every older [`Generation`] becomes stale.
    #[must_use]
    pub fn begin(&self) -> Generation {
        let captured = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        Generation {
            counter: Arc::clone(&self.current),
            captured,
        }
    }

    /// Invalidate every running rebuild without starting a new one.
    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    /// Current generation number.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

/// Token captured by one rebuild at its start.
#[derive(Debug, Clone)]
pub struct Generation {
    counter: Arc<AtomicU64>,
    captured: u64,
}

impl Generation {
    /// Whether no newer rebuild (or cancel) happened since this one began.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.captured
    }

    /// Generation number captured at start.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.captured
    }
}

/// Count of rebuilds currently running; "in progress" while non-zero.
#[derive(Debug, Clone, Default)]
pub struct ActiveRebuilds {
    count: Arc<AtomicUsize>,
}

impl ActiveRebuilds {
    /// Mark a rebuild as running until the guard drops.
    #[must_use]
    pub fn enter(&self) -> ActiveGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        ActiveGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Whether any rebuild is running.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.count.load(Ordering::Acquire) > 0
    }
}

/// Clears its share of the in-progress flag exactly once, on drop.
#[derive(Debug)]
pub struct ActiveGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_generation_supersedes_older() {
        let counter = GenerationCounter::default();
        let first = counter.begin();
        assert!(first.is_current());
        let second = counter.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
        counter.cancel();
        assert!(!second.is_current());
    }

    #[test]
    fn test_active_guard_clears_on_drop() {
        let active = ActiveRebuilds::default();
        assert!(!active.in_progress());
        let outer = active.enter();
        let inner = active.enter();
        drop(outer);
        assert!(active.in_progress());
        drop(inner);
        assert!(!active.in_progress());
    }
}
