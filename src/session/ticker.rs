use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of periodic tasks currently alive for one owner
#[derive(Debug, Clone, Default)]
pub(crate) struct TickerCount(Arc<AtomicUsize>);

impl TickerCount {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Count a task in until the returned guard is dropped
    pub(crate) fn enter(&self) -> TickerGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        TickerGuard(Arc::clone(&self.0))
    }
}

/// Counts its task out on drop, whether it finished or was aborted
pub(crate) struct TickerGuard(Arc<AtomicUsize>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_counts_in_and_out() {
        let count = TickerCount::default();

        let first = count.enter();
        let second = count.enter();
        assert_eq!(count.get(), 2);

        drop(first);
        assert_eq!(count.get(), 1);
        drop(second);
        assert_eq!(count.get(), 0);
    }
}
