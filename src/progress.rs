//! Progress reporting for long-running Monte Carlo work.

/// Receives `(completed, total)` updates from long-running computations.
///
/// Implemented for any `Fn(usize, usize) + Sync` closure. Updates may arrive
/// from worker threads and out of order when sampling runs in parallel.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use paleomag::ProgressObserver;
///
/// let last = AtomicUsize::new(0);
/// let observer = |done: usize, _total: usize| {
///     last.fetch_max(done, Ordering::Relaxed);
/// };
/// observer.report(10, 100);
/// assert_eq!(last.load(Ordering::Relaxed), 10);
/// ```
pub trait ProgressObserver: Sync {
    /// Called with the number of finished work units.
    fn report(&self, completed: usize, total: usize);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize) + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total);
    }
}

/// Observer that ignores all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn report(&self, _completed: usize, _total: usize) {}
}
