//! Bounded thread pools for the two concurrency roles the training context
//! needs: an outer *solve* pool (one sequence per worker during evaluation)
//! and an inner *processing* pool (data-parallel sweeps within a step). Both
//! are gated behind the `parallel` Cargo feature, so `rayon` is an optional
//! dependency for callers who don't need either pool.

#[cfg(feature = "parallel")]
use rayon::ThreadPool;

use crate::error::{GymError, Result};

/// Owns a solve pool and a processing pool sized per §5's square-root bound:
/// the processing pool's worker count is `ceil(sqrt(max_processing_threads))`
/// so an outer sequence-parallel sweep times an inner data-parallel sweep
/// cannot blow up past `max_processing_threads` total worker-threads in the
/// worst case.
#[cfg(feature = "parallel")]
pub struct BoundedPool {
    solve: ThreadPool,
    processing: ThreadPool,
}

#[cfg(feature = "parallel")]
impl BoundedPool {
    /// Build both pools. `max_solve_threads` sizes the sequence-parallel
    /// pool directly; `max_processing_threads` is square-root-bounded before
    /// sizing the inner data-parallel pool.
    pub fn new(max_solve_threads: usize, max_processing_threads: usize) -> Result<Self> {
        let inner_bound = (max_processing_threads as f64).sqrt().ceil() as usize;
        let solve = rayon::ThreadPoolBuilder::new()
            .num_threads(max_solve_threads.max(1))
            .build()
            .map_err(|e| GymError::invalid_state_transition(format!("solve pool: {e}")))?;
        let processing = rayon::ThreadPoolBuilder::new()
            .num_threads(inner_bound.max(1))
            .build()
            .map_err(|e| GymError::invalid_state_transition(format!("processing pool: {e}")))?;
        Ok(Self { solve, processing })
    }

    /// Run `f` across the solve pool, joining before returning.
    pub fn solve_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.solve.install(f)
    }

    /// Run `f` across the inner, square-root-bounded processing pool.
    pub fn processing_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.processing.install(f)
    }
}

#[cfg(all(test, feature = "parallel"))]
mod tests {
    use super::*;

    #[test]
    fn test_processing_pool_is_sqrt_bounded() {
        let pool = BoundedPool::new(4, 16).unwrap();
        // sqrt(16) = 4, so this should not panic building a 4-wide pool.
        let sum: i32 = pool.processing_scope(|| (0..4).sum());
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_solve_scope_runs_closure() {
        let pool = BoundedPool::new(2, 1).unwrap();
        let doubled = pool.solve_scope(|| 21 * 2);
        assert_eq!(doubled, 42);
    }
}
