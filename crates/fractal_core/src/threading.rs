//! Bounded worker pool for per-level parallel work, backed by rayon.
//!
//! Each fractal owns one pool sized by `FractalConfig::worker_threads`.
//! Level stages run inside [`WorkerPool::install`], so every `par_iter`
//! issued by a stage is confined to this pool and the call returns only once
//! all of its work items finished.
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::new(4)?;
//!
//! // Blocks until the closure and all parallel work inside it complete.
//! let sum: u64 = pool.install(|| (0..1_000u64).into_par_iter().sum());
//! ```

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Shared handle to a bounded rayon thread pool.
#[derive(Clone, Debug)]
pub struct WorkerPool {
  pool: Arc<ThreadPool>,
}

impl WorkerPool {
  /// Build a pool with `num_threads` workers (0 = one per logical CPU).
  pub fn new(num_threads: usize) -> Result<Self> {
    let pool = ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|index| format!("fractal-worker-{}", index))
      .build()?;
    Ok(Self {
      pool: Arc::new(pool),
    })
  }

  /// Pool with one worker per logical CPU.
  pub fn default_threads() -> Result<Self> {
    Self::new(0)
  }

  /// Run `op` inside the pool and wait for it.
  ///
  /// Panics raised by workers are propagated to the caller.
  pub fn install<OP, R>(&self, op: OP) -> R
  where
    OP: FnOnce() -> R + Send,
    R: Send,
  {
    self.pool.install(op)
  }

  /// Number of worker threads.
  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use rayon::prelude::*;

  use super::*;

  #[test]
  fn test_explicit_thread_count() {
    let pool = WorkerPool::new(2).unwrap();
    assert_eq!(pool.num_threads(), 2);
  }

  #[test]
  fn test_default_threads() {
    let pool = WorkerPool::default_threads().unwrap();
    assert!(pool.num_threads() >= 1);
  }

  #[test]
  fn test_install_runs_parallel_work_to_completion() {
    let pool = WorkerPool::new(4).unwrap();

    let mut values = vec![0u64; 10_000];
    pool.install(|| {
      values
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, v)| *v = i as u64 * 2);
    });

    assert!(values.iter().enumerate().all(|(i, v)| *v == i as u64 * 2));
  }

  #[test]
  fn test_install_stays_on_pool_threads() {
    let pool = WorkerPool::new(3).unwrap();
    let threads = pool.install(rayon::current_num_threads);
    assert_eq!(threads, 3);
  }

  #[test]
  fn test_clones_share_pool() {
    let pool = WorkerPool::new(2).unwrap();
    let clone = pool.clone();
    assert!(Arc::ptr_eq(&pool.pool, &clone.pool));
  }
}
