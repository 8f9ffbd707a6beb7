//! FractalConfig - setup parameters for a fractal structure.
//!
//! Depth and spin rate define the structure; the remaining fields tune how
//! the per-level work is spread over the worker pool.

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::constants::{
  DEFAULT_DEPTH, DEFAULT_PARALLEL_BATCH_SIZE, DEFAULT_SPIN_RATE, MAX_DEPTH, MIN_DEPTH,
};
use crate::error::{FractalError, Result};

/// Setup parameters. Changing any of them requires a full rebuild.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FractalConfig {
  /// Number of levels, including the root (1..=8).
  pub depth: usize,

  /// Spin rate in radians per second, shared by every node.
  pub spin_rate: f32,

  /// Worker threads for level updates. 0 = one per logical CPU.
  pub worker_threads: usize,

  /// Minimum number of nodes handed to one worker at a time.
  pub parallel_batch_size: usize,

  /// Frames slower than this (microseconds) are logged. 0 disables the check.
  pub frame_budget_us: u64,
}

impl FractalConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_depth(mut self, depth: usize) -> Self {
    self.depth = depth;
    self
  }

  pub fn with_spin_rate(mut self, spin_rate: f32) -> Self {
    self.spin_rate = spin_rate;
    self
  }

  pub fn with_worker_threads(mut self, threads: usize) -> Self {
    self.worker_threads = threads;
    self
  }

  pub fn with_parallel_batch_size(mut self, batch: usize) -> Self {
    self.parallel_batch_size = batch;
    self
  }

  pub fn with_frame_budget_us(mut self, budget_us: u64) -> Self {
    self.frame_budget_us = budget_us;
    self
  }

  /// Check every field, returning the first violation.
  pub fn validate(&self) -> Result<()> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.depth) {
      return Err(FractalError::InvalidDepth { depth: self.depth });
    }
    if !self.spin_rate.is_finite() {
      return Err(FractalError::InvalidConfig(format!(
        "spin_rate must be finite, got {}",
        self.spin_rate
      )));
    }
    if self.parallel_batch_size == 0 {
      return Err(FractalError::InvalidConfig(
        "parallel_batch_size must be at least 1".to_string(),
      ));
    }
    Ok(())
  }
}

impl Default for FractalConfig {
  fn default() -> Self {
    Self {
      depth: DEFAULT_DEPTH,
      spin_rate: DEFAULT_SPIN_RATE,
      worker_threads: 0,
      parallel_batch_size: DEFAULT_PARALLEL_BATCH_SIZE,
      frame_budget_us: 0,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
