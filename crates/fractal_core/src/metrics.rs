//! Propagation and publish statistics.
//!
//! Feature-gated and runtime-toggled; with the `metrics` feature off every
//! `record_*` call is a no-op.
//!
//! # Usage
//!
//! ```ignore
//! use fractal_core::metrics::{FractalMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! metrics.record_frame(&report);
//! metrics.record_publish_timing(timing_us);
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::constants::MAX_DEPTH;
use crate::scheduler::FrameReport;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Fixed-capacity history of recent samples (frame or publish timings).
///
/// ```text
/// capacity 4:  push 1,2,3,4   [1 2 3 4]
///              push 5         [2 3 4 5]   oldest evicted
/// ```
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  samples: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  /// Empty window holding at most `capacity` samples.
  pub fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Record a sample. At capacity the oldest one is dropped first.
  pub fn push(&mut self, sample: T) {
    if self.samples.len() >= self.capacity {
      self.samples.pop_front();
    }
    self.samples.push_back(sample);
  }

  /// Number of samples currently held.
  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  /// Maximum number of samples held.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Drop every sample, keeping the capacity.
  pub fn clear(&mut self) {
    self.samples.clear();
  }

  /// Samples from oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.samples.iter()
  }

  /// Most recent sample.
  pub fn last(&self) -> Option<&T> {
    self.samples.back()
  }
}

/// Microsecond timing statistics.
impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.samples.iter().sum()
  }

  /// Mean of the held samples, 0 when empty.
  pub fn average(&self) -> f64 {
    if self.samples.is_empty() {
      return 0.0;
    }
    self.sum() as f64 / self.samples.len() as f64
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.samples.iter().min()?;
    let max = self.samples.iter().max()?;
    Some((*min, *max))
  }

  /// Nearest-rank percentile (`p` in 0..=100) of the held samples.
  pub fn percentile(&self, p: f64) -> Option<u64> {
    if self.samples.is_empty() {
      return None;
    }
    let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
    sorted.sort_unstable();
    let rank = (p.clamp(0.0, 100.0) / 100.0 * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1)])
  }
}

impl Default for RollingWindow<u64> {
  /// Two seconds of frames at 60 fps.
  fn default() -> Self {
    Self::new(120)
  }
}

/// Statistics for one fractal, updated each frame.
#[derive(Debug, Clone, Default)]
pub struct FractalMetrics {
  /// Most recent time per level in microseconds (index = level).
  pub level_us: [u64; MAX_DEPTH],
  /// Whole-frame propagation times in microseconds.
  pub frame_timings: RollingWindow<u64>,
  /// Publish (upload + draw) times in microseconds.
  pub publish_timings: RollingWindow<u64>,
  /// Frames propagated this session.
  pub frames: u64,
  /// Frames whose propagation exceeded the configured budget.
  pub over_budget_frames: u64,
  /// Parts written by the last frame.
  pub last_nodes_updated: usize,
}

impl FractalMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reset everything except the cumulative frame counters.
  pub fn reset(&mut self) {
    self.level_us.fill(0);
    self.frame_timings.clear();
    self.publish_timings.clear();
    self.last_nodes_updated = 0;
  }

  /// Record one propagated frame.
  pub fn record_frame(&mut self, report: &FrameReport) {
    if !is_enabled() {
      return;
    }

    self.level_us.fill(0);
    for (slot, us) in self.level_us.iter_mut().zip(&report.level_timings_us) {
      *slot = *us;
    }
    self.frame_timings.push(report.total_us);
    self.last_nodes_updated = report.nodes_updated;
    self.frames += 1;
  }

  pub fn record_over_budget(&mut self) {
    if is_enabled() {
      self.over_budget_frames += 1;
    }
  }

  pub fn record_publish_timing(&mut self, timing_us: u64) {
    if is_enabled() {
      self.publish_timings.push(timing_us);
    }
  }

  pub fn avg_frame_us(&self) -> f64 {
    self.frame_timings.average()
  }

  pub fn avg_publish_us(&self) -> f64 {
    self.publish_timings.average()
  }

  /// Level with the highest last-frame time.
  pub fn slowest_level(&self) -> Option<usize> {
    self
      .level_us
      .iter()
      .enumerate()
      .filter(|(_, us)| **us > 0)
      .max_by_key(|(_, us)| **us)
      .map(|(level, _)| level)
  }
}
