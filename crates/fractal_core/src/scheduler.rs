//! Propagation scheduler - one frame of root step plus chained level jobs.
//!
//! ```text
//! ┌──────────┐     ┌─────────────┐     ┌─────────────┐           ┌─────────────┐     ┌──────┐
//! │ Root     ├────►│ Level 1     ├────►│ Level 2     ├──► ... ──►│ Level D-1   ├────►│ Join │
//! │ (serial) │     │ (parallel)  │     │ (parallel)  │           │ (parallel)  │     │      │
//! └──────────┘     └─────────────┘     └─────────────┘           └─────────────┘     └──────┘
//!      │                  │                   │                         │
//!  LevelDone(0)      LevelDone(1)        LevelDone(2)             LevelDone(D-1)
//! ```
//!
//! Each stage consumes the token of the stage before it, so level `i` is
//! never started before level `i - 1` is fully written. The whole chain runs
//! inside one `WorkerPool::install`, which is the frame's blocking join.

use smallvec::SmallVec;
use web_time::Instant;

use crate::constants::{level_len, LEVEL_SCALE_FACTOR, MAX_DEPTH};
use crate::job::{LevelDone, LevelUpdateJob};
use crate::level::LevelStore;
use crate::threading::WorkerPool;
use crate::types::{InstanceMatrix, Placement};

/// Per-frame inputs shared by every level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
  /// Spin increment for this frame (`spin_rate * elapsed_time`).
  pub spin_delta: f32,
  /// External placement of the root.
  pub placement: Placement,
}

impl FrameInput {
  pub fn new(spin_rate: f32, elapsed_time: f32, placement: Placement) -> Self {
    Self {
      spin_delta: spin_rate * elapsed_time,
      placement,
    }
  }
}

/// Timing breakdown of one propagated frame.
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
  /// Microseconds spent per level, index = level.
  pub level_timings_us: SmallVec<[u64; MAX_DEPTH]>,
  /// Total microseconds from root step to join.
  pub total_us: u64,
  /// Parts written this frame (every level, root included).
  pub nodes_updated: usize,
}

/// Advance the root: accumulate spin and seed its world transform from the
/// external placement.
pub fn advance_root(store: &mut LevelStore, input: &FrameInput) -> LevelDone {
  let placement = &input.placement;
  let (root, matrix) = store.root_mut();

  root.spin_angle += input.spin_delta;
  root.world_rotation = placement.rotation * (root.rotation * root.spin_rotation());
  root.world_position = placement.position;
  *matrix = InstanceMatrix::from_rotation_scale_translation(
    root.world_rotation,
    placement.scale,
    root.world_position,
  );

  LevelDone::root()
}

/// Run one full frame: root step, then every level in order, each level in
/// parallel on `pool`. Returns after the deepest level finished.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "fractal::propagate"))]
pub fn propagate(
  store: &mut LevelStore,
  pool: &WorkerPool,
  input: &FrameInput,
  batch_size: usize,
) -> FrameReport {
  let frame_start = Instant::now();
  let depth = store.depth();
  let mut report = FrameReport::default();

  let root_start = Instant::now();
  let root_done = advance_root(store, input);
  report.level_timings_us.push(root_start.elapsed().as_micros() as u64);

  let spin_delta = input.spin_delta;
  let mut scale = input.placement.scale;

  let last = pool.install(|| {
    let mut done = root_done;
    for level in 1..depth {
      #[cfg(feature = "profiling")]
      let _span = tracing::info_span!("level_stage", level).entered();

      scale *= LEVEL_SCALE_FACTOR;
      let stage_start = Instant::now();
      let (parents, parts, matrices) = store.split_level_mut(level);
      done = LevelUpdateJob::after(done, spin_delta, scale, parents, parts, matrices)
        .run_parallel(batch_size);
      report.level_timings_us.push(stage_start.elapsed().as_micros() as u64);
    }
    done
  });
  debug_assert_eq!(last.level(), depth - 1);

  report.nodes_updated = (0..depth).map(level_len).sum();
  report.total_us = frame_start.elapsed().as_micros() as u64;
  report
}

/// Same chain as [`propagate`] without a worker pool. Used as the baseline
/// in benches and tests.
pub fn propagate_serial(store: &mut LevelStore, input: &FrameInput) -> LevelDone {
  let mut done = advance_root(store, input);
  let mut scale = input.placement.scale;
  for level in 1..store.depth() {
    scale *= LEVEL_SCALE_FACTOR;
    let (parents, parts, matrices) = store.split_level_mut(level);
    done = LevelUpdateJob::after(done, input.spin_delta, scale, parents, parts, matrices)
      .run_serial();
  }
  done
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
