//! Level update job - derives one level's world transforms from its parent
//! level.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ Per-part rule (part i, parent = parents[i / 5])                         │
//! │                                                                         │
//! │   spin_angle     += spin_delta                                          │
//! │   world_rotation  = parent.world_rotation                               │
//! │                     * (rotation * rot_y(spin_angle))                    │
//! │   world_position  = parent.world_position                               │
//! │                     + parent.world_rotation * (1.5 * scale * direction) │
//! │   matrix          = [mat3(world_rotation) * scale | world_position]     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A part only reads its parent and only writes its own slot, so the parts
//! of one level can be processed in any order and on any thread. The borrow
//! split (`&[FractalPart]` parents, `&mut [FractalPart]` parts) makes a
//! same-level read impossible to express.

use rayon::prelude::*;

use crate::constants::{level_len, parent_index, CHILD_SPACING};
use crate::types::{FractalPart, InstanceMatrix};

/// Proof that every part of `level` was written this frame.
///
/// The only way to start the job for level `i` is to hand over the token of
/// level `i - 1`.
#[must_use = "the next level's job needs this token"]
#[derive(Debug, PartialEq, Eq)]
pub struct LevelDone {
  level: usize,
}

impl LevelDone {
  /// Token for the root level, issued once the root step finished.
  pub(crate) fn root() -> Self {
    Self { level: 0 }
  }

  /// Level this token vouches for.
  pub fn level(&self) -> usize {
    self.level
  }
}

/// Update a single part in place and return its packed matrix.
#[inline]
pub fn update_part(
  parent: &FractalPart,
  part: &mut FractalPart,
  spin_delta: f32,
  scale: f32,
) -> InstanceMatrix {
  part.spin_angle += spin_delta;
  part.world_rotation = parent.world_rotation * (part.rotation * part.spin_rotation());
  part.world_position =
    parent.world_position + parent.world_rotation * (CHILD_SPACING * scale * part.direction);
  InstanceMatrix::from_rotation_scale_translation(part.world_rotation, scale, part.world_position)
}

/// Work description for one level.
#[derive(Debug)]
pub struct LevelUpdateJob<'a> {
  level: usize,
  /// Shared per-frame spin increment in radians.
  pub spin_delta: f32,
  /// Uniform scale of this level.
  pub scale: f32,
  parents: &'a [FractalPart],
  parts: &'a mut [FractalPart],
  matrices: &'a mut [InstanceMatrix],
}

impl<'a> LevelUpdateJob<'a> {
  /// Schedule the job for the level after `previous`.
  ///
  /// The buffers must be exactly the level the token leads to: `parents`
  /// holds `5^(previous.level)` parts, `parts` and `matrices` hold
  /// `5^(previous.level + 1)`.
  ///
  /// # Panics
  /// If the buffers do not match the level the token vouches for.
  pub fn after(
    previous: LevelDone,
    spin_delta: f32,
    scale: f32,
    parents: &'a [FractalPart],
    parts: &'a mut [FractalPart],
    matrices: &'a mut [InstanceMatrix],
  ) -> Self {
    let level = previous.level + 1;
    assert_eq!(
      parents.len(),
      level_len(previous.level),
      "parent buffer does not match finished level {}",
      previous.level
    );
    assert_eq!(
      parts.len(),
      level_len(level),
      "part buffer does not match level {}",
      level
    );
    assert_eq!(
      parts.len(),
      matrices.len(),
      "parts and matrices must be index-aligned"
    );
    Self {
      level,
      spin_delta,
      scale,
      parents,
      parts,
      matrices,
    }
  }

  /// Level this job writes.
  pub fn level(&self) -> usize {
    self.level
  }

  /// Number of parts this job writes.
  pub fn len(&self) -> usize {
    self.parts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  /// Process one part.
  #[inline]
  pub fn execute(&mut self, index: usize) {
    let parent = &self.parents[parent_index(index)];
    self.matrices[index] = update_part(parent, &mut self.parts[index], self.spin_delta, self.scale);
  }

  /// Process every part on the calling thread.
  pub fn run_serial(mut self) -> LevelDone {
    for index in 0..self.parts.len() {
      self.execute(index);
    }
    LevelDone { level: self.level }
  }

  /// Process every part in parallel on the current rayon pool, handing at
  /// least `batch_size` consecutive parts to each work item. Returns once
  /// all parts are written.
  pub fn run_parallel(self, batch_size: usize) -> LevelDone {
    let Self {
      level,
      spin_delta,
      scale,
      parents,
      parts,
      matrices,
    } = self;

    parts
      .par_iter_mut()
      .zip(matrices.par_iter_mut())
      .enumerate()
      .with_min_len(batch_size.max(1))
      .for_each(|(index, (part, matrix))| {
        *matrix = update_part(&parents[parent_index(index)], part, spin_delta, scale);
      });

    LevelDone { level }
  }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod job_test;
