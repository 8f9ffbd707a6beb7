//! Layout and animation constants for the flat-level fractal.
//!
//! # Level Layout
//!
//! ```text
//! level 0:  [r]                                   1 node
//! level 1:  [0 1 2 3 4]                           5 nodes
//! level 2:  [0 1 2 3 4|5 6 7 8 9|...|20 ... 24]   25 nodes
//!            └ parent 0┘└ parent 1┘   └parent 4┘
//! ```
//!
//! Every level is one contiguous buffer. Child `c` of parent `p` lives at
//! `p * 5 + c`, so the parent of flat index `i` is `i / 5` and its slot
//! within the parent is `i % 5`.
//!
//! # Scale Convention
//!
//! ```text
//! level scale    = root_scale * 0.5^level
//! child offset   = 1.5 * level_scale * direction   (in parent space)
//! ```

use std::f32::consts::PI;

/// Fixed fan-out of every node.
pub const BRANCHING_FACTOR: usize = 5;

/// Shallowest supported structure (root only).
pub const MIN_DEPTH: usize = 1;

/// Deepest supported structure (97 656 nodes in total).
pub const MAX_DEPTH: usize = 8;

/// Distance between a child and its parent, in units of the child's scale.
///
/// A unit-sized child placed 1.5 of its own scale away from a parent twice
/// its size touches the parent without interpenetrating it.
pub const CHILD_SPACING: f32 = 1.5;

/// Uniform scale ratio between consecutive levels.
pub const LEVEL_SCALE_FACTOR: f32 = 0.5;

/// Default spin rate in radians per second (22.5 degrees per second).
pub const DEFAULT_SPIN_RATE: f32 = 0.125 * PI;

/// Default depth of a freshly configured structure.
pub const DEFAULT_DEPTH: usize = 4;

/// Default minimum number of nodes handed to one worker at a time.
pub const DEFAULT_PARALLEL_BATCH_SIZE: usize = 4;

/// Size of the draw bounding box relative to the root scale.
pub const BOUNDS_SCALE: f32 = 3.0;

/// Number of nodes in a level.
#[inline]
pub const fn level_len(level: usize) -> usize {
  BRANCHING_FACTOR.pow(level as u32)
}

/// Total number of nodes in a structure of the given depth.
#[inline]
pub const fn total_nodes(depth: usize) -> usize {
  let mut total = 0;
  let mut level = 0;
  while level < depth {
    total += level_len(level);
    level += 1;
  }
  total
}

/// Flat index of the parent of node `index` in the previous level.
#[inline(always)]
pub const fn parent_index(index: usize) -> usize {
  index / BRANCHING_FACTOR
}

/// Slot of node `index` within its parent (0..5).
#[inline(always)]
pub const fn child_slot(index: usize) -> usize {
  index % BRANCHING_FACTOR
}

/// Flat index of child `slot` of parent `parent` in the next level.
#[inline(always)]
pub const fn child_index(parent: usize, slot: usize) -> usize {
  parent * BRANCHING_FACTOR + slot
}

/// Uniform scale of a level for a given root scale.
#[inline]
pub fn level_scale(root_scale: f32, level: usize) -> f32 {
  root_scale * LEVEL_SCALE_FACTOR.powi(level as i32)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
