//! Level store - per-depth flat buffers of parts and instance matrices.
//!
//! ```text
//! LevelStore
//! ├── Level 0: parts[1]    matrices[1]
//! ├── Level 1: parts[5]    matrices[5]
//! ├── Level 2: parts[25]   matrices[25]
//! └── ...      parts[5^i]  matrices[5^i]
//! ```
//!
//! The store is the only owner of these buffers. It is allocated in one go
//! and dropped in one go; there is no incremental resize.

use std::mem::size_of;

use crate::constants::{child_slot, level_len, MAX_DEPTH, MIN_DEPTH};
use crate::error::{FractalError, Result};
use crate::geometry::GeometryTable;
use crate::types::{FractalPart, InstanceMatrix};

/// One depth tier: parts and their packed matrices, index-aligned.
#[derive(Debug)]
pub struct Level {
  parts: Vec<FractalPart>,
  matrices: Vec<InstanceMatrix>,
}

impl Level {
  /// Allocate and initialize one level.
  ///
  /// Level 0 holds the root. Deeper levels take their local placement from
  /// the table by slot within the parent, which only depends on the flat
  /// index, not on any parent data.
  fn allocate(index: usize, geometry: &GeometryTable) -> Result<Self> {
    let len = level_len(index);
    let alloc_error = |_| FractalError::Allocation {
      level: index,
      bytes: len * (size_of::<FractalPart>() + size_of::<InstanceMatrix>()),
    };

    let mut parts = Vec::new();
    parts.try_reserve_exact(len).map_err(alloc_error)?;
    let mut matrices = Vec::new();
    matrices.try_reserve_exact(len).map_err(alloc_error)?;

    if index == 0 {
      parts.push(FractalPart::ROOT);
    } else {
      parts.extend((0..len).map(|i| {
        let (direction, rotation) = geometry.entry(child_slot(i));
        FractalPart::new(direction, rotation)
      }));
    }
    matrices.resize(len, InstanceMatrix::ZERO);

    Ok(Self { parts, matrices })
  }

  /// Number of parts in this level.
  #[inline]
  pub fn len(&self) -> usize {
    self.parts.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  pub fn parts(&self) -> &[FractalPart] {
    &self.parts
  }

  pub fn matrices(&self) -> &[InstanceMatrix] {
    &self.matrices
  }

  /// Mutable views of both buffers at once.
  pub fn buffers_mut(&mut self) -> (&mut [FractalPart], &mut [InstanceMatrix]) {
    (&mut self.parts, &mut self.matrices)
  }

  /// Bytes held by both buffers.
  pub fn memory_bytes(&self) -> usize {
    self.parts.capacity() * size_of::<FractalPart>()
      + self.matrices.capacity() * size_of::<InstanceMatrix>()
  }
}

/// Owner of every level of one structure.
#[derive(Debug)]
pub struct LevelStore {
  levels: Vec<Level>,
}

impl LevelStore {
  /// Allocate `depth` levels of lengths `5^0 .. 5^(depth-1)`.
  ///
  /// All-or-nothing: on failure every level allocated so far is dropped
  /// before the error is returned.
  pub fn allocate(depth: usize, geometry: &GeometryTable) -> Result<Self> {
    if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
      return Err(FractalError::InvalidDepth { depth });
    }

    let mut levels = Vec::with_capacity(depth);
    for index in 0..depth {
      levels.push(Level::allocate(index, geometry)?);
    }

    let store = Self { levels };
    store.verify()?;
    Ok(store)
  }

  /// Check that every level holds exactly `5^i` parts and matrices.
  pub fn verify(&self) -> Result<()> {
    for (index, level) in self.levels.iter().enumerate() {
      let expected = level_len(index);
      for actual in [level.parts.len(), level.matrices.len()] {
        if actual != expected {
          return Err(FractalError::LevelLength {
            level: index,
            expected,
            actual,
          });
        }
      }
    }
    Ok(())
  }

  #[inline]
  pub fn depth(&self) -> usize {
    self.levels.len()
  }

  pub fn level(&self, index: usize) -> &Level {
    &self.levels[index]
  }

  pub fn levels(&self) -> impl Iterator<Item = &Level> {
    self.levels.iter()
  }

  /// Total parts across every level.
  pub fn total_nodes(&self) -> usize {
    self.levels.iter().map(Level::len).sum()
  }

  /// Bytes held by every level.
  pub fn memory_bytes(&self) -> usize {
    self.levels.iter().map(Level::memory_bytes).sum()
  }

  pub fn root(&self) -> &FractalPart {
    &self.levels[0].parts[0]
  }

  /// Root part and its matrix slot.
  pub fn root_mut(&mut self) -> (&mut FractalPart, &mut InstanceMatrix) {
    let level = &mut self.levels[0];
    (&mut level.parts[0], &mut level.matrices[0])
  }

  /// Bring every part's spin angle back to the root's.
  ///
  /// All parts start at zero and receive the same delta every frame, so a
  /// completed frame leaves every angle equal to the root's. A frame that
  /// stopped partway breaks that; this restores it. Returns the number of
  /// parts that were out of step.
  pub fn resync_spin(&mut self) -> usize {
    let spin = self.root().spin_angle;
    let mut fixed = 0;
    for part in self.levels.iter_mut().flat_map(|level| level.parts.iter_mut()) {
      if part.spin_angle.to_bits() != spin.to_bits() {
        part.spin_angle = spin;
        fixed += 1;
      }
    }
    fixed
  }

  /// Split borrow: the finished parent level (read-only) and `index`'s
  /// buffers (writable).
  ///
  /// # Panics
  /// If `index` is 0 or not below `depth()`.
  pub fn split_level_mut(
    &mut self,
    index: usize,
  ) -> (&[FractalPart], &mut [FractalPart], &mut [InstanceMatrix]) {
    assert!(
      index > 0 && index < self.levels.len(),
      "level {} has no parent level in a store of depth {}",
      index,
      self.levels.len()
    );
    let (head, tail) = self.levels.split_at_mut(index);
    let parents = &head[index - 1].parts;
    let (parts, matrices) = tail[0].buffers_mut();
    (parents, parts, matrices)
  }
}

#[cfg(test)]
#[path = "level_test.rs"]
mod level_test;
