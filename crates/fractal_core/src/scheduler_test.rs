use glam::{Quat, Vec3};

use super::*;
use crate::constants::{level_scale, parent_index, CHILD_SPACING, DEFAULT_SPIN_RATE};
use crate::geometry::GeometryTable;

const EPSILON: f32 = 1e-4;

fn make_store(depth: usize) -> LevelStore {
  LevelStore::allocate(depth, &GeometryTable::canonical()).unwrap()
}

fn make_pool() -> WorkerPool {
  WorkerPool::new(4).unwrap()
}

#[test]
fn test_frame_input_spin_delta() {
  let input = FrameInput::new(2.0, 0.25, Placement::IDENTITY);
  assert_eq!(input.spin_delta, 0.5);
}

#[test]
fn test_root_seeded_from_placement() {
  let mut store = make_store(1);
  let placement = Placement::new(Vec3::new(4.0, 5.0, 6.0), Quat::from_rotation_x(0.5), 2.0);
  let input = FrameInput {
    spin_delta: 0.3,
    placement,
  };

  let done = advance_root(&mut store, &input);
  assert_eq!(done.level(), 0);

  let root = store.root();
  assert_eq!(root.spin_angle, 0.3);
  assert_eq!(root.world_position, placement.position);
  let expected = placement.rotation * Quat::from_rotation_y(0.3);
  assert!(root.world_rotation.abs_diff_eq(expected, EPSILON));

  let matrix = store.level(0).matrices()[0];
  assert_eq!(matrix.translation, placement.position);
  assert!((matrix.x_axis.length() - 2.0).abs() < EPSILON);
}

/// Depth 1 computes only the root.
#[test]
fn test_depth_one_only_root() {
  let mut store = make_store(1);
  let report = propagate(&mut store, &make_pool(), &FrameInput::new(1.0, 1.0, Placement::IDENTITY), 4);
  assert_eq!(report.level_timings_us.len(), 1);
  assert_eq!(report.nodes_updated, 1);
  assert_eq!(store.root().spin_angle, 1.0);
}

/// depth=2, origin/identity/scale 1, elapsed [0, 1].
#[test]
fn test_depth_two_scenario() {
  let mut store = make_store(2);
  let pool = make_pool();
  let rate = DEFAULT_SPIN_RATE;

  propagate(&mut store, &pool, &FrameInput::new(rate, 0.0, Placement::IDENTITY), 4);

  let first = store.level(1).parts()[0];
  assert_eq!(first.direction, Vec3::Y);
  assert!(
    first.world_position.abs_diff_eq(Vec3::new(0.0, 0.75, 0.0), EPSILON),
    "{:?}",
    first.world_position
  );

  propagate(&mut store, &pool, &FrameInput::new(rate, 1.0, Placement::IDENTITY), 4);

  for part in store.level(1).parts() {
    assert!((part.spin_angle - rate).abs() < EPSILON);
  }
  assert!((store.root().spin_angle - rate).abs() < EPSILON);
}

/// Every non-root part obeys the position rule against its same-frame parent.
#[test]
fn test_position_rule_holds_everywhere() {
  let mut store = make_store(5);
  let pool = make_pool();
  let placement = Placement::new(Vec3::new(-3.0, 1.0, 2.0), Quat::from_rotation_z(0.8), 1.5);

  for elapsed in [0.016, 0.02, 0.5] {
    propagate(&mut store, &pool, &FrameInput::new(0.7, elapsed, placement), 4);
  }

  for level in 1..store.depth() {
    let scale = level_scale(placement.scale, level);
    let parents = store.level(level - 1).parts();
    for (i, part) in store.level(level).parts().iter().enumerate() {
      let parent = &parents[parent_index(i)];
      let expected =
        parent.world_position + parent.world_rotation * (CHILD_SPACING * scale * part.direction);
      assert!(
        part.world_position.abs_diff_eq(expected, EPSILON),
        "Level {} part {}: {:?} != {:?}",
        level,
        i,
        part.world_position,
        expected
      );
      let matrix = store.level(level).matrices()[i];
      assert!((matrix.y_axis.length() - scale).abs() < EPSILON);
    }
  }
}

#[test]
fn test_zero_elapsed_leaves_spin_unchanged() {
  let mut store = make_store(4);
  let pool = make_pool();

  propagate(&mut store, &pool, &FrameInput::new(1.0, 0.1, Placement::IDENTITY), 4);
  let before: Vec<Vec<f32>> = store
    .levels()
    .map(|l| l.parts().iter().map(|p| p.spin_angle).collect())
    .collect();

  for _ in 0..10 {
    propagate(&mut store, &pool, &FrameInput::new(1.0, 0.0, Placement::IDENTITY), 4);
  }

  let after: Vec<Vec<f32>> = store
    .levels()
    .map(|l| l.parts().iter().map(|p| p.spin_angle).collect())
    .collect();
  assert_eq!(before, after);
}

#[test]
fn test_parallel_matches_serial_chain() {
  let mut parallel = make_store(5);
  let mut serial = make_store(5);
  let pool = make_pool();
  let placement = Placement::new(Vec3::ONE, Quat::from_rotation_y(0.2), 0.8);

  for elapsed in [0.1, 0.2, 0.05] {
    let input = FrameInput::new(0.9, elapsed, placement);
    propagate(&mut parallel, &pool, &input, 3);
    let done = propagate_serial(&mut serial, &input);
    assert_eq!(done.level(), 4);
  }

  for level in 0..5 {
    assert_eq!(parallel.level(level).parts(), serial.level(level).parts());
    assert_eq!(parallel.level(level).matrices(), serial.level(level).matrices());
  }
}

#[test]
fn test_report_counts_levels() {
  let mut store = make_store(4);
  let report = propagate(&mut store, &make_pool(), &FrameInput::new(1.0, 0.1, Placement::IDENTITY), 4);
  assert_eq!(report.level_timings_us.len(), 4);
  assert_eq!(report.nodes_updated, 1 + 5 + 25 + 125);
}
