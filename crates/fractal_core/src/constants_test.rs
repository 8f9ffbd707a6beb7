use super::*;

#[test]
fn test_level_len_is_power_of_five() {
  assert_eq!(level_len(0), 1);
  assert_eq!(level_len(1), 5);
  assert_eq!(level_len(2), 25);
  assert_eq!(level_len(7), 78_125);
}

#[test]
fn test_total_nodes() {
  assert_eq!(total_nodes(1), 1);
  assert_eq!(total_nodes(2), 6);
  assert_eq!(total_nodes(4), 156);
  for depth in MIN_DEPTH..=MAX_DEPTH {
    let expected: usize = (0..depth).map(level_len).sum();
    assert_eq!(total_nodes(depth), expected, "depth {}", depth);
  }
}

#[test]
fn test_parent_child_index_roundtrip() {
  for parent in 0..level_len(3) {
    for slot in 0..BRANCHING_FACTOR {
      let child = child_index(parent, slot);
      assert_eq!(parent_index(child), parent);
      assert_eq!(child_slot(child), slot);
    }
  }
}

#[test]
fn test_child_indices_are_disjoint() {
  let mut seen = vec![false; level_len(3)];
  for parent in 0..level_len(2) {
    for slot in 0..BRANCHING_FACTOR {
      let child = child_index(parent, slot);
      assert!(!seen[child], "Index {} claimed twice", child);
      seen[child] = true;
    }
  }
  assert!(seen.iter().all(|s| *s), "Every slot must be claimed");
}

/// Scale halves per level.
#[test]
fn test_level_scale_halves() {
  assert_eq!(level_scale(1.0, 0), 1.0);
  assert_eq!(level_scale(1.0, 1), 0.5);
  assert_eq!(level_scale(2.0, 3), 0.25);
}
