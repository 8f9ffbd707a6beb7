use super::*;

#[test]
fn test_default_is_valid() {
  let config = FractalConfig::default();
  assert_eq!(config.depth, 4);
  assert!(config.validate().is_ok());
}

#[test]
fn test_depth_bounds() {
  for depth in MIN_DEPTH..=MAX_DEPTH {
    assert!(
      FractalConfig::new().with_depth(depth).validate().is_ok(),
      "Depth {} should be valid",
      depth
    );
  }

  for depth in [0, 9, 100] {
    let err = FractalConfig::new().with_depth(depth).validate().unwrap_err();
    assert!(
      matches!(err, FractalError::InvalidDepth { depth: d } if d == depth),
      "Depth {} should be rejected, got {:?}",
      depth,
      err
    );
  }
}

#[test]
fn test_non_finite_spin_rate_rejected() {
  let err = FractalConfig::new()
    .with_spin_rate(f32::NAN)
    .validate()
    .unwrap_err();
  assert!(matches!(err, FractalError::InvalidConfig(_)));
}

#[test]
fn test_zero_batch_rejected() {
  let err = FractalConfig::new()
    .with_parallel_batch_size(0)
    .validate()
    .unwrap_err();
  assert!(matches!(err, FractalError::InvalidConfig(_)));
}

/// Negative spin rates are allowed (spin the other way).
#[test]
fn test_negative_spin_rate_allowed() {
  assert!(FractalConfig::new().with_spin_rate(-1.0).validate().is_ok());
}
