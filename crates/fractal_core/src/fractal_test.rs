use glam::{Quat, Vec3};

use super::*;
use crate::constants::DEFAULT_SPIN_RATE;
use crate::publish::RecordingBackend;

fn config(depth: usize) -> FractalConfig {
  FractalConfig::new().with_depth(depth).with_worker_threads(2)
}

fn geometry() -> Arc<GeometryTable> {
  Arc::new(GeometryTable::canonical())
}

fn make_fractal(depth: usize) -> Fractal {
  Fractal::initialize(config(depth), geometry()).unwrap()
}

#[test]
fn test_fractal_id_is_unique() {
  let a = FractalId::new();
  let b = FractalId::new();
  assert_ne!(a, b);
  assert_ne!(make_fractal(1).id(), make_fractal(1).id());
}

#[test]
fn test_initialize_rejects_depth_out_of_range() {
  for depth in [0, 9, 100] {
    let err = Fractal::initialize(config(depth), geometry()).err();
    assert!(
      matches!(err, Some(FractalError::InvalidDepth { depth: d }) if d == depth),
      "{:?}",
      err
    );
  }
}

#[test]
fn test_failed_enable_leaves_uninitialized() {
  let mut fractal = Fractal::new(config(3).with_parallel_batch_size(0), geometry());
  assert!(fractal.enable().is_err());
  assert!(!fractal.is_initialized());
  assert_eq!(fractal.state(), FrameState::Uninitialized);
}

#[test]
fn test_initialize_allocates_levels() {
  let fractal = make_fractal(4);
  let store = fractal.store().unwrap();
  assert_eq!(store.depth(), 4);
  assert_eq!(store.total_nodes(), 156);
  assert_eq!(fractal.state(), FrameState::Stale);
}

#[test]
fn test_advance_requires_initialize() {
  let mut fractal = Fractal::new(config(3), geometry());
  let err = fractal.advance(0.1, Placement::IDENTITY).unwrap_err();
  assert!(matches!(err, FractalError::NotInitialized));
}

#[test]
fn test_publish_requires_ready_frame() {
  let mut fractal = make_fractal(3);
  let mut publisher = InstancePublisher::new(RecordingBackend::new());

  let err = fractal.publish(&mut publisher, &(), &()).unwrap_err();
  assert!(matches!(err, FractalError::FrameNotReady));

  fractal.advance(0.1, Placement::IDENTITY).unwrap();
  assert_eq!(fractal.state(), FrameState::Ready);
  fractal.publish(&mut publisher, &(), &()).unwrap();

  fractal.shutdown();
  let err = fractal.publish(&mut publisher, &(), &()).unwrap_err();
  assert!(matches!(err, FractalError::NotInitialized));
}

#[test]
fn test_publish_draws_each_level_with_root_bounds() {
  let mut fractal = make_fractal(3);
  let mut publisher = InstancePublisher::new(RecordingBackend::new());
  let placement = Placement::new(Vec3::new(2.0, 0.0, -1.0), Quat::IDENTITY, 2.0);

  fractal.advance(0.016, placement).unwrap();
  fractal.publish(&mut publisher, &(), &()).unwrap();

  let draws = publisher.backend_mut().take_draws();
  assert_eq!(draws.len(), 3);
  for (level, draw) in draws.iter().enumerate() {
    assert_eq!(draw.instance_count, crate::constants::level_len(level));
    assert_eq!(draw.bounds.center, placement.position);
    assert_eq!(draw.bounds.size, Vec3::splat(6.0));
  }
  assert_eq!(fractal.bounds(), Some(draws[0].bounds));
}

#[test]
fn test_shutdown_is_idempotent() {
  let mut fractal = make_fractal(3);
  fractal.shutdown();
  fractal.shutdown();
  assert!(!fractal.is_initialized());
  assert!(matches!(
    fractal.advance(0.1, Placement::IDENTITY),
    Err(FractalError::NotInitialized)
  ));
}

/// Teardown followed by setup reproduces the initial assignment.
#[test]
fn test_shutdown_then_initialize_reproduces_layout() {
  let mut fractal = make_fractal(4);
  let initial: Vec<_> = fractal
    .store()
    .unwrap()
    .levels()
    .map(|level| level.parts().to_vec())
    .collect();

  fractal.advance(0.5, Placement::from_translation(Vec3::X)).unwrap();
  fractal.shutdown();
  fractal.enable().unwrap();

  let rebuilt: Vec<_> = fractal
    .store()
    .unwrap()
    .levels()
    .map(|level| level.parts().to_vec())
    .collect();
  assert_eq!(initial, rebuilt);
}

#[test]
fn test_reconfigure_changes_depth() {
  let mut fractal = make_fractal(2);
  let mut publisher = InstancePublisher::new(RecordingBackend::new());
  fractal.advance(0.1, Placement::IDENTITY).unwrap();
  fractal.publish(&mut publisher, &(), &()).unwrap();
  assert_eq!(publisher.buffer_count(), 2);

  fractal.reconfigure(config(5)).unwrap();
  assert_eq!(fractal.state(), FrameState::Stale);
  assert_eq!(fractal.store().unwrap().depth(), 5);

  fractal.advance(0.1, Placement::IDENTITY).unwrap();
  fractal.publish(&mut publisher, &(), &()).unwrap();
  assert_eq!(publisher.buffer_count(), 5);
}

#[test]
fn test_reconfigure_with_bad_depth_stays_down() {
  let mut fractal = make_fractal(2);
  assert!(fractal.reconfigure(config(0)).is_err());
  assert!(!fractal.is_initialized());
}

/// Two fractals fed identical inputs produce identical buffers.
#[test]
fn test_determinism() {
  let mut a = make_fractal(5);
  let mut b = Fractal::initialize(config(5).with_worker_threads(3), geometry()).unwrap();
  let placement = Placement::new(Vec3::new(1.0, -2.0, 0.5), Quat::from_rotation_x(0.3), 1.25);

  for elapsed in [0.016, 0.033, 0.0, 0.25] {
    a.advance(elapsed, placement).unwrap();
    b.advance(elapsed, placement).unwrap();
  }

  let (sa, sb) = (a.store().unwrap(), b.store().unwrap());
  for level in 0..5 {
    assert_eq!(sa.level(level).matrices(), sb.level(level).matrices());
  }
}

/// A new placement reaches every level only through `advance`.
#[test]
fn test_root_isolation() {
  let mut fractal = make_fractal(3);
  fractal.advance(0.0, Placement::IDENTITY).unwrap();
  let before = fractal.store().unwrap().level(2).matrices().to_vec();

  let moved = Placement::from_translation(Vec3::new(10.0, 0.0, 0.0));
  assert_eq!(fractal.store().unwrap().level(2).matrices(), &before[..]);

  fractal.advance(0.0, moved).unwrap();
  let store = fractal.store().unwrap();
  assert_eq!(store.root().world_position, moved.position);
  for (old, new) in before.iter().zip(store.level(2).matrices()) {
    assert!(new.translation.abs_diff_eq(old.translation + moved.position, 1e-4));
  }
}

#[test]
fn test_depth_two_scenario() {
  let mut fractal = Fractal::initialize(
    config(2).with_spin_rate(DEFAULT_SPIN_RATE),
    geometry(),
  )
  .unwrap();

  fractal.advance(0.0, Placement::IDENTITY).unwrap();
  let store = fractal.store().unwrap();
  let first = store.level(1).parts()[0];
  assert_eq!(first.direction, Vec3::Y);
  assert!(first.world_position.abs_diff_eq(Vec3::new(0.0, 0.75, 0.0), 1e-5));

  fractal.advance(1.0, Placement::IDENTITY).unwrap();
  for part in fractal.store().unwrap().level(1).parts() {
    assert!((part.spin_angle - DEFAULT_SPIN_RATE).abs() < 1e-6);
  }
  assert_eq!(fractal.frames(), 2);
}

/// Setup with a publisher is all-or-nothing.
#[test]
fn test_initialize_with_publisher_failure() {
  let mut publisher = InstancePublisher::new(RecordingBackend::with_capacity_limit(5));

  let err = Fractal::initialize_with(config(3), geometry(), &mut publisher).err();

  assert!(matches!(err, Some(FractalError::Gpu { level: 2, .. })), "{:?}", err);
  assert_eq!(publisher.buffer_count(), 0);
  assert!(publisher.backend().live_buffers.is_empty());
}

/// Rebuilding at a depth the backend cannot hold fails at setup and leaves
/// neither level storage nor GPU buffers behind.
#[test]
fn test_reconfigure_with_publisher_failure() {
  let mut publisher = InstancePublisher::new(RecordingBackend::with_capacity_limit(25));
  let mut fractal = Fractal::initialize_with(config(3), geometry(), &mut publisher).unwrap();
  assert_eq!(publisher.buffer_count(), 3);

  let err = fractal.reconfigure_with(config(5), &mut publisher).unwrap_err();

  assert!(matches!(err, FractalError::Gpu { level: 3, .. }), "{:?}", err);
  assert!(!fractal.is_initialized());
  assert_eq!(fractal.state(), FrameState::Uninitialized);
  assert_eq!(publisher.buffer_count(), 0);
  assert!(publisher.backend().live_buffers.is_empty());
}

#[test]
fn test_reconfigure_with_replaces_buffers() {
  let mut publisher = InstancePublisher::new(RecordingBackend::new());
  let mut fractal = Fractal::initialize_with(config(2), geometry(), &mut publisher).unwrap();

  fractal.reconfigure_with(config(4), &mut publisher).unwrap();

  assert_eq!(fractal.store().unwrap().depth(), 4);
  assert_eq!(publisher.buffer_count(), 4);
  assert_eq!(publisher.backend().live_buffers.len(), 4);
  assert!(publisher.matches(fractal.store().unwrap()));
}

#[test]
fn test_initialize_with_and_shutdown_with() {
  let mut publisher = InstancePublisher::new(RecordingBackend::new());
  let mut fractal = Fractal::initialize_with(config(3), geometry(), &mut publisher).unwrap();
  assert_eq!(publisher.buffer_count(), 3);

  fractal.shutdown_with(&mut publisher);
  assert_eq!(publisher.buffer_count(), 0);
  assert!(publisher.backend().live_buffers.is_empty());
  assert!(!fractal.is_initialized());
}

#[test]
fn test_fractals_share_geometry() {
  let shared = geometry();
  let a = Fractal::initialize(config(2), shared.clone()).unwrap();
  let b = Fractal::initialize(config(3), shared.clone()).unwrap();
  assert!(Arc::ptr_eq(a.geometry(), b.geometry()));
  assert_eq!(Arc::strong_count(&shared), 3);
}

/// A frame interrupted partway is recovered on the next advance: every spin
/// angle lines up with the root again.
#[test]
fn test_interrupted_frame_recovers_spin() {
  let mut fractal = make_fractal(3);
  fractal.advance(0.25, Placement::IDENTITY).unwrap();

  // Root and part of level 1 advanced, the rest did not.
  let delta = fractal.config().spin_rate * 0.25;
  let store = fractal.store.as_mut().unwrap();
  store.root_mut().0.spin_angle += delta;
  let (_, parts, _) = store.split_level_mut(1);
  parts[0].spin_angle += delta;
  fractal.state = FrameState::Propagating;

  fractal.advance(0.25, Placement::IDENTITY).unwrap();

  assert_eq!(fractal.state(), FrameState::Ready);
  let store = fractal.store().unwrap();
  let root_spin = store.root().spin_angle;
  assert!((root_spin - 3.0 * delta).abs() < 1e-6);
  assert!(store
    .levels()
    .flat_map(|level| level.parts())
    .all(|part| part.spin_angle == root_spin));
}

#[cfg(feature = "metrics")]
#[test]
fn test_frame_budget_counts_slow_frames() {
  let mut fractal = Fractal::initialize(
    config(crate::constants::MAX_DEPTH).with_frame_budget_us(1),
    geometry(),
  )
  .unwrap();

  for _ in 0..3 {
    fractal.advance(0.016, Placement::IDENTITY).unwrap();
  }

  let metrics = fractal.metrics();
  assert_eq!(metrics.frames, 3);
  assert_eq!(metrics.over_budget_frames, 3);
}

#[cfg(feature = "metrics")]
#[test]
fn test_zero_budget_disables_check() {
  let mut fractal = make_fractal(4);
  fractal.advance(0.016, Placement::IDENTITY).unwrap();
  assert_eq!(fractal.metrics().over_budget_frames, 0);
  assert_eq!(fractal.metrics().frames, 1);
}
