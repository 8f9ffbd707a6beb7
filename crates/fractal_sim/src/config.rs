//! Run configuration for the headless driver.

use anyhow::{Context, Result};
use fractal_core::{FractalConfig, Placement};
use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;
use std::path::Path;

/// Root configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Structure setup, passed to `Fractal::initialize`.
	pub fractal: FractalConfig,
	/// Frame loop settings.
	pub run: RunConfig,
}

/// Frame loop settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
	/// Number of frames to advance.
	pub frames: u64,
	/// Elapsed seconds fed to every frame.
	pub frame_time: f32,
	/// Publish through the recording backend after every frame.
	pub publish: bool,
	/// Root placement.
	pub placement: PlacementConfig,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			frames: 600,
			frame_time: 1.0 / 60.0,
			publish: true,
			placement: PlacementConfig::default(),
		}
	}
}

/// Root placement in file form.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
	pub position: [f32; 3],
	/// Euler angles (XYZ) in degrees.
	pub rotation_deg: [f32; 3],
	pub scale: f32,
}

impl Default for PlacementConfig {
	fn default() -> Self {
		Self {
			position: [0.0; 3],
			rotation_deg: [0.0; 3],
			scale: 1.0,
		}
	}
}

impl PlacementConfig {
	pub fn to_placement(&self) -> Placement {
		let [x, y, z] = self.rotation_deg.map(f32::to_radians);
		Placement::new(
			Vec3::from_array(self.position),
			Quat::from_euler(EulerRot::XYZ, x, y, z),
			self.scale,
		)
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config: Config =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
		Ok(config)
	}

	/// Reject values the frame loop cannot run with.
	pub fn validate(&self) -> Result<()> {
		self.fractal
			.validate()
			.context("Invalid [fractal] section")?;
		if !self.run.frame_time.is_finite() || self.run.frame_time < 0.0 {
			anyhow::bail!(
				"frame_time must be a finite non-negative number, got {}",
				self.run.frame_time
			);
		}
		if !(self.run.placement.scale > 0.0) {
			anyhow::bail!(
				"placement scale must be positive, got {}",
				self.run.placement.scale
			);
		}
		Ok(())
	}
}
