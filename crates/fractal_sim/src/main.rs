//! Headless fractal propagation driver.
//!
//! Sets up one fractal from a TOML config, advances it for a fixed number of
//! frames with a constant frame time, optionally publishes every frame
//! through the recording backend, and prints timing statistics.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use fractal_core::metrics::RollingWindow;
use fractal_core::publish::{InstancePublisher, RecordingBackend};
use fractal_core::{Fractal, GeometryTable};
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;

/// Headless fractal propagation driver.
#[derive(Parser, Debug)]
#[command(name = "fractal_sim")]
#[command(about = "Advances a fractal for N frames and reports propagation timings")]
struct Args {
	/// Path to configuration TOML file (defaults apply when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the number of levels (1..=8).
	#[arg(short, long)]
	depth: Option<usize>,

	/// Override the number of frames.
	#[arg(short, long)]
	frames: Option<u64>,

	/// Override the worker thread count (0 = one per CPU).
	#[arg(short, long)]
	threads: Option<usize>,

	/// Override the parallel batch size.
	#[arg(short, long)]
	batch: Option<usize>,

	/// Override the spin rate in radians per second.
	#[arg(long)]
	spin_rate: Option<f32>,

	/// Skip publishing.
	#[arg(long)]
	no_publish: bool,
}

impl Args {
	fn apply(&self, config: &mut Config) {
		if let Some(depth) = self.depth {
			config.fractal.depth = depth;
		}
		if let Some(frames) = self.frames {
			config.run.frames = frames;
		}
		if let Some(threads) = self.threads {
			config.fractal.worker_threads = threads;
		}
		if let Some(batch) = self.batch {
			config.fractal.parallel_batch_size = batch;
		}
		if let Some(spin_rate) = self.spin_rate {
			config.fractal.spin_rate = spin_rate;
		}
		if self.no_publish {
			config.run.publish = false;
		}
	}
}

fn main() -> Result<()> {
	env_logger::init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			log::info!("Loading config from: {}", path.display());
			Config::load(path)?
		}
		None => Config::default(),
	};
	args.apply(&mut config);
	config.validate()?;

	let geometry = Arc::new(GeometryTable::canonical());
	let mut publisher = InstancePublisher::new(RecordingBackend::new());
	let mut fractal = Fractal::initialize_with(config.fractal.clone(), geometry, &mut publisher)
		.context("Failed to initialize fractal")?;

	let store = fractal.store().context("Fractal has no level storage")?;
	println!(
		"Depth {}: {} nodes, {:.2} MiB level storage",
		store.depth(),
		store.total_nodes(),
		store.memory_bytes() as f64 / 1_048_576.0
	);

	let placement = config.run.placement.to_placement();
	let mut frame_timings = RollingWindow::new(config.run.frames.max(1) as usize);
	let mut level_totals = vec![0u64; config.fractal.depth];

	for _ in 0..config.run.frames {
		let report = fractal.advance(config.run.frame_time, placement)?;
		frame_timings.push(report.total_us);
		for (total, us) in level_totals.iter_mut().zip(&report.level_timings_us) {
			*total += us;
		}

		if config.run.publish {
			fractal.publish(&mut publisher, &(), &())?;
			publisher.backend_mut().take_draws();
		}
	}

	let frames = config.run.frames.max(1);
	let (min, max) = frame_timings.min_max().unwrap_or_default();
	println!(
		"{} frames: avg {:.1} us, min {} us, p99 {} us, max {} us",
		config.run.frames,
		frame_timings.average(),
		min,
		frame_timings.percentile(99.0).unwrap_or_default(),
		max
	);
	for (level, total) in level_totals.iter().enumerate() {
		println!("  level {}: avg {:.1} us", level, *total as f64 / frames as f64);
	}

	let metrics = fractal.metrics();
	if metrics.over_budget_frames > 0 {
		println!(
			"{} frames over the {} us budget",
			metrics.over_budget_frames, config.fractal.frame_budget_us
		);
	}
	if config.run.publish {
		println!(
			"Published {} matrices, avg publish {:.1} us",
			publisher.backend().uploaded_matrices,
			metrics.avg_publish_us()
		);
	}
	if let Some(root) = fractal.store().map(|store| store.root()) {
		println!(
			"Root spin after {:.2} s: {:.4} rad",
			config.run.frames as f32 * config.run.frame_time,
			root.spin_angle
		);
	}

	fractal.shutdown_with(&mut publisher);
	Ok(())
}
