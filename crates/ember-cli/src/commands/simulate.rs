//! Headless simulation command
//!
//! Plays the renderer's role: each frame calls `emit`, then `update`, then
//! reads the three attribute buffers.

use anyhow::{bail, Context, Result};
use ember_core::Vec3;
use ember_particles::{KernelConfig, ParticleKernel};
use log::info;
use serde::Serialize;

pub struct SimulateArgs {
    pub config: Option<String>,
    pub frames: u32,
    pub dt: f32,
    pub emit: Option<usize>,
    pub seed: Option<u64>,
    pub gravity: Option<f32>,
    pub emitter: Option<String>,
    pub orbit: Option<f32>,
    pub every: u32,
    pub format: String,
}

/// Per-frame statistics as seen after `update`
#[derive(Debug, Clone, Serialize)]
pub struct FrameStats {
    pub frame: u32,
    pub active: usize,
    pub available: usize,
    pub mean_height: f32,
}

/// Everything a renderer would have uploaded on the last frame, plus history
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub frames: u32,
    pub dt: f32,
    pub capacity: usize,
    pub history: Vec<FrameStats>,
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub sizes: Vec<f32>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => bail!("Unknown format '{}' (expected text or json)", other),
    };

    let mut config = match &args.config {
        Some(path) => KernelConfig::load(path)
            .with_context(|| format!("Failed to load config from {path}"))?,
        None => KernelConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(gravity) = args.gravity {
        config.gravity = gravity;
    }
    if let Some(pos) = &args.emitter {
        config.emitter_position = parse_vec3(pos)?;
    }

    let mut kernel = ParticleKernel::new(config)?;
    info!(
        "Simulating {} frame(s) at dt={} with capacity {}",
        args.frames,
        args.dt,
        kernel.capacity()
    );

    let report = simulate(&mut kernel, &args);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let every = args.every.max(1);
        for stats in report
            .history
            .iter()
            .filter(|s| s.frame % every == 0 || s.frame + 1 == report.frames)
        {
            println!(
                "frame {:>5}  active {:>6}  available {:>6}  mean height {:>8.3}",
                stats.frame, stats.active, stats.available, stats.mean_height
            );
        }
        println!(
            "\n{} particle(s) alive after {} frame(s) (capacity {})",
            report.sizes.len(),
            report.frames,
            report.capacity
        );
    }

    Ok(())
}

/// Drive `kernel` for `args.frames` frames and collect the report.
fn simulate(kernel: &mut ParticleKernel, args: &SimulateArgs) -> SimulationReport {
    let base = kernel.emitter_position();
    let mut history = Vec::with_capacity(args.frames as usize);
    let mut positions = Vec::new();

    for frame in 0..args.frames {
        if let Some(radius) = args.orbit {
            let angle = frame as f32 * args.dt;
            kernel.set_emitter_position(
                base.x + radius * angle.cos(),
                base.y,
                base.z + radius * angle.sin(),
            );
        }

        match args.emit {
            Some(count) => kernel.emit(count),
            None => kernel.emit_at_rate(),
        }
        kernel.update(args.dt);

        kernel.write_positions(&mut positions);
        history.push(FrameStats {
            frame,
            active: kernel.active_count(),
            available: kernel.available_count(),
            mean_height: mean_height(&positions),
        });
    }

    SimulationReport {
        frames: args.frames,
        dt: args.dt,
        capacity: kernel.capacity(),
        history,
        positions: kernel.positions(),
        colors: kernel.colors(),
        sizes: kernel.sizes(),
    }
}

fn mean_height(positions: &[f32]) -> f32 {
    let count = positions.len() / 3;
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = positions.chunks_exact(3).map(|p| p[1]).sum();
    sum / count as f32
}

/// Parse "x,y,z" into a vector
fn parse_vec3(s: &str) -> Result<Vec3> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("Expected 'x,y,z', got '{}'", s);
    }
    let mut xyz = [0.0_f32; 3];
    for (slot, part) in xyz.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("Invalid coordinate '{}' in '{}'", part, s))?;
    }
    Ok(Vec3::from_array(xyz))
}
