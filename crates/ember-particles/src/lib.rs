//! Ember Particles - pooled CPU particle simulation kernel
//!
//! Provides a single-emitter fountain/fire particle population with:
//! - Fixed-capacity pool, swap-remove retirement, no per-frame allocation
//! - Per-tick emission, gravity and lifetime integration
//! - Red-to-blue color fade and size shrink over each particle's life
//! - Flat position/color/size buffers and interleaved vertices for renderers

pub mod config;
pub mod curves;
pub mod kernel;
pub mod particle;
pub mod rng;

pub use config::{FloatRange, KernelConfig};
pub use kernel::{ParticleKernel, DEFAULT_TIMESTEP};
pub use particle::{as_bytes, Particle, ParticlePool, PointVertex};
