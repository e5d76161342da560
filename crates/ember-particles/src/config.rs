//! Kernel configuration, loadable from TOML

use ember_core::{EmberError, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inclusive `{min, max}` pair sampled uniformly per emitted particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }

    fn check(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(EmberError::Config(format!(
                "{name} bounds must be finite, got {{{}, {}}}",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(EmberError::Config(format!(
                "{name} min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Construction-time options for a `ParticleKernel`.
///
/// Every field has a default, so a config file may name any subset:
///
/// ```toml
/// max_particles = 500
/// emitter_position = [0.0, 1.0, 0.0]
/// lifespan_range = { min = 1.0, max = 3.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Pool capacity, fixed for the kernel's lifetime
    pub max_particles: usize,
    /// Particles requested by `emit_at_rate`
    pub emit_rate: usize,
    /// Subtracted from vertical velocity once per tick
    pub gravity: f32,
    /// Half-width of the horizontal launch velocity range
    pub spread: f32,
    pub emitter_position: Vec3,
    /// Fixed RNG seed; `None` seeds from the OS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub lifespan_range: FloatRange,
    pub size_range: FloatRange,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_particles: 1000,
            emit_rate: 20,
            gravity: 0.005,
            spread: 0.5,
            emitter_position: Vec3::ZERO,
            seed: None,
            lifespan_range: FloatRange::new(2.0, 4.0),
            size_range: FloatRange::new(0.05, 0.35),
        }
    }
}

impl KernelConfig {
    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_emit_rate(mut self, emit_rate: usize) -> Self {
        self.emit_rate = emit_rate;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_spread(mut self, spread: f32) -> Self {
        self.spread = spread;
        self
    }

    pub fn with_emitter_position(mut self, position: Vec3) -> Self {
        self.emitter_position = position;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_lifespan_range(mut self, min: f32, max: f32) -> Self {
        self.lifespan_range = FloatRange::new(min, max);
        self
    }

    pub fn with_size_range(mut self, min: f32, max: f32) -> Self {
        self.size_range = FloatRange::new(min, max);
        self
    }

    /// Reject configurations the kernel cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_particles == 0 {
            return Err(EmberError::Config(
                "max_particles must be greater than 0".to_string(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(EmberError::Config(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if !self.spread.is_finite() {
            return Err(EmberError::Config(format!(
                "spread must be finite, got {}",
                self.spread
            )));
        }
        self.lifespan_range.check("lifespan_range")?;
        self.size_range.check("size_range")?;
        // Life progress divides by lifespan
        if self.lifespan_range.min <= 0.0 {
            return Err(EmberError::Config(format!(
                "lifespan_range min must be positive, got {}",
                self.lifespan_range.min
            )));
        }
        if self.size_range.min < 0.0 {
            return Err(EmberError::Config(format!(
                "size_range min must not be negative, got {}",
                self.size_range.min
            )));
        }
        Ok(())
    }

    /// Parse from a TOML document. Does not validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
