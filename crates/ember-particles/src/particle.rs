//! Particle types: CPU simulation state and renderer vertex data

use bytemuck::{Pod, Zeroable};

use crate::curves::shrink;

/// CPU-side particle state
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// Seconds since emission
    pub age: f32,
    /// Sampled at emission, fixed for the particle's life
    pub lifespan: f32,
    /// Base size, sampled at emission
    pub size: f32,
    pub color: [f32; 4],
}

impl Particle {
    pub fn dead() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            age: 0.0,
            lifespan: 0.0,
            size: 0.0,
            color: [0.0; 4],
        }
    }

    /// `age / lifespan`. Exceeds 1 only on the tick a particle dies.
    pub fn life_progress(&self) -> f32 {
        if self.lifespan <= 0.0 {
            1.0
        } else {
            self.age / self.lifespan
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifespan
    }

    /// Size as the renderer should draw it right now
    pub fn visual_size(&self) -> f32 {
        shrink(self.size, self.life_progress())
    }
}

/// Interleaved point vertex for hosts that upload a single vertex buffer.
/// 32 bytes, no padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub size: f32,
}

impl PointVertex {
    pub fn from_particle(p: &Particle) -> Self {
        Self {
            position: p.position,
            color: p.color,
            size: p.visual_size(),
        }
    }
}

/// Reinterpret packed vertices as raw bytes for upload.
pub fn as_bytes(vertices: &[PointVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Fixed-capacity particle arena.
///
/// Slots `[0, alive_count)` are the active set, slots `[alive_count, capacity)`
/// are the available pool. Retiring a particle swaps it with the last active
/// slot, so active order is not stable across ticks.
pub struct ParticlePool {
    particles: Vec<Particle>,
    alive_count: usize,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        let mut particles = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            particles.push(Particle::dead());
        }
        Self {
            particles,
            alive_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Records not currently active
    pub fn available_count(&self) -> usize {
        self.particles.len() - self.alive_count
    }

    pub fn is_full(&self) -> bool {
        self.alive_count >= self.particles.len()
    }

    /// Activate one record, returning a mutable ref to initialize it.
    /// Returns None if pool is full.
    pub fn spawn(&mut self) -> Option<&mut Particle> {
        if self.is_full() {
            return None;
        }
        let idx = self.alive_count;
        self.alive_count += 1;
        Some(&mut self.particles[idx])
    }

    /// Return every expired particle to the pool via swap-remove.
    /// Returns the number retired.
    pub fn retire_expired(&mut self) -> usize {
        let mut retired = 0;
        let mut i = 0;
        while i < self.alive_count {
            if self.particles[i].is_expired() {
                self.alive_count -= 1;
                if i < self.alive_count {
                    self.particles.swap(i, self.alive_count);
                }
                retired += 1;
                // Swapped-in particle still needs checking
            } else {
                i += 1;
            }
        }
        retired
    }

    /// Active particles (first `alive_count` slots)
    pub fn alive_slice(&self) -> &[Particle] {
        &self.particles[..self.alive_count]
    }

    pub fn alive_slice_mut(&mut self) -> &mut [Particle] {
        &mut self.particles[..self.alive_count]
    }
}

impl std::fmt::Debug for ParticlePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticlePool")
            .field("capacity", &self.capacity())
            .field("alive_count", &self.alive_count())
            .finish()
    }
}
