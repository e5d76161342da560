//! The particle kernel: emission, integration and buffer extraction

use crate::config::KernelConfig;
use crate::curves::life_color;
use crate::particle::{ParticlePool, PointVertex};
use crate::rng::ParticleRng;
use ember_core::{Color, Result, Vec3};
use log::{debug, trace, warn};

/// Tick length used by `step`
pub const DEFAULT_TIMESTEP: f32 = 1.0 / 60.0;

/// Vertical launch speed band, independent of `spread`
const LAUNCH_SPEED_MIN: f32 = 0.2;
const LAUNCH_SPEED_MAX: f32 = 0.7;

/// One emitter and its fixed-capacity particle population.
///
/// The host drives it once per frame: `emit` (or `emit_at_rate`), then
/// `update`, then reads `positions`/`colors`/`sizes`. Index `i` refers to the
/// same particle in all three buffers until the next mutating call.
#[derive(Debug)]
pub struct ParticleKernel {
    config: KernelConfig,
    pool: ParticlePool,
    rng: ParticleRng,
}

impl ParticleKernel {
    /// Validate `config` and pre-allocate `max_particles` records.
    pub fn new(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ParticleRng::new(seed),
            None => ParticleRng::from_entropy(),
        };
        let pool = ParticlePool::new(config.max_particles);
        debug!(
            "[particles] kernel ready: capacity {}, emit rate {}",
            config.max_particles, config.emit_rate
        );
        Ok(Self { config, pool, rng })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Takes effect on the next `emit`.
    pub fn set_emitter_position(&mut self, x: f32, y: f32, z: f32) {
        self.config.emitter_position = Vec3::new(x, y, z);
    }

    pub fn emitter_position(&self) -> Vec3 {
        self.config.emitter_position
    }

    /// Applies from the next `update`.
    pub fn set_gravity(&mut self, gravity: f32) {
        self.config.gravity = gravity;
    }

    pub fn gravity(&self) -> f32 {
        self.config.gravity
    }

    /// Activate up to `count` particles at the emitter. Stops silently once
    /// the pool is exhausted.
    pub fn emit(&mut self, count: usize) {
        let origin = self.config.emitter_position.to_array();
        let spread = self.config.spread;
        let lifespan = self.config.lifespan_range;
        let size = self.config.size_range;

        let mut emitted = 0;
        for _ in 0..count {
            let Some(p) = self.pool.spawn() else {
                break;
            };
            p.position = origin;
            p.velocity = [
                self.rng.range(-spread, spread),
                self.rng.range(LAUNCH_SPEED_MIN, LAUNCH_SPEED_MAX),
                self.rng.range(-spread, spread),
            ];
            p.age = 0.0;
            p.lifespan = self.rng.range(lifespan.min, lifespan.max);
            p.size = self.rng.range(size.min, size.max);
            p.color = Color::EMBER.to_array();
            emitted += 1;
        }

        if emitted < count {
            trace!(
                "[particles] emit capped at capacity: {emitted} of {count} (active {})",
                self.pool.alive_count()
            );
        }
    }

    /// `emit` with the configured `emit_rate`
    pub fn emit_at_rate(&mut self) {
        self.emit(self.config.emit_rate);
    }

    /// Advance every active particle by one tick of `dt` seconds and retire
    /// the ones whose age reached their lifespan.
    ///
    /// Velocity is applied as a per-tick displacement and gravity once per
    /// call; only age (and the fades derived from it) scale with `dt`.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt >= 0.0 {
            dt
        } else {
            warn!("[particles] ignoring unusable timestep {dt}, treating as 0");
            0.0
        };
        let gravity = self.config.gravity;

        for p in self.pool.alive_slice_mut() {
            p.position[0] += p.velocity[0];
            p.position[1] += p.velocity[1];
            p.position[2] += p.velocity[2];

            p.velocity[1] -= gravity;

            p.age += dt;
            p.color = life_color(p.color, p.life_progress());
        }

        let retired = self.pool.retire_expired();
        if retired > 0 {
            trace!(
                "[particles] retired {retired}, {} still active",
                self.pool.alive_count()
            );
        }
    }

    /// `update` with `DEFAULT_TIMESTEP`
    pub fn step(&mut self) {
        self.update(DEFAULT_TIMESTEP);
    }

    pub fn active_count(&self) -> usize {
        self.pool.alive_count()
    }

    /// Records waiting in the pool. Always `capacity() - active_count()`.
    pub fn available_count(&self) -> usize {
        self.pool.available_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// `x, y, z` per active particle
    pub fn positions(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.write_positions(&mut out);
        out
    }

    /// `r, g, b, a` per active particle, as of the last `update`
    pub fn colors(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.write_colors(&mut out);
        out
    }

    /// One size per active particle, shrunk by current life progress
    pub fn sizes(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.write_sizes(&mut out);
        out
    }

    /// Like `positions`, reusing `out`'s allocation
    pub fn write_positions(&self, out: &mut Vec<f32>) {
        let alive = self.pool.alive_slice();
        out.clear();
        out.reserve(alive.len() * 3);
        for p in alive {
            out.extend_from_slice(&p.position);
        }
    }

    pub fn write_colors(&self, out: &mut Vec<f32>) {
        let alive = self.pool.alive_slice();
        out.clear();
        out.reserve(alive.len() * 4);
        for p in alive {
            out.extend_from_slice(&p.color);
        }
    }

    pub fn write_sizes(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.pool.alive_slice().iter().map(|p| p.visual_size()));
    }

    /// Pack active particles into an interleaved vertex buffer, same order and
    /// values as the flat buffers.
    pub fn pack_vertices(&self, out: &mut Vec<PointVertex>) {
        out.clear();
        out.extend(self.pool.alive_slice().iter().map(PointVertex::from_particle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FloatRange;
    use ember_core::EmberError;

    fn still_config(max_particles: usize) -> KernelConfig {
        KernelConfig::default()
            .with_max_particles(max_particles)
            .with_gravity(0.0)
            .with_spread(0.0)
            .with_lifespan_range(1.0, 1.0)
            .with_size_range(1.0, 1.0)
            .with_seed(1)
    }

    fn seeded(max_particles: usize, seed: u64) -> ParticleKernel {
        ParticleKernel::new(
            KernelConfig::default()
                .with_max_particles(max_particles)
                .with_seed(seed),
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = ParticleKernel::new(KernelConfig::default().with_max_particles(0)).unwrap_err();
        assert!(matches!(err, EmberError::Config(_)));

        let inverted = KernelConfig::default().with_lifespan_range(3.0, 1.0);
        assert!(ParticleKernel::new(inverted).is_err());
    }

    #[test]
    fn fresh_kernel_is_empty() {
        let kernel = seeded(10, 0);
        assert_eq!(kernel.active_count(), 0);
        assert_eq!(kernel.available_count(), 10);
        assert!(kernel.positions().is_empty());
        assert!(kernel.colors().is_empty());
        assert!(kernel.sizes().is_empty());
    }

    #[test]
    fn emit_then_full_lifespan_tick_retires_all() {
        let mut kernel = ParticleKernel::new(still_config(5)).unwrap();
        kernel.emit(3);
        assert_eq!(kernel.active_count(), 3);
        assert_eq!(kernel.sizes(), vec![1.0, 1.0, 1.0]);

        kernel.update(1.0);
        assert_eq!(kernel.active_count(), 0);
        assert!(kernel.positions().is_empty());
        assert!(kernel.colors().is_empty());
        assert!(kernel.sizes().is_empty());
        assert_eq!(kernel.available_count(), 5);
    }

    #[test]
    fn emit_caps_at_capacity() {
        let mut kernel = seeded(4, 3);
        kernel.emit(10);
        assert_eq!(kernel.active_count(), 4);
        assert_eq!(kernel.positions().len(), 12);

        kernel.emit(1);
        assert_eq!(kernel.active_count(), 4);
    }

    #[test]
    fn capacity_and_conservation_hold_over_many_frames() {
        let mut kernel = ParticleKernel::new(
            KernelConfig::default()
                .with_max_particles(50)
                .with_lifespan_range(0.1, 0.5)
                .with_seed(11),
        )
        .unwrap();
        for frame in 0..300 {
            kernel.emit(7 + frame % 5);
            assert!(kernel.active_count() <= kernel.capacity());
            kernel.update(DEFAULT_TIMESTEP);
            assert!(kernel.active_count() <= kernel.capacity());
            assert_eq!(kernel.active_count() + kernel.available_count(), 50);
        }
    }

    #[test]
    fn emit_at_rate_uses_configured_rate() {
        let mut kernel = ParticleKernel::new(
            KernelConfig::default()
                .with_max_particles(100)
                .with_emit_rate(20)
                .with_seed(5),
        )
        .unwrap();
        kernel.emit_at_rate();
        assert_eq!(kernel.active_count(), 20);
        kernel.emit_at_rate();
        assert_eq!(kernel.active_count(), 40);
    }

    #[test]
    fn emitted_particles_start_at_emitter_with_spawn_state() {
        let mut kernel = seeded(64, 21);
        kernel.set_emitter_position(1.0, 2.0, 3.0);
        kernel.emit(64);

        let positions = kernel.positions();
        for chunk in positions.chunks(3) {
            assert_eq!(chunk, &[1.0, 2.0, 3.0]);
        }
        for chunk in kernel.colors().chunks(4) {
            assert_eq!(chunk, &[1.0, 0.3, 0.0, 1.0]);
        }

        let config = kernel.config().clone();
        for p in kernel.pool.alive_slice() {
            assert!(p.velocity[0].abs() <= config.spread);
            assert!(p.velocity[2].abs() <= config.spread);
            assert!(p.velocity[1] >= LAUNCH_SPEED_MIN && p.velocity[1] <= LAUNCH_SPEED_MAX);
            assert!(config.lifespan_range.contains(p.lifespan));
            assert!(config.size_range.contains(p.size));
            assert_eq!(p.age, 0.0);
        }
    }

    #[test]
    fn emitter_move_applies_to_next_emit_only() {
        let mut kernel = ParticleKernel::new(still_config(4)).unwrap();
        kernel.emit(1);
        kernel.set_emitter_position(5.0, 0.0, 0.0);
        assert_eq!(kernel.emitter_position(), Vec3::new(5.0, 0.0, 0.0));
        kernel.emit(1);

        let mut xs: Vec<f32> = kernel.positions().chunks(3).map(|c| c[0]).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![0.0, 5.0]);
    }

    #[test]
    fn position_integrates_unscaled_velocity_and_gravity() {
        let mut kernel = ParticleKernel::new(
            still_config(1)
                .with_lifespan_range(100.0, 100.0)
                .with_gravity(0.1),
        )
        .unwrap();
        kernel.emit(1);
        let vy0 = kernel.pool.alive_slice()[0].velocity[1];

        // dt has no effect on displacement
        kernel.update(0.5);
        let p = &kernel.pool.alive_slice()[0];
        assert!((p.position[1] - vy0).abs() < 1e-6);
        assert!((p.velocity[1] - (vy0 - 0.1)).abs() < 1e-6);

        kernel.update(0.001);
        let p = &kernel.pool.alive_slice()[0];
        assert!((p.position[1] - (vy0 + vy0 - 0.1)).abs() < 1e-5);
        assert!((p.age - 0.501).abs() < 1e-6);
    }

    #[test]
    fn set_gravity_changes_fall_rate() {
        let mut kernel = ParticleKernel::new(still_config(1).with_lifespan_range(10.0, 10.0)).unwrap();
        kernel.set_gravity(0.25);
        assert!((kernel.gravity() - 0.25).abs() < 1e-9);
        kernel.emit(1);
        let vy0 = kernel.pool.alive_slice()[0].velocity[1];
        kernel.update(DEFAULT_TIMESTEP);
        kernel.update(DEFAULT_TIMESTEP);
        let vy = kernel.pool.alive_slice()[0].velocity[1];
        assert!((vy - (vy0 - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn particle_retires_on_tick_age_reaches_lifespan() {
        let mut kernel = ParticleKernel::new(still_config(2)).unwrap();
        kernel.emit(1);
        for _ in 0..3 {
            kernel.update(0.25);
            assert_eq!(kernel.active_count(), 1);
        }
        kernel.update(0.25);
        assert_eq!(kernel.active_count(), 0);
        assert!(kernel.sizes().is_empty());

        kernel.update(0.25);
        assert_eq!(kernel.active_count(), 0);
    }

    #[test]
    fn color_and_size_follow_life_progress() {
        let mut kernel = ParticleKernel::new(
            still_config(3)
                .with_lifespan_range(2.0, 2.0)
                .with_size_range(0.4, 0.4),
        )
        .unwrap();
        kernel.emit(3);

        for (tick, expected_p) in [(1, 0.25_f32), (2, 0.5), (3, 0.75)] {
            kernel.update(0.5);
            assert_eq!(kernel.active_count(), 3, "tick {tick}");
            for c in kernel.colors().chunks(4) {
                assert!((c[0] - (1.0 - expected_p)).abs() < 1e-6);
                assert!((c[1] - 0.3).abs() < 1e-6);
                assert!((c[2] - expected_p).abs() < 1e-6);
                assert!((c[3] - (1.0 - expected_p)).abs() < 1e-6);
            }
            for s in kernel.sizes() {
                assert!((s - 0.4 * (1.0 - expected_p)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn buffers_stay_aligned_through_retirement() {
        let mut kernel = ParticleKernel::new(
            KernelConfig::default()
                .with_max_particles(64)
                .with_spread(0.0)
                .with_lifespan_range(0.05, 0.3)
                .with_seed(77),
        )
        .unwrap();

        let mut retired_total = 0;
        for frame in 0..60 {
            // Tag each batch: emitter x and base size both carry the frame tag
            let tag = (frame + 1) as f32;
            kernel.set_emitter_position(tag, 0.0, 0.0);
            kernel.config.size_range = FloatRange::new(tag, tag);

            let before = kernel.active_count();
            kernel.emit(4);
            let spawned = kernel.active_count();
            kernel.step();
            retired_total += spawned - kernel.active_count();

            let n = kernel.active_count();
            let positions = kernel.positions();
            let colors = kernel.colors();
            let sizes = kernel.sizes();
            assert_eq!(positions.len(), n * 3);
            assert_eq!(colors.len(), n * 4);
            assert_eq!(sizes.len(), n);
            assert!(spawned >= before);

            for i in 0..n {
                let tag = positions[3 * i];
                let alpha = colors[4 * i + 3];
                let progress = 1.0 - alpha;
                assert!((0.0..1.0).contains(&progress), "frame {frame} index {i}");
                assert!((colors[4 * i] - (1.0 - progress)).abs() < 1e-6);
                assert!((colors[4 * i + 1] - 0.3).abs() < 1e-6);
                assert!((colors[4 * i + 2] - progress).abs() < 1e-5);
                assert!(
                    (sizes[i] - tag * (1.0 - progress)).abs() < 1e-4 * tag,
                    "frame {frame} index {i}: size {} does not match tag {tag}",
                    sizes[i]
                );
            }
        }
        assert!(retired_total > 0);
    }

    #[test]
    fn sizes_are_recomputed_at_read_time() {
        let mut kernel = ParticleKernel::new(
            still_config(1)
                .with_lifespan_range(4.0, 4.0)
                .with_size_range(1.0, 1.0),
        )
        .unwrap();
        kernel.emit(1);
        kernel.update(1.0);
        assert!((kernel.sizes()[0] - 0.75).abs() < 1e-6);
        kernel.pool.alive_slice_mut()[0].age = 2.0;
        assert!((kernel.sizes()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn update_with_no_particles_is_noop() {
        let mut kernel = seeded(8, 2);
        kernel.update(DEFAULT_TIMESTEP);
        kernel.step();
        assert_eq!(kernel.active_count(), 0);
        assert_eq!(kernel.available_count(), 8);
    }

    #[test]
    fn negative_or_nan_timestep_does_not_age() {
        let mut kernel = ParticleKernel::new(still_config(2)).unwrap();
        kernel.emit(2);
        kernel.update(-1.0);
        kernel.update(f32::NAN);
        assert_eq!(kernel.active_count(), 2);
        for p in kernel.pool.alive_slice() {
            assert_eq!(p.age, 0.0);
        }
    }

    #[test]
    fn pooled_records_are_reused() {
        let mut kernel = ParticleKernel::new(still_config(3)).unwrap();
        let arena = kernel.pool.alive_slice().as_ptr();
        for _ in 0..10 {
            kernel.emit(3);
            assert_eq!(kernel.active_count(), 3);
            assert_eq!(kernel.pool.alive_slice().as_ptr(), arena);
            kernel.update(1.0);
            assert_eq!(kernel.active_count(), 0);
            assert_eq!(kernel.available_count(), 3);
        }
        kernel.emit(10);
        assert_eq!(kernel.pool.alive_slice().as_ptr(), arena);
        assert_eq!(kernel.capacity(), 3);
    }

    #[test]
    fn write_variants_reuse_allocation() {
        let mut kernel = seeded(32, 9);
        kernel.emit(32);
        let mut buf: Vec<f32> = Vec::with_capacity(256);
        let ptr = buf.as_ptr();
        kernel.write_positions(&mut buf);
        assert_eq!(buf.len(), 96);
        assert_eq!(buf.as_ptr(), ptr);
        kernel.write_colors(&mut buf);
        assert_eq!(buf, kernel.colors());
        kernel.write_sizes(&mut buf);
        assert_eq!(buf, kernel.sizes());
    }

    #[test]
    fn packed_vertices_match_flat_buffers() {
        let mut kernel = seeded(50, 4);
        kernel.emit(30);
        kernel.step();
        let mut verts = Vec::new();
        kernel.pack_vertices(&mut verts);
        assert_eq!(verts.len(), kernel.active_count());

        let positions = kernel.positions();
        let colors = kernel.colors();
        let sizes = kernel.sizes();
        for (i, v) in verts.iter().enumerate() {
            assert_eq!(&v.position[..], &positions[3 * i..3 * i + 3]);
            assert_eq!(&v.color[..], &colors[4 * i..4 * i + 4]);
            assert_eq!(v.size, sizes[i]);
        }
    }

    #[test]
    fn kernel_can_move_to_another_thread() {
        fn assert_send<T: Send>() {}
        assert_send::<ParticleKernel>();
    }

    #[test]
    fn same_seed_reproduces_simulation() {
        let mut a = seeded(100, 1234);
        let mut b = seeded(100, 1234);
        for _ in 0..30 {
            a.emit_at_rate();
            b.emit_at_rate();
            a.step();
            b.step();
        }
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.sizes(), b.sizes());
    }
}
