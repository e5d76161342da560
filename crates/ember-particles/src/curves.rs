//! Value-over-lifetime fades driven by life progress (`age / lifespan`)

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Red fades out, blue fades in, alpha fades out. Green is left as emitted.
pub fn life_color(color: [f32; 4], progress: f32) -> [f32; 4] {
    let fade_out = lerp_f32(1.0, 0.0, progress);
    [fade_out, color[1], lerp_f32(0.0, 1.0, progress), fade_out]
}

/// Base size scaled down linearly to zero at end of life
pub fn shrink(size: f32, progress: f32) -> f32 {
    size * (1.0 - progress)
}
