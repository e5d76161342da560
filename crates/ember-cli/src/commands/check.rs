//! Config validation command

use anyhow::{Context, Result};
use ember_particles::KernelConfig;

pub fn run(path: &str) -> Result<()> {
    let config =
        KernelConfig::load(path).with_context(|| format!("Failed to load config from {path}"))?;
    config
        .validate()
        .with_context(|| format!("{path} is not a usable kernel config"))?;

    println!(
        "{path}: ok (capacity {}, emit rate {}, lifespan {}..{}s)",
        config.max_particles,
        config.emit_rate,
        config.lifespan_range.min,
        config.lifespan_range.max
    );
    Ok(())
}
