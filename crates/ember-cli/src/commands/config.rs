//! Default configuration command

use anyhow::{Context, Result};
use ember_particles::KernelConfig;

pub fn run(output: Option<String>) -> Result<()> {
    let text = KernelConfig::default().to_toml_string()?;
    match output {
        Some(path) => {
            std::fs::write(&path, &text).with_context(|| format!("Failed to write {path}"))?;
            println!("Wrote default config to {path}");
        }
        None => print!("{text}"),
    }
    Ok(())
}
