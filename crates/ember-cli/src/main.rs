//! Ember CLI - headless driver for the Ember particle kernel

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, config, simulate};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Drive the Ember particle kernel without a renderer", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kernel frame by frame and report what a renderer would receive
    Simulate {
        /// Kernel config file (TOML); defaults apply when omitted
        #[arg(long)]
        config: Option<String>,

        /// Number of frames to run
        #[arg(long, default_value_t = 120)]
        frames: u32,

        /// Seconds per frame
        #[arg(long, default_value_t = ember_particles::DEFAULT_TIMESTEP)]
        dt: f32,

        /// Particles requested per frame (defaults to the config's emit_rate)
        #[arg(long)]
        emit: Option<usize>,

        /// RNG seed, overriding the config
        #[arg(long)]
        seed: Option<u64>,

        /// Gravity, overriding the config
        #[arg(long)]
        gravity: Option<f32>,

        /// Emitter position as "x,y,z"
        #[arg(long, allow_hyphen_values = true)]
        emitter: Option<String>,

        /// Sweep the emitter around a horizontal circle of this radius
        #[arg(long)]
        orbit: Option<f32>,

        /// Print a summary line every N frames (text format)
        #[arg(long, default_value_t = 10)]
        every: u32,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the default kernel configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Load and validate a kernel config file
    Check {
        /// Path to config file
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins when set
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Simulate {
            config,
            frames,
            dt,
            emit,
            seed,
            gravity,
            emitter,
            orbit,
            every,
            format,
        } => simulate::run(simulate::SimulateArgs {
            config,
            frames,
            dt,
            emit,
            seed,
            gravity,
            emitter,
            orbit,
            every,
            format,
        }),
        Commands::Config { output } => config::run(output),
        Commands::Check { path } => check::run(&path),
    }
}
