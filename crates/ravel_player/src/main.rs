// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ravel` - headless player for ravel node graphs.
//!
//! Loads a scene file (base64 text around the binary scene format), steps
//! it for a fixed number of frames and prints every node's view. Also
//! writes the built-in demo scene and dumps scenes as JSON.

mod config;
mod demo;
mod error;
mod player;
mod scene_text;

use clap::{Args, Parser, Subcommand};
use config::PlayerConfig;
use error::PlayerError;
use player::SceneSummary;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Headless player for ravel node graphs
#[derive(Parser)]
#[command(name = "ravel", version, about = "Headless player for ravel node graphs")]
struct Cli {
    /// Config file (default: ./ravel.ron if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Available subcommands
#[derive(Subcommand)]
enum Command {
    /// Step a saved scene and print its node views
    Run {
        /// Scene file
        scene: PathBuf,

        #[command(flatten)]
        frames: FrameArgs,
    },
    /// Write the built-in demo scene
    Demo {
        /// Output scene file
        out: PathBuf,

        /// OBJ file for the instanced mesh
        #[arg(long)]
        mesh: Option<String>,

        /// Run the scene after writing it
        #[arg(long)]
        run: bool,

        #[command(flatten)]
        frames: FrameArgs,
    },
    /// Print a scene's nodes and edges as JSON
    Inspect {
        /// Scene file
        scene: PathBuf,

        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },
}

/// Frame overrides shared by the running subcommands
#[derive(Args)]
struct FrameArgs {
    /// Number of frames to run
    #[arg(long)]
    frames: Option<u64>,

    /// Fixed frame delta in milliseconds
    #[arg(long = "dt-ms")]
    dt_ms: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match PlayerConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ravel: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.log_filter) {
        eprintln!("ravel: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!("Starting ravel v{}", env!("CARGO_PKG_VERSION"));

    match execute(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: &str) -> Result<(), PlayerError> {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(filter).map_err(|e| PlayerError::LogFilter {
            filter: filter.to_string(),
            message: e.to_string(),
        })?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn execute(command: Command, config: PlayerConfig) -> Result<(), PlayerError> {
    let stdout = std::io::stdout();
    match command {
        Command::Run { scene, frames } => {
            let config = config.with_overrides(frames.frames, frames.dt_ms);
            let mut graph = scene_text::read_scene(&scene)?;
            player::run(&mut graph, &config, &mut stdout.lock())
        }
        Command::Demo {
            out,
            mesh,
            run,
            frames,
        } => {
            let config = config.with_overrides(frames.frames, frames.dt_ms);
            let mut graph = demo::build_demo(mesh.as_deref())?;
            scene_text::write_scene(&out, &graph)?;
            if run {
                player::run(&mut graph, &config, &mut stdout.lock())?;
            }
            Ok(())
        }
        Command::Inspect { scene, pretty } => {
            let graph = scene_text::read_scene(&scene)?;
            SceneSummary::of(&graph).write_json(&mut stdout.lock(), pretty)
        }
    }
}
