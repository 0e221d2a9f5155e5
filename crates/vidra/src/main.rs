// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vidra - an AI video generation studio.
//!
//! This is the binary entry point. Each command wires up the full studio,
//! runs, and shuts the background tasks down before exiting.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod doctor;
mod output;
mod prompt;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vidra_core::{AspectRatio, GenerationMode, JobId, Resolution, VidraError};

use crate::app::App;
use crate::commands::GenerateArgs;

/// Vidra - an AI video generation studio.
#[derive(Parser, Debug)]
#[command(name = "vidra", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a video and wait for it to finish.
    Generate {
        /// Text prompt.
        #[arg(default_value = "")]
        prompt: String,
        /// Generation mode (inferred from the supplied media when omitted).
        #[arg(long)]
        mode: Option<GenerationMode>,
        #[arg(long)]
        model: Option<String>,
        /// Output resolution: 720p or 1080p.
        #[arg(long)]
        resolution: Option<Resolution>,
        /// Aspect ratio: 16:9 or 9:16.
        #[arg(long)]
        aspect_ratio: Option<AspectRatio>,
        /// Start frame, or the still to edit.
        #[arg(long)]
        start_frame: Option<PathBuf>,
        /// Reference image; may be repeated.
        #[arg(long = "reference")]
        references: Vec<PathBuf>,
        /// Character image for character replacement.
        #[arg(long)]
        character: Option<PathBuf>,
        /// Render a preview still before submitting.
        #[arg(long)]
        preview: bool,
    },
    /// List the feed, most recent first.
    Feed,
    /// Re-render a finished video at the highest resolution.
    Upgrade { id: String },
    /// Submit a new job from an existing job's parameters.
    Regenerate { id: String },
    /// Delete a job and its media.
    Delete { id: String },
    /// Run diagnostic checks.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => vidra_config::load_and_validate_path(path),
        None => vidra_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            vidra_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.studio.log_level);

    let Some(command) = cli.command else {
        println!("vidra: use --help for available commands");
        return;
    };

    if let Err(e) = run(config, command).await {
        eprintln!("vidra: {e}");
        std::process::exit(1);
    }
}

async fn run(config: vidra_config::VidraConfig, command: Commands) -> Result<(), VidraError> {
    let app = App::start(config).await?;
    let interrupted = shutdown::install_signal_handler();

    let work = async {
        match command {
            Commands::Generate {
                prompt,
                mode,
                model,
                resolution,
                aspect_ratio,
                start_frame,
                references,
                character,
                preview,
            } => {
                let args = GenerateArgs {
                    prompt,
                    mode,
                    model,
                    resolution,
                    aspect_ratio,
                    start_frame,
                    references,
                    character,
                    preview,
                };
                commands::run_generate(&app, args).await
            }
            Commands::Feed => commands::run_feed(&app).await,
            Commands::Upgrade { id } => commands::run_upgrade(&app, &JobId(id)).await,
            Commands::Regenerate { id } => commands::run_regenerate(&app, &JobId(id)).await,
            Commands::Delete { id } => commands::run_delete(&app, &JobId(id)).await,
            Commands::Doctor { plain } => doctor::run_doctor(&app, plain).await,
        }
    };

    let result = tokio::select! {
        result = work => result,
        _ = interrupted.cancelled() => {
            eprintln!("vidra: interrupted; unfinished jobs stay in the feed as generating");
            Ok(())
        }
    };

    app.shutdown().await?;
    result
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vidra={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
