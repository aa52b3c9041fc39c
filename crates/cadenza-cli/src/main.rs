//! Cadenza CLI - Audio Analysis Tool
//!
//! Features:
//! - Tempo, beat, and onset estimation
//! - Spectral features (centroid, bandwidth, rolloff, contrast)
//! - MFCC and chroma matrices
//! - Source resolution with download and extraction

use clap::{Parser, Subcommand};

mod commands;
mod output;

/// Cadenza CLI - Audio analysis toolkit
#[derive(Parser)]
#[command(name = "cadenza-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Audio analysis from local files, URLs, and video links", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis operation over an audio source
    Analyze {
        /// File path, direct audio URL, or video page URL
        input: String,

        /// Operation to run (see `operations` for the list)
        #[arg(short, long, default_value = "duration")]
        operation: String,

        /// Frame advance in samples (default: 512)
        #[arg(long)]
        hop_length: Option<i64>,

        /// Number of MFCC coefficients (default: 13)
        #[arg(long)]
        n_mfcc: Option<i64>,

        /// Seconds to skip from the start
        #[arg(long)]
        offset: Option<f64>,

        /// Seconds to analyze from the offset
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Resolve a source to a local file without analyzing it
    Resolve {
        /// File path, direct audio URL, or video page URL
        input: String,
    },

    /// List the available analysis operations
    Operations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            operation,
            hop_length,
            n_mfcc,
            offset,
            duration,
        } => {
            commands::analyze(
                &input, &operation, hop_length, n_mfcc, offset, duration, &cli.format,
            )
            .await?;
        }
        Commands::Resolve { input } => {
            commands::resolve(&input, &cli.format).await?;
        }
        Commands::Operations => {
            commands::operations();
        }
    }

    Ok(())
}
