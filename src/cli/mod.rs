//! CLI Module
//!
//! Command-line interface for offline mixdowns.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// mixlane - timeline multi-track mixer
#[derive(Parser, Debug)]
#[command(name = "mixlane")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a project document to an audio file
    #[command(name = "render")]
    Render {
        /// Path to the project document
        project: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output codec
        #[arg(long, default_value = "wav")]
        codec: String,

        /// Render length in seconds (defaults to the project's length)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Print the header fields of a WAV file
    #[command(name = "inspect")]
    Inspect {
        /// Path to the WAV file
        path: PathBuf,
    },
}
