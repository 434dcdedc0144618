//! Cadenza CLI - Command-line interface for step-sequenced compositions
//!
//! This binary builds composition files from JSON descriptions, inspects
//! them, renders them to WAV and exports them as MIDI.

use clap::{ArgAction, Parser, Subcommand};
use std::process::ExitCode;

use cadenza_cli::commands::render::TrackSuffix;
use cadenza_cli::{commands, logging};

/// Cadenza - Step-sequencer composer
#[derive(Parser)]
#[command(name = "cadenza")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a composition file from a JSON description
    Build {
        /// Path to the JSON description
        #[arg(short, long)]
        description: String,

        /// Path of the composition file to write
        #[arg(short, long)]
        output: String,
    },

    /// Print a summary of a composition file
    Inspect {
        /// Path to the composition file
        #[arg(short, long)]
        input: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Render a composition file to a 16-bit WAV file
    Render {
        /// Path to the composition file
        #[arg(short, long)]
        input: String,

        /// Path of the WAV file to write
        #[arg(short, long)]
        output: String,

        /// Directory SoundFont paths are resolved against (default: next to the input)
        #[arg(long)]
        sample_dir: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,

        /// Write one WAV file per track instead of the mixdown
        #[arg(long)]
        per_track: bool,

        /// File name suffix for per-track files
        #[arg(long, value_enum, default_value_t = TrackSuffix::IndexAndKind)]
        suffix: TrackSuffix,
    },

    /// Export a composition file as a standard MIDI file
    ExportMidi {
        /// Path to the composition file
        #[arg(short, long)]
        input: String,

        /// Path of the .mid file to write
        #[arg(short, long)]
        output: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: {}", colored::Colorize::yellow("warning"), e);
    }

    let result = match cli.command {
        Commands::Build {
            description,
            output,
        } => commands::build::run(&description, &output),
        Commands::Inspect { input, json } => commands::inspect::run(&input, json),
        Commands::Render {
            input,
            output,
            sample_dir,
            json,
            per_track,
            suffix,
        } => commands::render::run(
            &input,
            &output,
            sample_dir.as_deref(),
            json,
            per_track.then_some(suffix),
        ),
        Commands::ExportMidi { input, output } => commands::export_midi::run(&input, &output),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
