//! MIDI export command implementation

use anyhow::{Context, Result};
use cadenza_core::{codec, midi};
use colored::Colorize;
use log::info;
use std::fs;
use std::process::ExitCode;

/// Run the export-midi command
///
/// # Arguments
/// * `input_path` - Path to the composition file
/// * `output_path` - Path of the `.mid` file to write
///
/// # Returns
/// Exit code: 0 on success
pub fn run(input_path: &str, output_path: &str) -> Result<ExitCode> {
    let music = codec::load_music(input_path)
        .with_context(|| format!("Failed to load composition: {}", input_path))?;

    let bytes = midi::encode_midi(&music).context("Failed to encode MIDI")?;
    fs::write(output_path, &bytes)
        .with_context(|| format!("Failed to write MIDI file: {}", output_path))?;
    info!("Wrote {} bytes to {}", bytes.len(), output_path);

    let note_count = music
        .tracks()
        .iter()
        .flat_map(|t| t.notes())
        .filter(|n| !n.is_silence())
        .count();
    println!(
        "{} {} ({} tracks, {} notes at {} ticks per beat)",
        "Wrote:".green().bold(),
        output_path,
        music.tracks().len(),
        note_count,
        midi::TICKS_PER_BEAT
    );

    Ok(ExitCode::SUCCESS)
}
