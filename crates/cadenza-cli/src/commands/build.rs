//! Build command implementation
//!
//! Reads a JSON composition description and writes the binary composition file.

use anyhow::{Context, Result};
use cadenza_core::{codec, Music};
use colored::Colorize;
use log::info;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// Parses a JSON composition description.
///
/// The description is the serde form of [`Music`]: a `bpm` and a list of tracks,
/// each with a `synthesizer` and `notes`. Every value is validated.
pub fn parse_description(json: &str) -> Result<Music> {
    serde_json::from_str(json).context("Invalid composition description")
}

/// A parsed description together with its encoded form.
#[derive(Debug)]
pub struct Compiled {
    pub music: Music,
    pub bytes: Vec<u8>,
    pub hash: String,
}

/// Parses and encodes a JSON description.
pub fn compile(json: &str) -> Result<Compiled> {
    let music = parse_description(json)?;
    let bytes = codec::encode_music(&music).context("Failed to encode composition")?;
    let hash = codec::hash_bytes(&bytes);
    Ok(Compiled { music, bytes, hash })
}

/// Run the build command
///
/// # Arguments
/// * `description_path` - Path to the JSON description
/// * `output_path` - Path of the composition file to write
///
/// # Returns
/// Exit code: 0 on success
pub fn run(description_path: &str, output_path: &str) -> Result<ExitCode> {
    println!("{} {}", "Building:".cyan().bold(), description_path);

    let json = fs::read_to_string(description_path)
        .with_context(|| format!("Failed to read description: {}", description_path))?;
    let compiled = compile(&json)?;

    fs::write(Path::new(output_path), &compiled.bytes)
        .with_context(|| format!("Failed to write composition: {}", output_path))?;
    info!("Wrote {} bytes to {}", compiled.bytes.len(), output_path);

    let tracks = compiled.music.tracks();
    let note_count: usize = tracks.iter().map(|t| t.notes().len()).sum();
    println!(
        "{} {} ({} tracks, {} notes, {} bytes)",
        "Wrote:".green().bold(),
        output_path,
        tracks.len(),
        note_count,
        compiled.bytes.len()
    );
    println!("{} {}", "Hash:".dimmed(), &compiled.hash[..16]);

    Ok(ExitCode::SUCCESS)
}
