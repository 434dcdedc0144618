//! Inspect command implementation
//!
//! Prints a summary of a composition file.

use anyhow::{Context, Result};
use cadenza_core::{codec, Music, Track};
use colored::Colorize;
use serde::Serialize;
use std::process::ExitCode;

/// Summary of one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub index: usize,
    pub synthesizer: String,
    pub description: String,
    pub channels: u8,
    pub deterministic: bool,
    pub beat: String,
    pub gain: u8,
    pub use_fixed_volume: bool,
    pub fixed_volume: u8,
    pub notes: usize,
    pub silent_notes: usize,
    pub duration_beats: f32,
}

/// Summary of a whole composition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub bpm: u32,
    pub duration_beats: f32,
    pub duration_seconds: f64,
    pub tracks: Vec<TrackSummary>,
}

impl TrackSummary {
    fn new(index: usize, track: &Track) -> Self {
        let synth = track.synthesizer();
        let settings = synth.settings();
        Self {
            index,
            synthesizer: synth.kind().name().to_string(),
            description: synth.describe(),
            channels: synth.channel_count(),
            deterministic: synth.is_deterministic(),
            beat: settings.beat().to_string(),
            gain: settings.gain(),
            use_fixed_volume: settings.use_fixed_volume(),
            fixed_volume: settings.fixed_volume(),
            notes: track.notes().len(),
            silent_notes: track.notes().iter().filter(|n| n.is_silence()).count(),
            duration_beats: track.duration_beats(),
        }
    }
}

/// Builds the report for a composition.
pub fn summarize(music: &Music) -> InspectReport {
    InspectReport {
        bpm: music.bpm(),
        duration_beats: music.duration_beats(),
        duration_seconds: music.duration_seconds(),
        tracks: music
            .tracks()
            .iter()
            .enumerate()
            .map(|(i, track)| TrackSummary::new(i, track))
            .collect(),
    }
}

/// Run the inspect command
///
/// # Arguments
/// * `input_path` - Path to the composition file
/// * `json_output` - Whether to print the report as JSON
///
/// # Returns
/// Exit code: 0 on success
pub fn run(input_path: &str, json_output: bool) -> Result<ExitCode> {
    let music = codec::load_music(input_path)
        .with_context(|| format!("Failed to load composition: {}", input_path))?;
    let report = summarize(&music);

    if json_output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Composition:".cyan().bold(), input_path);
    println!("  {} {}", "BPM:".dimmed(), report.bpm);
    println!(
        "  {} {} beats ({:.3}s)",
        "Length:".dimmed(),
        report.duration_beats,
        report.duration_seconds
    );
    println!("  {} {}", "Tracks:".dimmed(), report.tracks.len());

    for track in &report.tracks {
        println!(
            "\n  {} {} {}",
            format!("[{}]", track.index).bold(),
            track.synthesizer.yellow(),
            track.description.dimmed()
        );
        let volume = if track.use_fixed_volume {
            format!("fixed {}", track.fixed_volume)
        } else {
            "per note".to_string()
        };
        println!(
            "      beat {}, gain {}, volume {}, {} channel(s){}",
            track.beat,
            track.gain,
            volume,
            track.channels,
            if track.deterministic { "" } else { ", non-deterministic" }
        );
        println!(
            "      {} notes ({} silent), {} beats",
            track.notes, track.silent_notes, track.duration_beats
        );
    }

    Ok(ExitCode::SUCCESS)
}
