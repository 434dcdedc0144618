//! Render command implementation
//!
//! Composes a composition file and writes 16-bit PCM WAV, either one mixdown
//! or one file per track.

use anyhow::{Context, Result};
use cadenza_core::midi::midi_channel;
use cadenza_core::synth::{SampleBankCache, WavBankLoader};
use cadenza_core::{codec, Backends, Music, PcmBuffer, Synthesizer, FRAMERATE};
use colored::Colorize;
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// How per-track files are named after the output stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TrackSuffix {
    /// `song_0_chiptune.wav`
    #[default]
    IndexAndKind,
    /// `song_0.wav`
    Index,
    /// `song_0_ch9.wav`
    IndexAndChannel,
}

impl TrackSuffix {
    fn for_track(self, index: usize, synthesizer: &Synthesizer) -> String {
        match self {
            TrackSuffix::IndexAndKind => format!("{}_{}", index, synthesizer.kind()),
            TrackSuffix::Index => index.to_string(),
            TrackSuffix::IndexAndChannel => {
                format!("{}_ch{}", index, midi_channel(index, synthesizer))
            }
        }
    }
}

/// Output path for one track: `<stem>_<suffix>.<ext>` next to `output`.
pub fn track_path(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".to_string());
    output.with_file_name(format!("{}_{}.{}", stem, suffix, extension))
}

/// Outcome of writing one WAV file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub path: String,
    pub frames: usize,
    pub channels: u8,
    pub duration_seconds: f64,
    pub peak: u16,
    pub hash: String,
}

impl RenderReport {
    pub fn new(path: &Path, audio: &PcmBuffer) -> Self {
        Self {
            path: path.display().to_string(),
            frames: audio.frames(),
            channels: audio.channels(),
            duration_seconds: audio.duration_seconds(),
            peak: audio.peak(),
            hash: audio.content_hash(),
        }
    }
}

/// Writes a buffer as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, audio: &PcmBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: u16::from(audio.channels()),
        sample_rate: FRAMERATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &sample in audio.samples() {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;
    Ok(())
}

/// Sample-bank backends rooted at `sample_dir`, or next to the input file.
pub fn backends_for(input_path: &Path, sample_dir: Option<&str>) -> Backends {
    let root = match sample_dir {
        Some(dir) => PathBuf::from(dir),
        None => input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    debug!("Resolving sample banks against {}", root.display());
    let cache = SampleBankCache::new(Arc::new(WavBankLoader::with_root(root)));
    Backends::new().with_banks(Arc::new(cache))
}

/// Writes the mixdown, or one file per track when `per_track` is set.
pub fn render_files(
    music: &Music,
    output: &Path,
    per_track: Option<TrackSuffix>,
) -> Result<Vec<RenderReport>> {
    let Some(suffix) = per_track else {
        let audio = music.compose();
        write_wav(output, &audio)?;
        return Ok(vec![RenderReport::new(output, &audio)]);
    };

    let mut reports = Vec::with_capacity(music.tracks().len());
    let buffers = music.compose_tracks();
    for (index, (track, audio)) in music.tracks().iter().zip(&buffers).enumerate() {
        let path = track_path(output, &suffix.for_track(index, track.synthesizer()));
        write_wav(&path, audio)?;
        reports.push(RenderReport::new(&path, audio));
    }
    Ok(reports)
}

/// Run the render command
///
/// # Arguments
/// * `input_path` - Path to the composition file
/// * `output_path` - Path of the WAV file to write
/// * `sample_dir` - Directory SoundFont paths are resolved against
/// * `json_output` - Whether to print the report as JSON
/// * `per_track` - Write one file per track, named with this suffix
///
/// # Returns
/// Exit code: 0 on success
pub fn run(
    input_path: &str,
    output_path: &str,
    sample_dir: Option<&str>,
    json_output: bool,
    per_track: Option<TrackSuffix>,
) -> Result<ExitCode> {
    let start = Instant::now();
    let input = Path::new(input_path);

    let mut music = codec::load_music(input)
        .with_context(|| format!("Failed to load composition: {}", input_path))?;
    music.attach_backends(&backends_for(input, sample_dir));

    if !json_output {
        println!(
            "{} {} ({} tracks at {} bpm)",
            "Rendering:".cyan().bold(),
            input_path,
            music.tracks().len(),
            music.bpm()
        );
    }

    let reports = render_files(&music, Path::new(output_path), per_track)?;
    info!(
        "Rendered {} file(s) in {}ms",
        reports.len(),
        start.elapsed().as_millis()
    );

    if json_output {
        let json = match (per_track, reports.as_slice()) {
            (None, [report]) => serde_json::to_string_pretty(report),
            _ => serde_json::to_string_pretty(&reports),
        }
        .context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(ExitCode::SUCCESS);
    }

    for report in &reports {
        println!(
            "{} {} ({} frames, {} channel(s), {:.3}s)",
            "Wrote:".green().bold(),
            report.path,
            report.frames,
            report.channels,
            report.duration_seconds
        );
        println!("  {} {}", "Hash:".dimmed(), report.hash);
    }

    Ok(ExitCode::SUCCESS)
}
