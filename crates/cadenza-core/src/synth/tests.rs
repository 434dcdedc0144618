//! Tests for the shared synthesizer behavior.

use super::*;
use crate::constants::seconds_to_frames;
use pretty_assertions::assert_eq;

/// Reports one channel but renders two.
#[derive(Debug)]
struct WrongChannels;

impl SampleBank for WrongChannels {
    fn render(&self, request: &BankRequest) -> Result<PcmBuffer, Unavailable> {
        Ok(PcmBuffer::from_samples(1, vec![0; request.frames]))
    }
}

fn note(pitch: Option<u8>, duration: f32, volume: u8) -> Note {
    Note::new(pitch, 0.0, duration, volume).unwrap()
}

#[test]
fn test_default_settings() {
    let settings = SynthSettings::default();
    assert_eq!(settings.beat(), Beat::One);
    assert_eq!(settings.gain(), 127);
    assert!(settings.use_fixed_volume());
    assert_eq!(settings.fixed_volume(), 127);
}

#[test]
fn test_effective_volume_uses_note_volume_and_gain() {
    let settings = SynthSettings::new(Beat::One, 64, false, 127).unwrap();
    assert_eq!(settings.effective_volume(100), 50);
}

#[test]
fn test_effective_volume_uses_fixed_volume() {
    let settings = SynthSettings::new(Beat::One, 127, true, 90).unwrap();
    assert_eq!(settings.effective_volume(10), 90);
    let settings = SynthSettings::new(Beat::One, 0, true, 90).unwrap();
    assert_eq!(settings.effective_volume(10), 0);
}

#[test]
fn test_settings_validation() {
    assert!(SynthSettings::new(Beat::One, 128, true, 0).is_err());
    let mut settings = SynthSettings::default();
    assert_eq!(
        settings.set_fixed_volume(200),
        Err(ModelError::OutOfMidiRange {
            name: "fixed volume",
            value: 200
        })
    );
    settings.set_gain(10).unwrap();
    settings.set_beat(Beat::Half);
    settings.set_use_fixed_volume(false);
    assert_eq!(settings.gain(), 10);
    assert_eq!(settings.beat(), Beat::Half);
    assert!(!settings.use_fixed_volume());
}

#[test]
fn test_kind_registry() {
    for (i, kind) in SynthesizerKind::ALL.iter().enumerate() {
        assert_eq!(usize::from(kind.tag()), i);
        assert_eq!(SynthesizerKind::from_tag(kind.tag()), Some(*kind));
        let synth = Synthesizer::new(*kind);
        assert_eq!(synth.kind(), *kind);
        assert_eq!(synth.settings(), &SynthSettings::default());
    }
    assert_eq!(SynthesizerKind::from_tag(4), None);
    assert_eq!(SynthesizerKind::SoundFont.to_string(), "sound_font");
}

#[test]
fn test_channel_counts() {
    assert_eq!(Synthesizer::new(SynthesizerKind::Chiptune).channel_count(), 1);
    assert_eq!(Synthesizer::new(SynthesizerKind::ImpactModel).channel_count(), 1);
    assert_eq!(Synthesizer::new(SynthesizerKind::SoundFont).channel_count(), 2);
    assert_eq!(Synthesizer::new(SynthesizerKind::PluginHost).channel_count(), 2);
}

#[test]
fn test_silence_renders_nothing() {
    for kind in SynthesizerKind::ALL {
        let synth = Synthesizer::new(kind);
        let rest = note(None, 1.0, 0);
        assert_eq!(synth.render(&rest, 120), NoteAudio::Silent);
        let audio = synth.audio(&rest, 120);
        assert!(audio.is_empty());
        assert_eq!(audio.channels(), synth.channel_count());
    }
}

#[test]
fn test_audio_length_follows_bpm() {
    let synth = Synthesizer::new(SynthesizerKind::Chiptune);
    let one_beat = note(Some(60), 1.0, 100);
    assert_eq!(synth.audio(&one_beat, 120).frames(), seconds_to_frames(0.5));
    assert_eq!(synth.audio(&one_beat, 60).frames(), seconds_to_frames(1.0));
}

#[test]
fn test_unavailable_degrades_to_empty() {
    let synth = Synthesizer::new(SynthesizerKind::SoundFont);
    let n = note(Some(60), 1.0, 100);
    assert!(matches!(synth.render(&n, 120), NoteAudio::Unavailable(_)));
    let audio = synth.audio(&n, 120);
    assert!(audio.is_empty());
    assert_eq!(audio.channels(), 2);
}

#[test]
fn test_channel_mismatch_is_unavailable() {
    let engine = SoundFont::new("x.sf2", 0, 0, 0)
        .unwrap()
        .with_bank(Arc::new(WrongChannels));
    let synth = Synthesizer::with_engine(Engine::SoundFont(engine));
    let n = note(Some(60), 1.0, 100);
    match synth.render(&n, 120) {
        NoteAudio::Unavailable(reason) => assert!(reason.reason().contains("channels")),
        other => panic!("expected unavailable, got {:?}", other),
    }
}

#[test]
fn test_fixed_volume_reaches_engine() {
    let mut synth = Synthesizer::with_engine(Engine::Chiptune(Chiptune::new(Waveform::Pulse)));
    synth.settings_mut().set_fixed_volume(0).unwrap();
    let audio = synth.audio(&note(Some(60), 1.0, 127), 120);
    assert!(!audio.is_empty());
    assert_eq!(audio.peak(), 0);
}

#[test]
fn test_serde_json() {
    let json = r#"{
        "settings": {"beat": "half", "gain": 100, "use_fixed_volume": false, "fixed_volume": 0},
        "engine": {"type": "chiptune", "waveform": "saw"}
    }"#;
    let synth: Synthesizer = serde_json::from_str(json).unwrap();
    assert_eq!(synth.settings().beat(), Beat::Half);
    assert_eq!(synth.engine(), &Engine::Chiptune(Chiptune::new(Waveform::Saw)));

    let minimal: Synthesizer =
        serde_json::from_str(r#"{"engine": {"type": "impact_model", "seeded": true, "seed": 5}}"#)
            .unwrap();
    assert_eq!(minimal.settings(), &SynthSettings::default());
    assert_eq!(minimal.engine(), &Engine::ImpactModel(ImpactModel::seeded(5)));

    let back: Synthesizer = serde_json::from_str(&serde_json::to_string(&synth).unwrap()).unwrap();
    assert_eq!(back, synth);
}

#[test]
fn test_serde_rejects_invalid_settings() {
    let json = r#"{
        "settings": {"beat": "one", "gain": 200, "use_fixed_volume": false, "fixed_volume": 0},
        "engine": {"type": "chiptune"}
    }"#;
    assert!(serde_json::from_str::<Synthesizer>(json).is_err());
}

#[test]
fn test_attach_backends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..1000 {
        writer.write_sample(((i % 100) * 100) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let cache = Arc::new(SampleBankCache::new(Arc::new(WavBankLoader::with_root(dir.path()))));
    let backends = Backends::new().with_banks(cache);
    let mut synth = Synthesizer::with_engine(Engine::SoundFont(
        SoundFont::new("tone.wav", 0, 0, 0).unwrap(),
    ));
    synth.attach(&backends);
    let audio = synth.audio(&note(Some(60), 0.1, 127), 120);
    assert_eq!(audio.channels(), 2);
    assert_eq!(audio.frames(), seconds_to_frames(0.05));
    assert!(audio.peak() > 0);
}
