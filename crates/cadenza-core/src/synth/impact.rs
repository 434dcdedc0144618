//! Physically-inspired impact engine.
//!
//! A note is the collision of a primary and a secondary object. The pitch picks the
//! two sized materials, the volume picks their amplitudes and resonances, and the
//! note length sets the impact speed. Each object rings as a bank of exponentially
//! decaying modes excited by a short contact-noise burst.

use std::f64::consts::PI;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{NoteRenderer, Unavailable};
use crate::constants::{seconds_to_frames, FRAMERATE};
use crate::pcm::PcmBuffer;
use crate::rng::{create_rng, entropy_seed};

/// Impact speed ceiling; note durations wrap around it.
pub const MAX_SPEED: f64 = 5.0;

/// Mass (kg) of each size bucket, smallest first.
const MASSES: [f64; 6] = [0.123, 0.261, 1.305, 12.008, 81.325, 183.7];

/// Values the amplitude and resonance permutations draw from.
const AR_STEPS: [f64; 5] = [0.0, 0.2, 0.4, 0.6, 0.8];

/// Number of ordered 4-element selections from [`AR_STEPS`].
pub const AMP_RESONANCE_COUNT: usize = 120;

/// Unsized impact material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    Ceramic,
    Glass,
    Metal,
    WoodHard,
    WoodMedium,
    WoodSoft,
    Cardboard,
    Paper,
    PlasticHard,
    PlasticSoftFoam,
    Rubber,
    Fabric,
    Leather,
    Stone,
}

impl Material {
    pub const ALL: [Material; 14] = [
        Material::Ceramic,
        Material::Glass,
        Material::Metal,
        Material::WoodHard,
        Material::WoodMedium,
        Material::WoodSoft,
        Material::Cardboard,
        Material::Paper,
        Material::PlasticHard,
        Material::PlasticSoftFoam,
        Material::Rubber,
        Material::Fabric,
        Material::Leather,
        Material::Stone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Material::Ceramic => "ceramic",
            Material::Glass => "glass",
            Material::Metal => "metal",
            Material::WoodHard => "wood_hard",
            Material::WoodMedium => "wood_medium",
            Material::WoodSoft => "wood_soft",
            Material::Cardboard => "cardboard",
            Material::Paper => "paper",
            Material::PlasticHard => "plastic_hard",
            Material::PlasticSoftFoam => "plastic_soft_foam",
            Material::Rubber => "rubber",
            Material::Fabric => "fabric",
            Material::Leather => "leather",
            Material::Stone => "stone",
        }
    }

    /// Fundamental (Hz) at unit mass and the (ratio, amplitude, decay seconds) modes.
    fn modes(self) -> (f64, &'static [(f64, f64, f64)]) {
        match self {
            Material::Ceramic => (1400.0, &[(1.0, 1.0, 0.6), (2.32, 0.6, 0.4), (4.25, 0.3, 0.25)]),
            Material::Glass => (
                1800.0,
                &[(1.0, 1.0, 1.2), (2.76, 0.7, 0.9), (5.4, 0.4, 0.6), (8.93, 0.2, 0.4)],
            ),
            Material::Metal => (
                900.0,
                &[
                    (1.0, 1.0, 2.5),
                    (2.0, 0.8, 2.2),
                    (2.4, 0.6, 1.8),
                    (3.0, 0.5, 1.5),
                    (4.0, 0.4, 1.2),
                ],
            ),
            Material::WoodHard => (600.0, &[(1.0, 1.0, 0.3), (3.0, 0.5, 0.2), (6.0, 0.2, 0.1)]),
            Material::WoodMedium => (500.0, &[(1.0, 1.0, 0.25), (3.1, 0.4, 0.15), (6.2, 0.15, 0.08)]),
            Material::WoodSoft => (400.0, &[(1.0, 1.0, 0.18), (3.2, 0.3, 0.1)]),
            Material::Cardboard => (300.0, &[(1.0, 1.0, 0.08), (2.6, 0.4, 0.05)]),
            Material::Paper => (700.0, &[(1.0, 1.0, 0.05), (3.7, 0.6, 0.03)]),
            Material::PlasticHard => (800.0, &[(1.0, 1.0, 0.2), (2.9, 0.5, 0.12), (5.1, 0.2, 0.07)]),
            Material::PlasticSoftFoam => (250.0, &[(1.0, 1.0, 0.04)]),
            Material::Rubber => (200.0, &[(1.0, 1.0, 0.06), (2.2, 0.3, 0.04)]),
            Material::Fabric => (150.0, &[(1.0, 1.0, 0.03)]),
            Material::Leather => (220.0, &[(1.0, 1.0, 0.05), (2.5, 0.3, 0.03)]),
            Material::Stone => (1100.0, &[(1.0, 1.0, 0.35), (2.45, 0.6, 0.25), (4.9, 0.3, 0.15)]),
        }
    }
}

/// A material in one of the six size buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizedMaterial {
    pub material: Material,
    pub size: usize,
}

impl SizedMaterial {
    /// Number of sized materials.
    pub const COUNT: usize = Material::ALL.len() * MASSES.len();

    /// The `index`-th sized material, material-major.
    pub fn from_index(index: usize) -> Self {
        let index = index % Self::COUNT;
        Self {
            material: Material::ALL[index / MASSES.len()],
            size: index % MASSES.len(),
        }
    }

    pub fn mass(&self) -> f64 {
        MASSES[self.size]
    }

    /// Primary and secondary materials for a pitch.
    pub fn pair_for_pitch(pitch: u8) -> (Self, Self) {
        let n = usize::from(pitch) % Self::COUNT;
        (Self::from_index(n), Self::from_index((Self::COUNT - n) % Self::COUNT))
    }
}

/// The `index`-th ordered selection of 4 distinct values from [`AR_STEPS`], in
/// lexicographic order: `[primary amp, primary resonance, secondary amp, secondary
/// resonance]`.
pub fn amp_resonance(index: usize) -> [f64; 4] {
    let mut remaining = index % AMP_RESONANCE_COUNT;
    let mut pool: Vec<f64> = AR_STEPS.to_vec();
    let mut out = [0.0; 4];
    // Radix for position k is the count of permutations of the remaining slots.
    let mut radix = AMP_RESONANCE_COUNT;
    for (k, slot) in out.iter_mut().enumerate() {
        radix /= AR_STEPS.len() - k;
        let pick = remaining / radix;
        remaining %= radix;
        *slot = pool.remove(pick);
    }
    out
}

/// One colliding object.
#[derive(Debug, Clone, Copy)]
struct ImpactObject {
    material: SizedMaterial,
    amp: f64,
    resonance: f64,
}

impl ImpactObject {
    fn ring(&self, speed: f64, output: &mut [f64], rng: &mut Pcg32) {
        let (base, modes) = self.material.material.modes();
        let fundamental = base / self.material.mass().cbrt();
        let sample_rate = f64::from(FRAMERATE);
        let nyquist = sample_rate / 2.0;
        let dt = 1.0 / sample_rate;
        let strength = self.amp * (0.25 + 0.75 * speed / MAX_SPEED);

        for &(ratio, amplitude, decay) in modes {
            let freq = fundamental * ratio;
            if freq >= nyquist {
                continue;
            }
            let decay_rate = 3.0 / (decay * (0.2 + self.resonance));
            let phase = rng.gen::<f64>() * 2.0 * PI;
            for (i, sample) in output.iter_mut().enumerate() {
                let t = i as f64 * dt;
                let envelope = (-decay_rate * t).exp();
                if envelope < 1e-5 {
                    break;
                }
                *sample += (2.0 * PI * freq * t + phase).sin() * amplitude * strength * envelope;
            }
        }

        // Contact noise, about 3 ms.
        let burst = ((sample_rate * 0.003) as usize).min(output.len());
        for (i, sample) in output.iter_mut().take(burst).enumerate() {
            let env = 1.0 - i as f64 / burst as f64;
            *sample += (rng.gen::<f64>() * 2.0 - 1.0) * strength * 0.3 * env;
        }
    }
}

/// Impact engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImpactModel {
    #[serde(default)]
    seeded: bool,
    #[serde(default)]
    seed: u32,
}

impl ImpactModel {
    /// An engine that draws a fresh random seed for every note.
    pub fn random() -> Self {
        Self::default()
    }

    /// An engine that renders every note from the same seed.
    pub fn seeded(seed: u32) -> Self {
        Self { seeded: true, seed }
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn set_seeded(&mut self, seeded: bool) {
        self.seeded = seeded;
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
    }

    fn rng(&self) -> Pcg32 {
        if self.seeded {
            create_rng(self.seed)
        } else {
            create_rng(entropy_seed())
        }
    }
}

impl NoteRenderer for ImpactModel {
    fn channel_count(&self) -> u8 {
        1
    }

    fn is_deterministic(&self) -> bool {
        self.seeded
    }

    fn render_note(
        &self,
        pitch: u8,
        volume: u8,
        duration_seconds: f64,
    ) -> Result<PcmBuffer, Unavailable> {
        let frames = seconds_to_frames(duration_seconds);
        if frames == 0 {
            return Ok(PcmBuffer::empty(1));
        }

        let (primary, secondary) = SizedMaterial::pair_for_pitch(pitch);
        let ar = amp_resonance(usize::from(volume));
        let speed = duration_seconds % MAX_SPEED;
        let objects = [
            ImpactObject {
                material: primary,
                amp: ar[0] + 0.1,
                resonance: ar[1],
            },
            ImpactObject {
                material: secondary,
                amp: ar[2] + 0.1,
                resonance: ar[3],
            },
        ];

        let mut rng = self.rng();
        let mut output = vec![0.0; frames];
        for object in &objects {
            object.ring(speed, &mut output, &mut rng);
        }

        // Volume only selects the amp/resonance set; the level is not scaled.
        let peak = output.iter().fold(0.0_f64, |a, s| a.max(s.abs()));
        if peak > 1.0 {
            for s in &mut output {
                *s /= peak;
            }
        }

        Ok(PcmBuffer::from_normalized(&output))
    }

    fn describe(&self) -> String {
        if self.seeded {
            format!("Impact model (seed {})", self.seed)
        } else {
            "Impact model (random seed per note)".to_string()
        }
    }
}
