//! The fixed set of beat fractions a synthesizer can be set to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A fraction of a beat.
///
/// The discriminant order is the persisted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Beat {
    Eighth,
    Sixth,
    Fourth,
    Third,
    Half,
    #[default]
    One,
    OneAndHalf,
    Two,
    Three,
    Four,
    Five,
    Six,
}

impl Beat {
    /// Every beat, in index order.
    pub const ALL: [Beat; 12] = [
        Beat::Eighth,
        Beat::Sixth,
        Beat::Fourth,
        Beat::Third,
        Beat::Half,
        Beat::One,
        Beat::OneAndHalf,
        Beat::Two,
        Beat::Three,
        Beat::Four,
        Beat::Five,
        Beat::Six,
    ];

    /// Numerator and denominator of the reduced fraction.
    pub fn fraction(self) -> (u32, u32) {
        match self {
            Beat::Eighth => (1, 8),
            Beat::Sixth => (1, 6),
            Beat::Fourth => (1, 4),
            Beat::Third => (1, 3),
            Beat::Half => (1, 2),
            Beat::One => (1, 1),
            Beat::OneAndHalf => (3, 2),
            Beat::Two => (2, 1),
            Beat::Three => (3, 1),
            Beat::Four => (4, 1),
            Beat::Five => (5, 1),
            Beat::Six => (6, 1),
        }
    }

    /// The beat length as a float.
    pub fn value(self) -> f32 {
        let (num, den) = self.fraction();
        num as f32 / den as f32
    }

    /// Position in [`Beat::ALL`].
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Beat> {
        Beat::ALL.get(usize::from(index)).copied()
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fraction() {
            (num, 1) => write!(f, "{}", num),
            (num, den) => write!(f, "{}/{}", num, den),
        }
    }
}

impl FromStr for Beat {
    type Err = ModelError;

    /// Parse a fraction string such as `"1/8"`, `"3/2"` or `"4"`.
    ///
    /// # Examples
    /// ```
    /// use cadenza_core::beat::Beat;
    ///
    /// assert_eq!("1/8".parse::<Beat>().unwrap(), Beat::Eighth);
    /// assert_eq!("3/2".parse::<Beat>().unwrap(), Beat::OneAndHalf);
    /// assert_eq!("4".parse::<Beat>().unwrap(), Beat::Four);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Beat::ALL
            .iter()
            .copied()
            .find(|beat| beat.to_string() == trimmed)
            .ok_or_else(|| ModelError::UnknownBeat(trimmed.to_string()))
    }
}
