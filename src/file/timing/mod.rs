use super::LoadError;
use crate::{micros::DeciMicros, tempo::Tempo};

/// The header timing word, restricted to ticks per quarter note.
///
/// The leading bit selects the SMPTE frames/ticks encoding, which is not
/// supported, so a valid division is always below `0x8000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Division(u16);

impl Division {
    /// Validate the raw header word.
    pub fn from_raw(raw: u16) -> Result<Self, LoadError> {
        if raw & 0x8000 != 0 {
            return Err(LoadError::UnsupportedTiming(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the ticks per quarter note for the file.
    pub const fn ticks_per_quarter_note(&self) -> u16 {
        self.0
    }

    /// Tick multiplier at the given tempo.
    pub fn tick_multiplier(&self, tempo: Tempo) -> DeciMicros {
        tempo.tick_multiplier(self.0)
    }
}

#[test]
fn smpte_division_is_rejected() {
    assert!(matches!(
        Division::from_raw(0xE728),
        Err(LoadError::UnsupportedTiming(0xE728))
    ));
    assert_eq!(Division::from_raw(0x01E0).unwrap().ticks_per_quarter_note(), 480);
    assert_eq!(Division::from_raw(0x7FFF).unwrap().ticks_per_quarter_note(), 0x7FFF);
}
