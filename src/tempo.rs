use crate::micros::DeciMicros;

#[doc = r#"
Microseconds per quarter note.

Standard MIDI Files start at 500 000 µs per quarter note (120 BPM) until a
Set Tempo meta event says otherwise.

# Example
```rust
# use smf_sequencer::prelude::*;
let tempo = Tempo::from_be_bytes([0x07, 0xA1, 0x20]);
assert_eq!(tempo.micros_per_quarter_note(), 500_000);
assert_eq!(tempo.bpm(), 120.);
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo(u32);

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tempo {
    /// 120 BPM
    pub const DEFAULT: Self = Self(500_000);

    /// Create a tempo from microseconds per quarter note.
    pub const fn new(micros_per_quarter_note: u32) -> Self {
        Self(micros_per_quarter_note)
    }

    /// Read the 24-bit big-endian payload of a Set Tempo event.
    pub const fn from_be_bytes(bytes: [u8; 3]) -> Self {
        Self((bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32)
    }

    /// Microseconds per quarter note
    pub const fn micros_per_quarter_note(&self) -> u32 {
        self.0
    }

    /// Beats per minute. Zero for a zero tempo.
    pub fn bpm(&self) -> f64 {
        if self.0 == 0 {
            return 0.;
        }
        60_000_000. / self.0 as f64
    }

    /// Wall time of one tick: `max(tempo * 10 / division, 1)` tenths of a microsecond.
    ///
    /// A zero division is treated as one tick per quarter note.
    pub fn tick_multiplier(&self, division: u16) -> DeciMicros {
        let division = division.max(1) as i64;
        let scaled = self.0 as i64 * 10 / division;
        DeciMicros::new(scaled.max(1))
    }
}

#[test]
fn default_multiplier_matches_division() {
    use pretty_assertions::assert_eq;

    for division in [1u16, 24, 96, 120, 384, 480, 960, 0x7FFF] {
        let expected = (500_000i64 * 10 / division as i64).max(1);
        assert_eq!(
            Tempo::DEFAULT.tick_multiplier(division),
            DeciMicros::new(expected)
        );
    }
}

#[test]
fn multiplier_is_never_zero() {
    use pretty_assertions::assert_eq;

    assert_eq!(Tempo::new(0).tick_multiplier(480), DeciMicros::ONE);
    assert_eq!(Tempo::new(1).tick_multiplier(0x7FFF), DeciMicros::ONE);
    assert_eq!(Tempo::new(1000).tick_multiplier(0), DeciMicros::new(10_000));
}

#[test]
fn tempo_bytes() {
    use pretty_assertions::assert_eq;

    assert_eq!(Tempo::from_be_bytes([0x03, 0xD0, 0x90]), Tempo::new(250_000));
    assert_eq!(Tempo::new(250_000).bpm(), 240.);
}
