#![doc = r#"
Decoded MIDI messages

# Status classes
```text
|-------------|--------------------------------|------------|
| status      | messages                       | data bytes |
|-------------|--------------------------------|------------|
| 0x80..0xC0  | note off/on, poly pressure, CC | 2          |
| 0xC0..0xE0  | program change, ch. pressure   | 1          |
| 0xE0..0xF0  | pitch bend                     | 2          |
| 0xF0..      | sysex, meta and system family  | length     |
|-------------|--------------------------------|------------|
```
"#]
mod kind;
pub use kind::*;

/// A channel message as it leaves the scheduler: the status byte, the first
/// data byte and, for two-data-byte classes, the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiMessage {
    status: u8,
    data1: u8,
    data2: Option<u8>,
}

impl MidiMessage {
    /// A message carrying two data bytes.
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2: Some(data2),
        }
    }

    /// A message carrying a single data byte.
    pub const fn with_one_data_byte(status: u8, data1: u8) -> Self {
        Self {
            status,
            data1,
            data2: None,
        }
    }

    /// The status byte
    #[inline]
    pub const fn status(&self) -> u8 {
        self.status
    }

    /// The first data byte
    #[inline]
    pub const fn data1(&self) -> u8 {
        self.data1
    }

    /// The second data byte, absent for program change and channel pressure
    #[inline]
    pub const fn data2(&self) -> Option<u8> {
        self.data2
    }

    /// Channel number, 0-15
    #[inline]
    pub const fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// The voice message kind identified by the upper nibble of the status.
    pub fn kind(&self) -> Option<VoiceKind> {
        VoiceKind::try_from(self.status >> 4).ok()
    }

    /// Packs the message as `status | data1 << 8 | data2 << 16`, the word
    /// format native streaming outputs expect. A missing `data2` packs as zero.
    pub const fn packed(&self) -> u32 {
        let data2 = match self.data2 {
            Some(d) => d,
            None => 0,
        };
        self.status as u32 | (self.data1 as u32) << 8 | (data2 as u32) << 16
    }

    /// Inverse of [`MidiMessage::packed`]; the status class decides whether
    /// the third byte is kept.
    pub fn from_packed(word: u32) -> Self {
        let status = (word & 0xFF) as u8;
        let data1 = ((word >> 8) & 0xFF) as u8;
        let data2 = ((word >> 16) & 0xFF) as u8;
        match StatusClass::of(status) {
            StatusClass::OneDataByte => Self::with_one_data_byte(status, data1),
            _ => Self::new(status, data1, data2),
        }
    }

    /// Raw bytes as they would appear on the wire.
    pub fn to_bytes(&self) -> ([u8; 3], usize) {
        match self.data2 {
            Some(d2) => ([self.status, self.data1, d2], 3),
            None => ([self.status, self.data1, 0], 2),
        }
    }

    /// True for a note on with non-zero velocity.
    pub fn is_note_on(&self) -> bool {
        self.kind() == Some(VoiceKind::NoteOn) && self.data2.unwrap_or(0) != 0
    }

    /// True for a note off, or a note on with zero velocity.
    pub fn is_note_off(&self) -> bool {
        match self.kind() {
            Some(VoiceKind::NoteOff) => true,
            Some(VoiceKind::NoteOn) => self.data2.unwrap_or(0) == 0,
            _ => false,
        }
    }
}

/// How a status byte decides what follows it in a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Two data bytes follow.
    TwoDataBytes,
    /// One data byte follows.
    OneDataByte,
    /// Sysex (`0xF0`, `0xF7`): a length and an opaque payload follow.
    SystemExclusive,
    /// Meta (`0xFF`) and the remaining system family: a type byte, a length and a payload follow.
    Meta,
}

impl StatusClass {
    /// Classify a status byte.
    pub const fn of(status: u8) -> Self {
        match status {
            0xC0..=0xDF => Self::OneDataByte,
            0xF0 | 0xF7 => Self::SystemExclusive,
            0xF1..=0xFF => Self::Meta,
            _ => Self::TwoDataBytes,
        }
    }
}

#[test]
fn classify_status_bytes() {
    use pretty_assertions::assert_eq;

    assert_eq!(StatusClass::of(0x80), StatusClass::TwoDataBytes);
    assert_eq!(StatusClass::of(0xBF), StatusClass::TwoDataBytes);
    assert_eq!(StatusClass::of(0xC0), StatusClass::OneDataByte);
    assert_eq!(StatusClass::of(0xDF), StatusClass::OneDataByte);
    assert_eq!(StatusClass::of(0xE3), StatusClass::TwoDataBytes);
    assert_eq!(StatusClass::of(0xF0), StatusClass::SystemExclusive);
    assert_eq!(StatusClass::of(0xF7), StatusClass::SystemExclusive);
    assert_eq!(StatusClass::of(0xFF), StatusClass::Meta);
}

#[test]
fn packing() {
    use pretty_assertions::assert_eq;

    let on = MidiMessage::new(0x93, 60, 100);
    assert_eq!(on.packed(), 0x0064_3C93);
    assert_eq!(MidiMessage::from_packed(on.packed()), on);
    assert_eq!(on.channel(), 3);
    assert_eq!(on.kind(), Some(VoiceKind::NoteOn));

    let program = MidiMessage::with_one_data_byte(0xC1, 5);
    assert_eq!(program.packed(), 0x0000_05C1);
    assert_eq!(MidiMessage::from_packed(program.packed()), program);
    assert_eq!(program.to_bytes(), ([0xC1, 5, 0], 2));
}

#[test]
fn note_on_with_zero_velocity_is_a_note_off() {
    let msg = MidiMessage::new(0x90, 60, 0);
    assert!(msg.is_note_off());
    assert!(!msg.is_note_on());
    assert!(MidiMessage::new(0x80, 60, 64).is_note_off());
    assert!(!MidiMessage::new(0xB0, 64, 127).is_note_off());
}
