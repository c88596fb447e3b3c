use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The upper nibble of a channel voice status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum VoiceKind {
    /// `0x8n`
    NoteOff = 0x8,
    /// `0x9n`
    NoteOn = 0x9,
    /// `0xAn`
    PolyPressure = 0xA,
    /// `0xBn`
    ControlChange = 0xB,
    /// `0xCn`
    ProgramChange = 0xC,
    /// `0xDn`
    ChannelPressure = 0xD,
    /// `0xEn`
    PitchBend = 0xE,
}

#[doc = r#"
Meta event types the scheduler acts on.

Every other type (text, markers, key and time signatures, sequencer
specific data...) is skipped by its declared length.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MetaType {
    /// `FF 2F 00`
    EndOfTrack = 0x2F,
    /// `FF 51 03 tt tt tt`, microseconds per quarter note
    SetTempo = 0x51,
}

#[test]
fn meta_types_from_bytes() {
    use pretty_assertions::assert_eq;

    assert_eq!(MetaType::try_from(0x51).ok(), Some(MetaType::SetTempo));
    assert_eq!(MetaType::try_from(0x2F).ok(), Some(MetaType::EndOfTrack));
    assert!(MetaType::try_from(0x03).is_err());
    assert_eq!(u8::from(VoiceKind::PitchBend), 0xE);
}
