use thiserror::Error;

/// Reasons a file is refused at load time.
///
/// None of these are fatal to the process: the load attempt is abandoned
/// before any track data is exposed, and the player stays stopped.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The first four bytes are not `MThd`.
    #[error("Not a MIDI file (header tag {0:#010x})")]
    NotAMidiFile(u32),
    /// The header chunk length is not 6.
    #[error("Invalid header length {0}, expected 6")]
    InvalidHeaderLength(u32),
    /// Format 2 (sequentially independent) or an unknown format number.
    #[error("Unsupported MIDI format {0}")]
    UnsupportedFormat(u16),
    /// The division has its top bit set (SMPTE frames/ticks).
    #[error("SMPTE timing is not supported (division {0:#06x})")]
    UnsupportedTiming(u16),
    /// The header declares zero tracks.
    #[error("The header declares no tracks")]
    NoTracks,
    /// Missing file, truncated header or chunk header, or any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// True for structural violations, false for I/O failures.
    pub const fn is_structural(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}
