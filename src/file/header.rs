use std::io::Read;

use super::{Division, FormatType, LoadError};

/// `MThd`
pub const HEADER_TAG: u32 = 0x4D54_6864;
/// Fixed length of the header chunk body.
pub const HEADER_BODY_LENGTH: u32 = 6;
/// Tag, length and body of the header chunk.
pub const FILE_HEADER_SIZE: u64 = 14;
/// Tag and length of each track chunk.
pub const TRACK_HEADER_SIZE: u64 = 8;

#[doc = r#"
The validated 14-byte preamble of a Standard MIDI File

```text
| "MThd" (4) | length = 6 (4) | format (2) | tracks (2) | division (2) |
```
All fields are big-endian.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceHeader {
    format: FormatType,
    track_count: u16,
    division: Division,
}

impl SequenceHeader {
    /// Read and validate the header from the start of a stream.
    ///
    /// Checks run in file order, so a bad tag is reported before a bad
    /// length, and so on. A stream that ends early yields [`LoadError::Io`].
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, LoadError> {
        let tag = read_u32(reader)?;
        if tag != HEADER_TAG {
            return Err(LoadError::NotAMidiFile(tag));
        }

        let length = read_u32(reader)?;
        if length != HEADER_BODY_LENGTH {
            return Err(LoadError::InvalidHeaderLength(length));
        }

        let raw_format = read_u16(reader)?;
        let format = match FormatType::try_from(raw_format) {
            Ok(format) if format.is_playable() => format,
            _ => return Err(LoadError::UnsupportedFormat(raw_format)),
        };

        let track_count = read_u16(reader)?;
        let division = Division::from_raw(read_u16(reader)?)?;

        if track_count == 0 {
            return Err(LoadError::NoTracks);
        }

        Ok(Self {
            format,
            track_count,
            division,
        })
    }

    /// The file format
    pub const fn format(&self) -> FormatType {
        self.format
    }
    /// Number of track chunks that follow
    pub const fn track_count(&self) -> u16 {
        self.track_count
    }
    /// Ticks per quarter note
    pub const fn division(&self) -> Division {
        self.division
    }

    /// Bytes of track payload in a file of `file_size` bytes: everything but
    /// the file header and the per-track chunk headers.
    pub const fn payload_size(&self, file_size: u64) -> u64 {
        file_size.saturating_sub(self.track_count as u64 * TRACK_HEADER_SIZE + FILE_HEADER_SIZE)
    }
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub(crate) fn read_u16<R: Read>(reader: &mut R) -> std::io::Result<u16> {
    let mut buf = [0; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

#[cfg(test)]
fn header_bytes(tag: &[u8; 4], length: u32, format: u16, tracks: u16, division: u16) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&format.to_be_bytes());
    out.extend_from_slice(&tracks.to_be_bytes());
    out.extend_from_slice(&division.to_be_bytes());
    out
}

#[test]
fn reads_valid_header() {
    use pretty_assertions::assert_eq;

    let bytes = header_bytes(b"MThd", 6, 1, 3, 480);
    let header = SequenceHeader::read(&mut bytes.as_slice()).unwrap();
    assert_eq!(header.format(), FormatType::Simultaneous);
    assert_eq!(header.track_count(), 3);
    assert_eq!(header.division().ticks_per_quarter_note(), 480);
    assert_eq!(header.payload_size(14 + 3 * 8 + 100), 100);
    assert_eq!(header.payload_size(10), 0);
}

#[test]
fn rejects_in_file_order() {
    let bad_tag = header_bytes(b"RIFF", 7, 2, 1, 0x8000);
    assert!(matches!(
        SequenceHeader::read(&mut bad_tag.as_slice()),
        Err(LoadError::NotAMidiFile(0x5249_4646))
    ));

    let bad_len = header_bytes(b"MThd", 7, 2, 1, 0x8000);
    assert!(matches!(
        SequenceHeader::read(&mut bad_len.as_slice()),
        Err(LoadError::InvalidHeaderLength(7))
    ));

    let format_two = header_bytes(b"MThd", 6, 2, 1, 0x8000);
    assert!(matches!(
        SequenceHeader::read(&mut format_two.as_slice()),
        Err(LoadError::UnsupportedFormat(2))
    ));

    let smpte = header_bytes(b"MThd", 6, 0, 1, 0xE728);
    assert!(matches!(
        SequenceHeader::read(&mut smpte.as_slice()),
        Err(LoadError::UnsupportedTiming(0xE728))
    ));

    let empty = header_bytes(b"MThd", 6, 1, 0, 96);
    assert!(matches!(
        SequenceHeader::read(&mut empty.as_slice()),
        Err(LoadError::NoTracks)
    ));
}

#[test]
fn truncated_header_is_an_io_error() {
    let bytes = header_bytes(b"MThd", 6, 1, 3, 480);
    let err = SequenceHeader::read(&mut &bytes[..11]).unwrap_err();
    assert!(!err.is_structural());
}
