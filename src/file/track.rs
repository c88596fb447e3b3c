use crate::{
    message::{MetaType, MidiMessage, StatusClass},
    reader::{ReadResult, Reader, ReaderError, ReaderErrorKind},
    tempo::Tempo,
};

/// Playback state of one track chunk.
///
/// The track's bytes are the `start..end` region of the shared buffer; the
/// read cursor itself is kept next to it in the
/// [`SequenceFile`](super::SequenceFile) offsets array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    start: usize,
    end: usize,
    running_status: u8,
    next_due_tick: u32,
    ended: bool,
}

/// What decoding one message out of a track produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    /// A channel message to forward.
    Channel(MidiMessage),
    /// A Set Tempo meta event.
    Tempo(Tempo),
    /// An End of Track meta event. The track is now ended.
    EndOfTrack,
    /// The track region ran out before an End of Track. The track is now ended.
    Exhausted,
    /// A sysex or meta event skipped by its declared length.
    Skipped {
        /// status byte of the event
        status: u8,
        /// meta type, `None` for sysex
        meta_type: Option<u8>,
        /// declared payload length
        length: u32,
    },
}

impl Track {
    pub(crate) const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            running_status: 0,
            next_due_tick: 0,
            ended: false,
        }
    }

    /// Offset of the first byte of this track in the shared buffer
    pub const fn start(&self) -> usize {
        self.start
    }
    /// Offset one past the last byte of this track
    pub const fn end(&self) -> usize {
        self.end
    }
    /// Payload length actually loaded
    pub const fn len(&self) -> usize {
        self.end - self.start
    }
    /// True if the chunk carried no payload
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
    /// The last explicit status byte seen
    pub const fn running_status(&self) -> u8 {
        self.running_status
    }
    /// Absolute tick of the next message
    pub const fn next_due_tick(&self) -> u32 {
        self.next_due_tick
    }
    /// True once End of Track has been consumed
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    pub(crate) fn advance(&mut self, delta: u32) {
        self.next_due_tick = self.next_due_tick.saturating_add(delta);
    }

    /// Marks the track ended, returning false if it already was.
    pub(crate) fn finish(&mut self) -> bool {
        let was_running = !self.ended;
        self.ended = true;
        was_running
    }

    /// Decodes exactly one message at the reader's position.
    ///
    /// Any length-derived advance is checked against the track bound before
    /// the cursor moves, so corrupt data surfaces as an error rather than a
    /// read into the next track.
    pub(crate) fn decode_next(&mut self, reader: &mut Reader<'_>) -> ReadResult<TrackEvent> {
        let Some(first) = reader.peek() else {
            self.finish();
            return Ok(TrackEvent::Exhausted);
        };
        if first & 0x80 != 0 {
            self.running_status = first;
            reader.read_u8()?;
        } else if self.running_status == 0 {
            return Err(ReaderError::new(
                reader.buffer_position(),
                ReaderErrorKind::MissingStatus(first),
            ));
        }

        let status = self.running_status;
        match StatusClass::of(status) {
            StatusClass::TwoDataBytes => {
                let [data1, data2] = reader.read_exact_size()?;
                Ok(TrackEvent::Channel(MidiMessage::new(status, data1, data2)))
            }
            StatusClass::OneDataByte => {
                let data1 = reader.read_u8()?;
                Ok(TrackEvent::Channel(MidiMessage::with_one_data_byte(
                    status, data1,
                )))
            }
            StatusClass::SystemExclusive => {
                let length = reader.read_vlq()?;
                reader.skip(length as usize)?;
                Ok(TrackEvent::Skipped {
                    status,
                    meta_type: None,
                    length,
                })
            }
            StatusClass::Meta => {
                let meta_type = reader.read_u8()?;
                let length = reader.read_vlq()?;
                let payload = reader.peek_slice(length as usize)?;

                let event = match MetaType::try_from(meta_type) {
                    Ok(MetaType::SetTempo) if payload.len() >= 3 => {
                        TrackEvent::Tempo(Tempo::from_be_bytes([payload[0], payload[1], payload[2]]))
                    }
                    Ok(MetaType::EndOfTrack) => {
                        self.finish();
                        TrackEvent::EndOfTrack
                    }
                    _ => TrackEvent::Skipped {
                        status,
                        meta_type: Some(meta_type),
                        length,
                    },
                };
                reader.skip(length as usize)?;
                Ok(event)
            }
        }
    }
}

#[cfg(test)]
fn decode_all(bytes: &[u8]) -> (Vec<TrackEvent>, Track) {
    let mut track = Track::new(0, bytes.len());
    let mut reader = Reader::from_byte_slice(bytes);
    let mut out = Vec::new();
    while !track.is_ended() {
        out.push(track.decode_next(&mut reader).unwrap());
        reader.read_delta_time();
    }
    (out, track)
}

#[test]
fn running_status_carries_over() {
    use pretty_assertions::assert_eq;

    // note on, then two more note ons relying on running status
    let bytes = [
        0x90, 0x3C, 0x64, 0x00, 0x40, 0x50, 0x00, 0x43, 0x00, 0x00, 0xFF, 0x2F, 0x00,
    ];
    let (events, track) = decode_all(&bytes);
    assert_eq!(
        events,
        vec![
            TrackEvent::Channel(MidiMessage::new(0x90, 0x3C, 0x64)),
            TrackEvent::Channel(MidiMessage::new(0x90, 0x40, 0x50)),
            TrackEvent::Channel(MidiMessage::new(0x90, 0x43, 0x00)),
            TrackEvent::EndOfTrack,
        ]
    );
    assert!(track.is_ended());
    assert_eq!(track.running_status(), 0xFF);
}

#[test]
fn one_data_byte_classes() {
    use pretty_assertions::assert_eq;

    let bytes = [0xC2, 0x05, 0x00, 0xD2, 0x40, 0x00, 0xFF, 0x2F, 0x00];
    let (events, _) = decode_all(&bytes);
    assert_eq!(
        &events[..2],
        &[
            TrackEvent::Channel(MidiMessage::with_one_data_byte(0xC2, 0x05)),
            TrackEvent::Channel(MidiMessage::with_one_data_byte(0xD2, 0x40)),
        ]
    );
}

#[test]
fn meta_and_sysex_are_skipped_by_length() {
    use pretty_assertions::assert_eq;

    let bytes = [
        0xFF, 0x03, 0x04, b'l', b'e', b'a', b'd', 0x00, // track name
        0xF0, 0x03, 0x43, 0x12, 0xF7, 0x00, // sysex, no type byte
        0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, 0x00, // tempo
        0xFF, 0x2F, 0x00,
    ];
    let (events, _) = decode_all(&bytes);
    assert_eq!(
        events,
        vec![
            TrackEvent::Skipped {
                status: 0xFF,
                meta_type: Some(0x03),
                length: 4
            },
            TrackEvent::Skipped {
                status: 0xF0,
                meta_type: None,
                length: 3
            },
            TrackEvent::Tempo(Tempo::new(500_000)),
            TrackEvent::EndOfTrack,
        ]
    );
}

#[test]
fn corrupt_meta_length_is_an_error() {
    let bytes = [0xFF, 0x01, 0x7F, b'x'];
    let mut track = Track::new(0, bytes.len());
    let mut reader = Reader::from_byte_slice(&bytes);
    let err = track.decode_next(&mut reader).unwrap_err();
    assert!(err.is_out_of_bounds());
    assert!(!track.is_ended());
}

#[test]
fn data_byte_without_status_is_an_error() {
    let bytes = [0x3C, 0x64];
    let mut track = Track::new(0, bytes.len());
    let mut reader = Reader::from_byte_slice(&bytes);
    let err = track.decode_next(&mut reader).unwrap_err();
    assert_eq!(err.error_kind(), &ReaderErrorKind::MissingStatus(0x3C));
}

#[test]
fn running_out_of_data_ends_the_track() {
    use pretty_assertions::assert_eq;

    let mut track = Track::new(0, 0);
    let mut reader = Reader::from_byte_slice(&[]);
    assert_eq!(track.decode_next(&mut reader), Ok(TrackEvent::Exhausted));
    assert!(track.is_ended());
    assert!(!track.finish());
}
