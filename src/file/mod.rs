#![doc = r#"
Loading a Standard MIDI File into a [`SequenceFile`]

The loader validates the 14-byte header, then copies every track payload,
in file order, into one contiguous buffer. Tracks are addressed by plain
offsets into that buffer, so loading allocates once no matter how many
tracks the file has.

A failed load returns before anything is committed: no partially loaded
sequence is ever handed out.
"#]

mod error;
pub use error::*;

mod format;
pub use format::*;

mod header;
pub use header::*;

mod timing;
pub use timing::*;

mod track;
pub use track::*;

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::reader::{ReadResult, Reader};

/// `MTrk`
pub const TRACK_TAG: u32 = 0x4D54_726B;

#[doc = r#"
A loaded song: the validated header, the concatenated track payloads, and
per-track playback state.

Created at load time, mutated only by the
[`Scheduler`](crate::player::Scheduler) that owns it, and cleared with
[`SequenceFile::unload`] when playback ends.
"#]
#[derive(Debug, Clone)]
pub struct SequenceFile {
    header: SequenceHeader,
    data: Vec<u8>,
    offsets: Vec<usize>,
    tracks: Vec<Track>,
    current_tick: u32,
}

impl SequenceFile {
    /// Load a file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::open_with_progress(path, |_, _| {})
    }

    /// Load a file from disk, calling `on_track(index, declared_length)` as
    /// each track chunk is copied in.
    pub fn open_with_progress<P, F>(path: P, on_track: F) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
        F: FnMut(u16, u32),
    {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();
        Self::read(BufReader::new(file), file_size, on_track)
    }

    /// Parse an in-memory file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        Self::read(bytes, bytes.len() as u64, |_, _| {})
    }

    /// Parse a file from a stream of `file_size` bytes.
    ///
    /// The payload buffer is sized from `file_size` up front. A track chunk
    /// whose payload is cut short by the end of the stream keeps the bytes
    /// that were present; a missing chunk header is an I/O error.
    pub fn read<R, F>(mut reader: R, file_size: u64, mut on_track: F) -> Result<Self, LoadError>
    where
        R: Read,
        F: FnMut(u16, u32),
    {
        let header = SequenceHeader::read(&mut reader)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            format = ?header.format(),
            tracks = header.track_count(),
            division = header.division().ticks_per_quarter_note(),
            "read MIDI header"
        );

        let payload_size = usize::try_from(header.payload_size(file_size)).unwrap_or(usize::MAX);

        #[cfg(feature = "tracing")]
        tracing::debug!("allocating {payload_size} bytes for track data");

        let track_count = header.track_count();
        let mut data = Vec::with_capacity(payload_size);
        let mut offsets = Vec::with_capacity(track_count as usize);
        let mut tracks = Vec::with_capacity(track_count as usize);

        for index in 0..track_count {
            let tag = header::read_u32(&mut reader)?;
            let length = header::read_u32(&mut reader)?;

            if tag != TRACK_TAG {
                #[cfg(feature = "tracing")]
                tracing::trace!("track {index} has chunk tag {tag:#010x}, reading it as a track");
            }

            let start = data.len();
            let copied = reader
                .by_ref()
                .take(length as u64)
                .read_to_end(&mut data)?;

            if copied < length as usize {
                #[cfg(feature = "tracing")]
                tracing::warn!("track {index} declares {length} bytes but only {copied} are present");
            }

            offsets.push(start);
            tracks.push(Track::new(start, data.len()));
            on_track(index, length);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "track {} size: {length} bytes, total read: {}",
                index + 1,
                data.len()
            );
        }

        Ok(Self {
            header,
            data,
            offsets,
            tracks,
            current_tick: 0,
        })
    }

    /// The validated header
    pub const fn header(&self) -> &SequenceHeader {
        &self.header
    }

    /// The file format
    pub const fn format(&self) -> FormatType {
        self.header.format()
    }

    /// Ticks per quarter note
    pub const fn division(&self) -> Division {
        self.header.division()
    }

    /// Number of loaded tracks; zero once unloaded
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Logical playback position in ticks
    pub const fn current_tick(&self) -> u32 {
        self.current_tick
    }

    /// All track payloads, concatenated in file order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Per-track state, index-aligned with [`SequenceFile::offsets`]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Per-track read cursors into [`SequenceFile::data`]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Payload of one track.
    pub fn track_data(&self, index: usize) -> Option<&[u8]> {
        let track = self.tracks.get(index)?;
        self.data.get(track.start()..track.end())
    }

    /// Number of tracks that have not reached End of Track
    pub fn active_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| !t.is_ended()).count()
    }

    /// The earliest `next_due_tick` among tracks still playing.
    pub fn min_due_tick(&self) -> Option<u32> {
        self.tracks
            .iter()
            .filter(|t| !t.is_ended())
            .map(Track::next_due_tick)
            .min()
    }

    /// True once [`SequenceFile::unload`] ran
    pub fn is_unloaded(&self) -> bool {
        self.tracks.is_empty() && self.data.is_empty()
    }

    /// Clears every buffer and zeroes the playback position.
    pub fn unload(&mut self) {
        self.data = Vec::new();
        self.offsets = Vec::new();
        self.tracks = Vec::new();
        self.current_tick = 0;
    }

    /// Reads each track's leading delta-time into its `next_due_tick`.
    pub(crate) fn prime(&mut self) {
        for (track, offset) in self.tracks.iter_mut().zip(self.offsets.iter_mut()) {
            let mut reader = Reader::new(&self.data, *offset, track.end());
            track.advance(reader.read_delta_time());
            *offset = reader.buffer_position();
        }
    }

    /// Decodes one message of track `index` and reads the delta-time that
    /// follows it, unless the message ended the track.
    pub(crate) fn step_track(&mut self, index: usize) -> ReadResult<TrackEvent> {
        let track = &mut self.tracks[index];
        let mut reader = Reader::new(&self.data, self.offsets[index], track.end());

        let event = track.decode_next(&mut reader)?;
        if !track.is_ended() {
            track.advance(reader.read_delta_time());
        }
        self.offsets[index] = reader.buffer_position();
        Ok(event)
    }

    pub(crate) fn set_current_tick(&mut self, tick: u32) {
        self.current_tick = tick;
    }
}

#[cfg(test)]
fn two_track_file() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&2u16.to_be_bytes());
    bytes.extend_from_slice(&96u16.to_be_bytes());

    let first = [0x00, 0x90, 0x3C, 0x64, 0x60, 0x80, 0x3C, 0x00, 0x00, 0xFF, 0x2F, 0x00];
    let second = [0x30, 0xC0, 0x05, 0x00, 0xFF, 0x2F, 0x00];
    for track in [&first[..], &second[..]] {
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(track);
    }
    bytes
}

#[test]
fn tracks_share_one_buffer() {
    use pretty_assertions::assert_eq;

    let bytes = two_track_file();
    let mut progress = Vec::new();
    let file =
        SequenceFile::read(bytes.as_slice(), bytes.len() as u64, |i, len| progress.push((i, len)))
            .unwrap();

    assert_eq!(progress, vec![(0, 12), (1, 7)]);
    assert_eq!(file.track_count(), 2);
    assert_eq!(file.data().len(), 19);
    assert_eq!(file.offsets(), &[0, 12]);
    assert_eq!(file.track_data(1), Some(&[0x30, 0xC0, 0x05, 0x00, 0xFF, 0x2F, 0x00][..]));
    assert_eq!(file.current_tick(), 0);
    assert!(file.tracks().iter().all(|t| t.running_status() == 0 && !t.is_ended()));
}

#[test]
fn prime_reads_leading_deltas() {
    use pretty_assertions::assert_eq;

    let mut file = SequenceFile::from_bytes(&two_track_file()).unwrap();
    file.prime();
    assert_eq!(file.offsets(), &[1, 13]);
    assert_eq!(file.min_due_tick(), Some(0));
    assert_eq!(file.tracks()[1].next_due_tick(), 0x30);
}

#[test]
fn step_stays_inside_its_track() {
    use pretty_assertions::assert_eq;

    let mut file = SequenceFile::from_bytes(&two_track_file()).unwrap();
    file.prime();
    while !file.tracks()[0].is_ended() {
        file.step_track(0).unwrap();
    }
    assert_eq!(file.offsets()[0], file.tracks()[0].end());
    assert_eq!(file.tracks()[0].next_due_tick(), 0x60);
    assert_eq!(file.active_tracks(), 1);
}

#[test]
fn truncated_payload_keeps_present_bytes() {
    use pretty_assertions::assert_eq;

    let mut bytes = two_track_file();
    bytes.truncate(bytes.len() - 3);
    let file = SequenceFile::from_bytes(&bytes).unwrap();
    assert_eq!(file.tracks()[1].len(), 4);
}

#[test]
fn missing_chunk_header_is_an_io_error() {
    let bytes = two_track_file();
    let err = SequenceFile::from_bytes(&bytes[..30]).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

#[test]
fn unload_clears_everything() {
    let mut file = SequenceFile::from_bytes(&two_track_file()).unwrap();
    file.set_current_tick(40);
    file.unload();
    assert!(file.is_unloaded());
    assert_eq!(file.current_tick(), 0);
    assert_eq!(file.track_count(), 0);
    assert_eq!(file.min_due_tick(), None);
}
