#![allow(dead_code)]

use smf_sequencer::reader::write_vlq;

/// Builds a Standard MIDI File byte by byte.
pub struct SmfBuilder {
    format: u16,
    division: u16,
    tracks: Vec<Vec<u8>>,
}

impl SmfBuilder {
    pub fn new(format: u16, division: u16) -> Self {
        Self {
            format,
            division,
            tracks: Vec::new(),
        }
    }

    pub fn track(mut self, track: TrackBuilder) -> Self {
        self.tracks.push(track.bytes);
        self
    }

    pub fn raw_track(mut self, bytes: &[u8]) -> Self {
        self.tracks.push(bytes.to_vec());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"MThd");
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&self.format.to_be_bytes());
        bytes.extend_from_slice(&(self.tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&self.division.to_be_bytes());
        for track in &self.tracks {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }
}

/// Builds one track body. Every event takes the delta-time preceding it.
#[derive(Default)]
pub struct TrackBuilder {
    bytes: Vec<u8>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, delta: u32, event: &[u8]) -> Self {
        write_vlq(delta, &mut self.bytes);
        self.bytes.extend_from_slice(event);
        self
    }

    pub fn note_on(self, delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        self.event(delta, &[0x90 | channel, key, velocity])
    }

    pub fn note_off(self, delta: u32, channel: u8, key: u8) -> Self {
        self.event(delta, &[0x80 | channel, key, 0])
    }

    pub fn program(self, delta: u32, channel: u8, program: u8) -> Self {
        self.event(delta, &[0xC0 | channel, program])
    }

    pub fn tempo(self, delta: u32, micros_per_quarter_note: u32) -> Self {
        let [_, a, b, c] = micros_per_quarter_note.to_be_bytes();
        self.event(delta, &[0xFF, 0x51, 0x03, a, b, c])
    }

    pub fn text(self, delta: u32, text: &str) -> Self {
        let mut event = vec![0xFF, 0x01];
        write_vlq(text.len() as u32, &mut event);
        event.extend_from_slice(text.as_bytes());
        self.event(delta, &event)
    }

    pub fn end(self, delta: u32) -> Self {
        self.event(delta, &[0xFF, 0x2F, 0x00])
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
