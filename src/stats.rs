#![doc = r#"
Note bookkeeping for displays

[`NoteStats`] is a [`PlayerListener`] that folds the event stream into the
numbers a player front-end usually shows: how many notes are sounding, the
peak of that, how many notes were struck, which keys are down, and where
playback is.

```rust
# use smf_sequencer::prelude::*;
let stats = NoteStats::new();
stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x91, 60, 100)));
stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x91, 64, 100)));
stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x81, 60, 0)));

let snapshot = stats.snapshot();
assert_eq!(snapshot.polyphony, 1);
assert_eq!(snapshot.max_polyphony, 2);
assert_eq!(snapshot.note_count, 2);
assert!(snapshot.is_held(1, 64));
```
"#]

use parking_lot::Mutex;

use crate::{
    events::{PlaybackState, PlayerEvent, PlayerListener},
    message::MidiMessage,
    output::{CHANNELS, KEYS},
};

/// A copy of the counters at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSnapshot {
    /// Notes currently sounding
    pub polyphony: u32,
    /// Highest polyphony seen this session
    pub max_polyphony: u32,
    /// Note ons with a non-zero velocity this session
    pub note_count: u64,
    /// Last tick reported
    pub current_tick: u32,
    /// Per key, `channel << 1 | 1` of the channel that last struck it, or
    /// zero when released
    pub keyboard: [u8; KEYS as usize],
    /// Per channel, per key: held or not
    pub channel_keys: [[bool; KEYS as usize]; CHANNELS as usize],
}

impl NoteSnapshot {
    fn new() -> Self {
        Self {
            polyphony: 0,
            max_polyphony: 0,
            note_count: 0,
            current_tick: 0,
            keyboard: [0; KEYS as usize],
            channel_keys: [[false; KEYS as usize]; CHANNELS as usize],
        }
    }

    /// True if `key` is down on `channel`
    pub fn is_held(&self, channel: u8, key: u8) -> bool {
        self.channel_keys
            .get(channel as usize)
            .and_then(|keys| keys.get(key as usize))
            .copied()
            .unwrap_or(false)
    }

    /// The channel that last struck `key`, if the key is down
    pub fn keyboard_channel(&self, key: u8) -> Option<u8> {
        match self.keyboard.get(key as usize) {
            Some(&slot) if slot != 0 => Some(slot >> 1),
            _ => None,
        }
    }

    fn note_on(&mut self, channel: usize, key: usize) {
        self.polyphony += 1;
        self.note_count += 1;
        self.max_polyphony = self.max_polyphony.max(self.polyphony);
        self.keyboard[key] = (channel as u8) << 1 | 1;
        self.channel_keys[channel][key] = true;
    }

    fn note_off(&mut self, channel: usize, key: usize) {
        self.polyphony = self.polyphony.saturating_sub(1);
        self.keyboard[key] = 0;
        self.channel_keys[channel][key] = false;
    }

    fn apply(&mut self, message: &MidiMessage) {
        let channel = message.channel() as usize;
        let key = (message.data1() & 0x7F) as usize;
        if message.is_note_off() {
            self.note_off(channel, key);
        } else if message.is_note_on() {
            self.note_on(channel, key);
        }
    }
}

/// Thread-safe note counters fed by [`PlayerEvent`]s.
#[derive(Debug)]
pub struct NoteStats {
    inner: Mutex<NoteSnapshot>,
}

impl Default for NoteStats {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStats {
    /// Everything zeroed
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(NoteSnapshot::new()),
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> NoteSnapshot {
        self.inner.lock().clone()
    }

    /// Zero everything.
    pub fn reset(&self) {
        *self.inner.lock() = NoteSnapshot::new();
    }
}

impl PlayerListener for NoteStats {
    fn on_event(&self, event: &PlayerEvent) {
        match event {
            PlayerEvent::Midi(message) => self.inner.lock().apply(message),
            PlayerEvent::Tick { current_tick } => self.inner.lock().current_tick = *current_tick,
            PlayerEvent::StateChanged(PlaybackState::Stopped) => self.reset(),
            _ => {}
        }
    }
}

#[test]
fn velocity_zero_note_on_releases() {
    use pretty_assertions::assert_eq;

    let stats = NoteStats::new();
    stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x90, 60, 90)));
    stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x90, 60, 0)));
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.polyphony, 0);
    assert_eq!(snapshot.note_count, 1);
    assert_eq!(snapshot.keyboard_channel(60), None);
    assert!(!snapshot.is_held(0, 60));
}

#[test]
fn stray_note_off_does_not_underflow() {
    use pretty_assertions::assert_eq;

    let stats = NoteStats::new();
    stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x85, 10, 0)));
    assert_eq!(stats.snapshot().polyphony, 0);
}

#[test]
fn keyboard_tracks_the_striking_channel() {
    use pretty_assertions::assert_eq;

    let stats = NoteStats::new();
    stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x99, 36, 127)));
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.keyboard[36], 9 << 1 | 1);
    assert_eq!(snapshot.keyboard_channel(36), Some(9));
}

#[test]
fn stop_resets_everything() {
    use pretty_assertions::assert_eq;

    let stats = NoteStats::new();
    stats.on_event(&PlayerEvent::Midi(MidiMessage::new(0x90, 60, 90)));
    stats.on_event(&PlayerEvent::Tick { current_tick: 480 });
    assert_eq!(stats.snapshot().current_tick, 480);

    stats.on_event(&PlayerEvent::StateChanged(PlaybackState::Paused));
    assert_eq!(stats.snapshot().polyphony, 1);

    stats.on_event(&PlayerEvent::StateChanged(PlaybackState::Stopped));
    assert_eq!(stats.snapshot(), NoteSnapshot::new());
}
