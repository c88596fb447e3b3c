#![doc = r#"
The write side: forwarding decoded messages to a MIDI output

The scheduler only needs one capability from an output, "send this packed
message word", so swapping the device, or playing with no device at all,
never touches parsing or timing.
"#]

#[cfg(feature = "midir")]
mod native;
#[cfg(feature = "midir")]
pub use native::*;

use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

/// Number of MIDI channels
pub const CHANNELS: u8 = 16;
/// Number of keys per channel
pub const KEYS: u8 = 128;

/// A destination for raw MIDI messages.
pub trait MidiSink: Send {
    /// Send one message packed as `status | data1 << 8 | data2 << 16`.
    fn send(&mut self, packed: u32);

    /// Return the output to its power-on state. Called when playback stops.
    fn reset(&mut self) {}
}

/// A sink shared between the player and its scheduler thread.
pub type SharedSink = Arc<Mutex<Box<dyn MidiSink>>>;

/// Wrap a sink so it can be shared with the scheduler.
pub fn shared_sink<S: MidiSink + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(Box::new(sink)))
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MidiSink for NullSink {
    fn send(&mut self, _packed: u32) {}
}

impl MidiSink for Sender<u32> {
    fn send(&mut self, packed: u32) {
        let _ = Sender::send(self, packed);
    }
}

/// Sends a velocity-zero note off for every key on every channel.
pub fn silence_all<S: MidiSink + ?Sized>(sink: &mut S) {
    for channel in 0..CHANNELS {
        let status = 0x80 | channel as u32;
        for key in 0..KEYS {
            sink.send(status | (key as u32) << 8);
        }
    }
}

#[test]
fn silence_covers_every_channel_and_key() {
    use pretty_assertions::assert_eq;

    let (tx, rx) = crossbeam_channel::unbounded::<u32>();
    let mut sink = tx;
    silence_all(&mut sink);
    let words: Vec<u32> = rx.try_iter().collect();
    assert_eq!(words.len(), 16 * 128);
    assert_eq!(words[0], 0x0000_0080);
    assert_eq!(words[127], 0x0000_7F80);
    assert_eq!(words[128], 0x0000_0081);
    assert_eq!(*words.last().unwrap(), 0x0000_7F8F);
}
