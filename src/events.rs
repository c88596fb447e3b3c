#![doc = r#"
Notifications emitted while loading and playing

Every notification is delivered through one [`PlayerListener`], in order,
one at a time. Consumers that keep their own counters (polyphony, held keys,
a tick display) derive them purely from this stream; they never look at the
scheduler's cursors.
"#]

use std::sync::Arc;

use crossbeam_channel::Sender;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::message::MidiMessage;

/// Sequence-level playback state.
///
/// `Stopped` is both the state before anything is loaded and the terminal
/// state of every session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PlaybackState {
    /// Nothing is playing
    #[default]
    Stopped,
    /// Playback is frozen in place
    Paused,
    /// The scheduler is dispatching events
    Playing,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayerEvent {
    /// A track chunk was copied into the sequence buffer.
    Loading {
        /// zero-based track index
        track_index: u16,
        /// declared payload length in bytes
        track_length: u32,
    },
    /// The file was rejected.
    LoadFailed {
        /// human readable reason
        message: String,
    },
    /// Every track was loaded; playback is about to start.
    Loaded {
        /// number of tracks in the file
        track_count: u16,
    },
    /// A decoded channel message.
    Midi(MidiMessage),
    /// The logical position advanced.
    Tick {
        /// absolute tick
        current_tick: u32,
    },
    /// The sequence changed state.
    StateChanged(PlaybackState),
    /// Every track reached End of Track. Distinct from an explicit stop.
    Finished,
    /// Track data turned out to be corrupt and playback was abandoned.
    PlaybackFailed {
        /// human readable reason
        message: String,
    },
}

#[doc = r#"
Receives every [`PlayerEvent`].

Called from whichever thread produced the event: the loading thread for
load notifications, the scheduler thread for everything else. Implementors
keep their own synchronization.

Closures, crossbeam senders, `Arc`s and pairs of listeners all implement
this trait:

```rust
# use smf_sequencer::prelude::*;
let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
let printer = |event: &PlayerEvent| {
    if let PlayerEvent::Tick { current_tick } = event {
        let _ = current_tick;
    }
};
let listener = (tx, printer);
listener.on_event(&PlayerEvent::Finished);
assert_eq!(rx.try_recv(), Ok(PlayerEvent::Finished));
```
"#]
pub trait PlayerListener: Send + Sync {
    /// Handle one notification.
    fn on_event(&self, event: &PlayerEvent);
}

impl<F> PlayerListener for F
where
    F: Fn(&PlayerEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlayerEvent) {
        self(event)
    }
}

impl PlayerListener for Sender<PlayerEvent> {
    fn on_event(&self, event: &PlayerEvent) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.send(event.clone());
    }
}

impl<A, B> PlayerListener for (A, B)
where
    A: PlayerListener,
    B: PlayerListener,
{
    fn on_event(&self, event: &PlayerEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
}

impl<T: PlayerListener + ?Sized> PlayerListener for Arc<T> {
    fn on_event(&self, event: &PlayerEvent) {
        (**self).on_event(event)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl PlayerListener for NoopListener {
    fn on_event(&self, _event: &PlayerEvent) {}
}

#[test]
fn state_round_trips_through_u8() {
    use pretty_assertions::assert_eq;

    for state in [
        PlaybackState::Stopped,
        PlaybackState::Paused,
        PlaybackState::Playing,
    ] {
        let raw: u8 = state.into();
        assert_eq!(PlaybackState::try_from(raw).ok(), Some(state));
    }
}

#[test]
fn pair_listener_sees_events_in_order() {
    use pretty_assertions::assert_eq;

    let (tx_a, rx_a) = crossbeam_channel::unbounded::<PlayerEvent>();
    let (tx_b, rx_b) = crossbeam_channel::unbounded::<PlayerEvent>();
    let listener = (tx_a, tx_b);
    listener.on_event(&PlayerEvent::Tick { current_tick: 4 });
    listener.on_event(&PlayerEvent::Finished);

    for rx in [rx_a, rx_b] {
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![PlayerEvent::Tick { current_tick: 4 }, PlayerEvent::Finished]
        );
    }
}
