use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use super::{Clock, Control, DriftCorrector, PlaybackError, PlayerConfig, SystemClock};
use crate::{
    events::{PlaybackState, PlayerEvent, PlayerListener},
    file::{SequenceFile, TrackEvent},
    micros::DeciMicros,
    output::{MidiSink, NullSink, SharedSink, shared_sink, silence_all},
    tempo::Tempo,
};

/// How a playback session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every track reached End of Track
    Finished,
    /// A stop was requested
    Stopped,
}

#[doc = r#"
Plays one [`SequenceFile`] from tick zero to the end.

The loop dispatches every event due at the current tick, track by track in
file order, then advances the tick to the earliest pending event and sleeps
for the corresponding wall time minus any accumulated lateness (see
[`DriftCorrector`]). Pausing parks the loop without emitting anything; a stop
request is honoured at the next event or sleep boundary.

A scheduler is normally driven by a [`Player`](super::Player) on its own
thread, but [`Scheduler::run`] works on any thread:

```rust
# use smf_sequencer::prelude::*;
# use std::sync::Arc;
let bytes = [
    b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 100,
    b'M', b'T', b'r', b'k', 0, 0, 0, 8,
    0x00, 0x90, 0x3C, 0x64, 0x64, 0xFF, 0x2F, 0x00,
];
let file = SequenceFile::from_bytes(&bytes).unwrap();
let clock = VirtualClock::new();
let outcome = Scheduler::new(file, Arc::new(NoopListener))
    .with_clock(clock.clone())
    .run()
    .unwrap();
assert_eq!(outcome, Outcome::Finished);
// one quarter note at 120 BPM, 100 ticks per quarter
assert_eq!(clock.total_slept(), std::time::Duration::from_millis(500));
```
"#]
pub struct Scheduler<C: Clock = SystemClock> {
    file: SequenceFile,
    clock: C,
    control: Arc<Control>,
    listener: Arc<dyn PlayerListener>,
    sink: SharedSink,
    config: PlayerConfig,
    tempo: Tempo,
    tick_multiplier: DeciMicros,
    active_tracks: usize,
    drift: DriftCorrector,
    last_wall_time: Instant,
    pending_sleep: Duration,
}

impl Scheduler<SystemClock> {
    /// A scheduler on the system clock, with no output device and the
    /// default configuration.
    pub fn new(file: SequenceFile, listener: Arc<dyn PlayerListener>) -> Self {
        let config = PlayerConfig::default();
        let tempo = config.initial_tempo;
        let tick_multiplier = file.division().tick_multiplier(tempo);
        Self {
            file,
            clock: SystemClock,
            control: Arc::new(Control::new()),
            listener,
            sink: shared_sink(NullSink),
            config,
            tempo,
            tick_multiplier,
            active_tracks: 0,
            drift: DriftCorrector::new(),
            last_wall_time: Instant::now(),
            pending_sleep: Duration::ZERO,
        }
    }
}

impl<C: Clock> Scheduler<C> {
    /// Swap the time source.
    pub fn with_clock<D: Clock>(self, clock: D) -> Scheduler<D> {
        let last_wall_time = clock.now();
        Scheduler {
            file: self.file,
            clock,
            control: self.control,
            listener: self.listener,
            sink: self.sink,
            config: self.config,
            tempo: self.tempo,
            tick_multiplier: self.tick_multiplier,
            active_tracks: self.active_tracks,
            drift: self.drift,
            last_wall_time,
            pending_sleep: self.pending_sleep,
        }
    }

    /// Forward channel messages to `sink`.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Share pause and stop flags with somebody else.
    pub fn with_control(mut self, control: Arc<Control>) -> Self {
        self.control = control;
        self
    }

    /// Apply a configuration. Resets the tempo to the configured one.
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.set_tempo(config.initial_tempo);
        self.config = config;
        self
    }

    /// The pause and stop flags this scheduler obeys
    pub fn control(&self) -> &Arc<Control> {
        &self.control
    }

    /// The sequence being played
    pub fn file(&self) -> &SequenceFile {
        &self.file
    }

    /// Tempo currently in effect
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Wall time of one tick at the current tempo
    pub fn tick_multiplier(&self) -> DeciMicros {
        self.tick_multiplier
    }

    /// Plays the sequence to the end, or until stopped.
    ///
    /// Always finishes by silencing the sink (as configured), emitting
    /// [`PlaybackState::Stopped`] and unloading the sequence, whatever the
    /// outcome. [`PlayerEvent::Finished`] precedes that only when every track
    /// ended on its own.
    pub fn run(mut self) -> Result<Outcome, PlaybackError> {
        if !self.control.start() {
            self.shutdown();
            return Ok(Outcome::Stopped);
        }
        self.emit(PlayerEvent::StateChanged(PlaybackState::Playing));

        let result = self.play();
        match &result {
            Ok(Outcome::Finished) => {
                #[cfg(feature = "tracing")]
                tracing::info!(tick = self.file.current_tick(), "playback finished");
                self.emit(PlayerEvent::Finished);
            }
            Ok(Outcome::Stopped) => {
                #[cfg(feature = "tracing")]
                tracing::info!(tick = self.file.current_tick(), "playback stopped");
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("playback aborted: {err}");
                self.emit(PlayerEvent::PlaybackFailed {
                    message: err.to_string(),
                });
            }
        }

        self.shutdown();
        result
    }

    fn play(&mut self) -> Result<Outcome, PlaybackError> {
        self.file.prime();
        self.active_tracks = self.file.active_tracks();
        self.last_wall_time = self.clock.now();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            tracks = self.active_tracks,
            multiplier = self.tick_multiplier.get(),
            "starting playback"
        );

        loop {
            if self.control.is_cancelled() {
                return Ok(Outcome::Stopped);
            }
            if self.control.is_paused() {
                self.hold();
                continue;
            }
            if !self.pending_sleep.is_zero() {
                let pending = std::mem::take(&mut self.pending_sleep);
                self.pending_sleep = self.clock.sleep(pending, &self.control);
                continue;
            }

            let current = self.file.current_tick();
            for index in 0..self.file.track_count() {
                loop {
                    if self.control.is_paused() || self.control.is_cancelled() {
                        break;
                    }
                    let track = &self.file.tracks()[index];
                    if track.is_ended() || track.next_due_tick() > current {
                        break;
                    }
                    self.step(index)?;
                }
            }
            if self.control.is_paused() || self.control.is_cancelled() {
                continue;
            }

            if self.active_tracks == 0 {
                return Ok(Outcome::Finished);
            }
            let Some(next) = self.file.min_due_tick() else {
                return Ok(Outcome::Finished);
            };
            let delta = next.saturating_sub(current);
            self.file.set_current_tick(next);
            self.emit(PlayerEvent::Tick { current_tick: next });
            self.wait_ticks(delta);
        }
    }

    fn step(&mut self, index: usize) -> Result<(), PlaybackError> {
        let event = self
            .file
            .step_track(index)
            .map_err(|source| PlaybackError::CorruptTrackData {
                track: index,
                source,
            })?;

        match event {
            TrackEvent::Channel(message) => {
                self.sink.lock().send(message.packed());
                self.emit(PlayerEvent::Midi(message));
            }
            TrackEvent::Tempo(tempo) => self.set_tempo(tempo),
            TrackEvent::EndOfTrack => {
                self.active_tracks = self.active_tracks.saturating_sub(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(track = index, remaining = self.active_tracks, "end of track");
            }
            TrackEvent::Exhausted => {
                self.active_tracks = self.active_tracks.saturating_sub(1);
                #[cfg(feature = "tracing")]
                tracing::warn!(track = index, "track ran out of data without an End of Track");
            }
            TrackEvent::Skipped {
                status,
                meta_type,
                length,
            } => {
                #[cfg(feature = "tracing")]
                tracing::trace!(track = index, status, ?meta_type, length, "skipped event");
                #[cfg(not(feature = "tracing"))]
                let _ = (status, meta_type, length);
            }
        }
        Ok(())
    }

    fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
        self.tick_multiplier = self.file.division().tick_multiplier(tempo);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            tempo = tempo.micros_per_quarter_note(),
            multiplier = self.tick_multiplier.get(),
            "tempo change"
        );
    }

    /// Sleeps for `delta` ticks, corrected for accumulated lateness.
    fn wait_ticks(&mut self, delta: u32) {
        let now = self.clock.now();
        let elapsed = DeciMicros::from_duration(now.saturating_duration_since(self.last_wall_time));
        self.last_wall_time = now;

        let intended = self.tick_multiplier * delta;
        let sleep = self.drift.next_sleep(elapsed, intended);
        if sleep.is_positive() {
            self.pending_sleep = self.clock.sleep(sleep.to_duration(), &self.control);
        }
    }

    /// Parks while paused. Time spent here never counts as lateness.
    fn hold(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::info!(tick = self.file.current_tick(), "paused");
        if self.config.silence_on_pause {
            silence_all(&mut **self.sink.lock());
        }
        self.emit(PlayerEvent::StateChanged(PlaybackState::Paused));

        self.control.wait_while_paused();
        self.last_wall_time = self.clock.now();

        if !self.control.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::info!(tick = self.file.current_tick(), "resumed");
            self.emit(PlayerEvent::StateChanged(PlaybackState::Playing));
        }
    }

    fn shutdown(&mut self) {
        {
            let mut sink = self.sink.lock();
            if self.config.silence_on_stop {
                silence_all(&mut **sink);
            }
            if self.config.reset_sink_on_stop {
                sink.reset();
            }
        }
        self.control.finish();
        self.emit(PlayerEvent::StateChanged(PlaybackState::Stopped));
        self.file.unload();
    }

    fn emit(&self, event: PlayerEvent) {
        self.listener.on_event(&event);
    }
}

#[cfg(test)]
fn single_track(division: u16, body: &[u8]) -> SequenceFile {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&division.to_be_bytes());
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    SequenceFile::from_bytes(&bytes).unwrap()
}

#[test]
fn tempo_change_rescales_later_waits() {
    use pretty_assertions::assert_eq;

    // note at 0, tempo halves at tick 100, end of track at 200
    let body = [
        0x00, 0x90, 0x3C, 0x64, //
        0x64, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90, //
        0x64, 0xFF, 0x2F, 0x00,
    ];
    let clock = super::VirtualClock::new();
    let outcome = Scheduler::new(single_track(100, &body), Arc::new(crate::events::NoopListener))
        .with_clock(clock.clone())
        .run()
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(500), Duration::from_millis(250)]
    );
}

#[test]
fn corrupt_track_fails_and_still_stops() {
    use pretty_assertions::assert_eq;

    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    // data byte with no status
    let body = [0x00, 0x3C, 0x64];
    let result = Scheduler::new(single_track(96, &body), Arc::new(tx))
        .with_clock(super::VirtualClock::new())
        .run();

    assert!(matches!(
        result,
        Err(PlaybackError::CorruptTrackData { track: 0, .. })
    ));
    let events: Vec<PlayerEvent> = rx.try_iter().collect();
    assert_eq!(events.first(), Some(&PlayerEvent::StateChanged(PlaybackState::Playing)));
    assert!(matches!(events[1], PlayerEvent::PlaybackFailed { .. }));
    assert_eq!(events.last(), Some(&PlayerEvent::StateChanged(PlaybackState::Stopped)));
}

#[test]
fn configured_tempo_applies_from_the_start() {
    use pretty_assertions::assert_eq;

    let file = single_track(96, &[0x60, 0xFF, 0x2F, 0x00]);
    let scheduler = Scheduler::new(file, Arc::new(crate::events::NoopListener))
        .with_config(PlayerConfig::default().with_initial_tempo(Tempo::new(1_000_000)));
    assert_eq!(scheduler.tempo(), Tempo::new(1_000_000));
    assert_eq!(scheduler.tick_multiplier(), DeciMicros::new(104_166));
}

#[test]
fn stop_request_before_run_sends_nothing() {
    use pretty_assertions::assert_eq;

    let (tx, rx) = crossbeam_channel::unbounded::<u32>();
    let file = single_track(96, &[0x00, 0x90, 0x3C, 0x64, 0x00, 0xFF, 0x2F, 0x00]);
    let scheduler = Scheduler::new(file, Arc::new(crate::events::NoopListener))
        .with_clock(super::VirtualClock::new())
        .with_sink(shared_sink(tx))
        .with_config(
            PlayerConfig::default()
                .with_silence_on_stop(false)
                .with_reset_sink_on_stop(false),
        );
    scheduler.control().cancel();
    assert_eq!(scheduler.run().unwrap(), Outcome::Stopped);
    assert_eq!(rx.try_iter().count(), 0);
}
