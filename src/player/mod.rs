#![doc = r#"
Real-time playback

A [`Player`] owns at most one playback session at a time. Loading a file
stops whatever was playing, reads the new file on the caller's thread, then
hands it to a [`Scheduler`] running on a dedicated thread. Pause, resume and
stop requests travel through a shared [`Control`]; everything the scheduler
does is reported back through the [`PlayerListener`].
"#]

mod clock;
pub use clock::*;

mod config;
pub use config::*;

mod control;
pub use control::*;

mod error;
pub use error::*;

mod scheduler;
pub use scheduler::*;

use std::{
    path::Path,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crate::{
    events::{PlaybackState, PlayerEvent, PlayerListener},
    file::SequenceFile,
    output::{MidiSink, NullSink, SharedSink, shared_sink},
};

struct Session {
    control: Arc<Control>,
    handle: JoinHandle<Result<Outcome, PlaybackError>>,
}

impl Session {
    fn join(self) -> Result<Outcome, PlaybackError> {
        // stopping from a listener callback runs on the scheduler thread itself
        if self.handle.thread().id() == thread::current().id() {
            return Ok(Outcome::Stopped);
        }
        self.handle
            .join()
            .unwrap_or(Err(PlaybackError::SchedulerPanicked))
    }
}

#[doc = r#"
Loads Standard MIDI Files and plays them in real time.

```rust,no_run
# use smf_sequencer::prelude::*;
let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
let mut player = Player::new(tx);
player.load("song.mid").unwrap();
for event in rx {
    if event == PlayerEvent::Finished {
        break;
    }
}
```
"#]
pub struct Player {
    config: PlayerConfig,
    listener: Arc<dyn PlayerListener>,
    sink: SharedSink,
    session: Option<Session>,
}

impl Player {
    /// A stopped player reporting to `listener`, with no output device.
    pub fn new<L: PlayerListener + 'static>(listener: L) -> Self {
        Self {
            config: PlayerConfig::default(),
            listener: Arc::new(listener),
            sink: shared_sink(NullSink),
            session: None,
        }
    }

    /// Use `config` for the following sessions.
    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward channel messages to `sink`.
    pub fn with_sink<S: MidiSink + 'static>(mut self, sink: S) -> Self {
        self.set_sink(sink);
        self
    }

    /// Replace the output device. Takes effect immediately, even mid-song.
    pub fn set_sink<S: MidiSink + 'static>(&mut self, sink: S) {
        *self.sink.lock() = Box::new(sink);
    }

    /// The configuration for new sessions
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current playback state
    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map_or(PlaybackState::Stopped, |s| s.control.state())
    }

    /// True while a session is playing or paused
    pub fn is_running(&self) -> bool {
        self.state() != PlaybackState::Stopped
    }

    /// Stops any current playback, loads `path` and starts playing it.
    ///
    /// Emits [`PlayerEvent::Loading`] per track, then either
    /// [`PlayerEvent::Loaded`] or [`PlayerEvent::LoadFailed`]. A failed load
    /// leaves the player stopped.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PlayerError> {
        self.unload();

        let listener = Arc::clone(&self.listener);
        let loaded = SequenceFile::open_with_progress(path.as_ref(), |track_index, track_length| {
            listener.on_event(&PlayerEvent::Loading {
                track_index,
                track_length,
            })
        });

        let file = match loaded {
            Ok(file) => file,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("failed to load {}: {err}", path.as_ref().display());
                self.emit(PlayerEvent::LoadFailed {
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            "loaded {} ({} tracks)",
            path.as_ref().display(),
            file.track_count()
        );
        self.emit(PlayerEvent::Loaded {
            track_count: file.header().track_count(),
        });

        self.play(file)?;
        Ok(())
    }

    /// Plays an already loaded sequence on the system clock.
    pub fn play(&mut self, file: SequenceFile) -> Result<(), PlaybackError> {
        self.play_with_clock(file, SystemClock)
    }

    /// Plays an already loaded sequence on `clock`.
    pub fn play_with_clock<C: Clock + 'static>(
        &mut self,
        file: SequenceFile,
        clock: C,
    ) -> Result<(), PlaybackError> {
        self.unload();

        let control = Arc::new(Control::new());
        control.start();
        let scheduler = Scheduler::new(file, Arc::clone(&self.listener))
            .with_config(self.config.clone())
            .with_clock(clock)
            .with_sink(Arc::clone(&self.sink))
            .with_control(Arc::clone(&control));

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || scheduler.run())
            .map_err(PlaybackError::Spawn)?;

        self.session = Some(Session { control, handle });
        Ok(())
    }

    /// Freeze playback in place. Returns false unless playing.
    pub fn pause(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.control.pause())
    }

    /// Continue after [`Player::pause`]. Returns false unless paused.
    pub fn resume(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.control.resume())
    }

    /// Pause when playing, resume when paused.
    pub fn toggle_pause(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.control.toggle_pause())
    }

    /// Stops playback and waits for the scheduler thread to exit.
    ///
    /// Returns how the session ended, or `None` if nothing was playing.
    pub fn stop(&mut self) -> Option<Result<Outcome, PlaybackError>> {
        let session = self.session.take()?;
        session.control.cancel();
        Some(session.join())
    }

    /// Stops playback and discards the sequence. The scheduler releases its
    /// buffers as it exits.
    pub fn unload(&mut self) {
        if let Some(Err(err)) = self.stop() {
            #[cfg(feature = "tracing")]
            tracing::warn!("previous session ended with an error: {err}");
            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }

    /// Blocks until the current session ends on its own.
    pub fn wait(&mut self) -> Option<Result<Outcome, PlaybackError>> {
        self.session.take().map(Session::join)
    }

    fn emit(&self, event: PlayerEvent) {
        self.listener.on_event(&event);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.unload();
    }
}
