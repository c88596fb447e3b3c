use crate::tempo::Tempo;

/// Default name of the scheduler thread
pub const DEFAULT_THREAD_NAME: &str = "smf-scheduler";

#[doc = r#"
Knobs for a [`Player`](super::Player) session.

```rust
# use smf_sequencer::prelude::*;
let config = PlayerConfig::default()
    .with_silence_on_pause(false)
    .with_thread_name("jukebox");
assert!(config.silence_on_stop);
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlayerConfig {
    /// Tempo in effect until the first Set Tempo event
    pub initial_tempo: Tempo,
    /// Send note off for every key when playback pauses
    pub silence_on_pause: bool,
    /// Send note off for every key when playback ends
    pub silence_on_stop: bool,
    /// Call [`MidiSink::reset`](crate::output::MidiSink::reset) when playback ends
    pub reset_sink_on_stop: bool,
    /// Name given to the scheduler thread
    pub thread_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_tempo: Tempo::DEFAULT,
            silence_on_pause: true,
            silence_on_stop: true,
            reset_sink_on_stop: true,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl PlayerConfig {
    /// Set the starting tempo
    pub fn with_initial_tempo(mut self, tempo: Tempo) -> Self {
        self.initial_tempo = tempo;
        self
    }

    /// Toggle all-notes-off on pause
    pub fn with_silence_on_pause(mut self, silence: bool) -> Self {
        self.silence_on_pause = silence;
        self
    }

    /// Toggle all-notes-off on stop
    pub fn with_silence_on_stop(mut self, silence: bool) -> Self {
        self.silence_on_stop = silence;
        self
    }

    /// Toggle the sink reset on stop
    pub fn with_reset_sink_on_stop(mut self, reset: bool) -> Self {
        self.reset_sink_on_stop = reset;
        self
    }

    /// Name the scheduler thread
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
