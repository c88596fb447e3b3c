#![warn(missing_docs)]
#![doc = r#"
# smf_sequencer

Load Standard MIDI Files and play them back in real time.

A file is validated and its track chunks copied into one contiguous buffer
([`SequenceFile`](file::SequenceFile)). A [`Scheduler`](player::Scheduler)
then walks all tracks together, tick by tick, forwarding channel messages
to a [`MidiSink`](output::MidiSink) and reporting progress to a
[`PlayerListener`](events::PlayerListener). Sleeps between ticks are derived
from the current tempo and corrected for accumulated lateness, so long songs
stay on time.

Formats 0 and 1 with a ticks-per-quarter-note division are supported.

```rust,no_run
use smf_sequencer::prelude::*;

let stats = std::sync::Arc::new(NoteStats::new());
let mut player = Player::new(std::sync::Arc::clone(&stats));
player.load("song.mid").unwrap();
player.wait();
println!("{} notes played", stats.snapshot().note_count);
```

## Features
- `tracing` (default): log through the `tracing` crate
- `midir`: a [`MidirSink`](output::MidirSink) writing to a native MIDI output port
- `serde`: `Serialize`/`Deserialize` for events, configuration and value types
"#]

extern crate alloc;

pub mod events;
pub mod file;
pub mod message;
pub mod micros;
pub mod output;
pub mod player;
pub mod reader;
pub mod stats;
pub mod tempo;

#[doc = r#"
Common re-exports
"#]
pub mod prelude {
    pub use crate::{
        events::*,
        file::*,
        message::*,
        micros::*,
        output::*,
        player::*,
        reader::{ReadResult, Reader, ReaderError, ReaderErrorKind},
        stats::*,
        tempo::*,
    };
}
