use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::Control;
use crate::micros::DeciMicros;

/// Where the scheduler gets wall time from, and how it waits.
pub trait Clock: Send {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Wait for `duration`, returning whatever part of it was cut short by a
    /// pause or stop request on `control`.
    fn sleep(&mut self, duration: Duration, control: &Control) -> Duration;
}

/// The monotonic system clock. Sleeps can be interrupted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration, control: &Control) -> Duration {
        control.sleep(duration)
    }
}

#[derive(Debug)]
struct VirtualState {
    origin: Instant,
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

#[doc = r#"
A clock that only moves when told to.

Sleeping advances it by exactly the requested amount and records the
request, so a whole song can be played in no time and the scheduler's
timing decisions inspected afterwards. Clones share the same time line.

```rust
# use smf_sequencer::prelude::*;
# use std::time::Duration;
let clock = VirtualClock::new();
let before = clock.now();
clock.advance(Duration::from_millis(3));
assert_eq!(clock.now() - before, Duration::from_millis(3));
```
"#]
#[derive(Debug, Clone)]
pub struct VirtualClock {
    state: Arc<Mutex<VirtualState>>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    /// A clock starting at the current instant
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.state.lock().elapsed += by;
    }

    /// Total time passed since creation
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Sum of every sleep requested so far
    pub fn total_slept(&self) -> Duration {
        self.state.lock().sleeps.iter().sum()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        let state = self.state.lock();
        state.origin + state.elapsed
    }

    fn sleep(&mut self, duration: Duration, _control: &Control) -> Duration {
        let mut state = self.state.lock();
        state.elapsed += duration;
        state.sleeps.push(duration);
        Duration::ZERO
    }
}

#[doc = r#"
Keeps long-run playback locked to the song's intended timeline.

Each wait compares how long the previous step actually took with how long it
was meant to take. The differences accumulate, and while the running total
is positive (playback is late) it is taken off the next sleep. Lateness is
never paid back by sleeping longer, and a sleep never goes below zero.

```rust
# use smf_sequencer::prelude::*;
let mut drift = DriftCorrector::new();
// first step: nothing measured yet
assert_eq!(drift.next_sleep(DeciMicros::ZERO, DeciMicros::new(1000)), DeciMicros::new(1000));
// the previous step overran by 50
assert_eq!(drift.next_sleep(DeciMicros::new(1050), DeciMicros::new(1000)), DeciMicros::new(950));
```
"#]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriftCorrector {
    previous_intended: DeciMicros,
    accumulated: DeciMicros,
}

impl DriftCorrector {
    /// No history yet
    pub const fn new() -> Self {
        Self {
            previous_intended: DeciMicros::ZERO,
            accumulated: DeciMicros::ZERO,
        }
    }

    /// Running total of lateness. Negative means ahead of schedule.
    pub const fn accumulated(&self) -> DeciMicros {
        self.accumulated
    }

    /// Sleep intended by the previous call
    pub const fn previous_intended(&self) -> DeciMicros {
        self.previous_intended
    }

    /// Computes the sleep for the next step.
    ///
    /// `elapsed` is the wall time measured since the previous measurement,
    /// `intended` is the nominal duration of the step about to be waited.
    pub fn next_sleep(&mut self, elapsed: DeciMicros, intended: DeciMicros) -> DeciMicros {
        let error = elapsed - self.previous_intended;
        self.previous_intended = intended;
        self.accumulated += error;

        let sleep = if self.accumulated.is_positive() {
            intended - self.accumulated
        } else {
            intended
        };
        if sleep.is_positive() {
            sleep
        } else {
            DeciMicros::ZERO
        }
    }
}

#[test]
fn drift_is_taken_off_later_sleeps() {
    use pretty_assertions::assert_eq;

    let mut drift = DriftCorrector::new();
    let step = DeciMicros::new(10_000);

    assert_eq!(drift.next_sleep(DeciMicros::ZERO, step), step);
    // overran by 300
    assert_eq!(drift.next_sleep(DeciMicros::new(10_300), step), DeciMicros::new(9_700));
    // the shortened step took 200 less than nominal, 100 of lateness remains
    assert_eq!(drift.next_sleep(DeciMicros::new(9_800), step), DeciMicros::new(9_900));
    assert_eq!(drift.accumulated(), DeciMicros::new(100));
}

#[test]
fn early_wakeups_are_not_compensated() {
    use pretty_assertions::assert_eq;

    let mut drift = DriftCorrector::new();
    let step = DeciMicros::new(1_000);
    drift.next_sleep(DeciMicros::ZERO, step);
    // woke 400 early: accumulated goes negative, sleep stays nominal
    assert_eq!(drift.next_sleep(DeciMicros::new(600), step), step);
    assert_eq!(drift.accumulated(), DeciMicros::new(-400));
}

#[test]
fn large_lateness_floors_at_zero() {
    use pretty_assertions::assert_eq;

    let mut drift = DriftCorrector::new();
    drift.next_sleep(DeciMicros::ZERO, DeciMicros::new(100));
    assert_eq!(
        drift.next_sleep(DeciMicros::new(5_000), DeciMicros::new(100)),
        DeciMicros::ZERO
    );
    assert_eq!(drift.previous_intended(), DeciMicros::new(100));
}

#[test]
fn virtual_clock_records_sleeps() {
    use pretty_assertions::assert_eq;

    let control = Control::new();
    let mut clock = VirtualClock::new();
    let observer = clock.clone();
    let start = observer.now();

    assert_eq!(clock.sleep(Duration::from_millis(7), &control), Duration::ZERO);
    observer.advance(Duration::from_millis(3));
    clock.sleep(Duration::from_millis(1), &control);

    assert_eq!(observer.sleeps(), vec![Duration::from_millis(7), Duration::from_millis(1)]);
    assert_eq!(observer.total_slept(), Duration::from_millis(8));
    assert_eq!(observer.now() - start, Duration::from_millis(11));
}
