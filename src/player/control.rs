use std::{
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::events::PlaybackState;

#[doc = r#"
Playback flags shared between a [`Player`](super::Player) and its scheduler.

The state and the cancellation flag are atomics, cheap enough to poll on
every loop iteration. Transitions also go through a small mutex/condvar
gate so that a scheduler parked in a pause, or in its timing sleep, wakes
up as soon as somebody resumes or stops it.
"#]
#[derive(Debug)]
pub struct Control {
    state: AtomicU8,
    cancelled: AtomicBool,
    gate: Mutex<()>,
    wake: Condvar,
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl Control {
    /// A fresh control in the `Stopped` state.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PlaybackState::Stopped.into()),
            cancelled: AtomicBool::new(false),
            gate: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        PlaybackState::try_from(self.state.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// True while playing or paused
    pub fn is_running(&self) -> bool {
        self.state() != PlaybackState::Stopped
    }

    /// True while paused
    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// True once a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Freeze playback. Returns false unless the state was `Playing`.
    pub fn pause(&self) -> bool {
        self.transition(PlaybackState::Playing, PlaybackState::Paused)
    }

    /// Continue a paused playback. Returns false unless the state was `Paused`.
    pub fn resume(&self) -> bool {
        self.transition(PlaybackState::Paused, PlaybackState::Playing)
    }

    /// Pause when playing, resume when paused.
    pub fn toggle_pause(&self) -> bool {
        match self.state() {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Stopped => false,
        }
    }

    /// Ask the scheduler to stop at its next check point.
    pub fn cancel(&self) {
        let _gate = self.gate.lock();
        self.cancelled.store(true, Ordering::Release);
        self.wake.notify_all();
    }

    pub(crate) fn start(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.transition(PlaybackState::Stopped, PlaybackState::Playing) || self.is_running()
    }

    pub(crate) fn finish(&self) {
        let _gate = self.gate.lock();
        self.state
            .store(PlaybackState::Stopped.into(), Ordering::Release);
        self.wake.notify_all();
    }

    fn transition(&self, from: PlaybackState, to: PlaybackState) -> bool {
        let _gate = self.gate.lock();
        let changed = self
            .state
            .compare_exchange(from.into(), to.into(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            self.wake.notify_all();
        }
        changed
    }

    /// Blocks while paused. Returns early on cancellation.
    pub(crate) fn wait_while_paused(&self) {
        let mut gate = self.gate.lock();
        while self.is_paused() && !self.is_cancelled() {
            self.wake.wait(&mut gate);
        }
    }

    /// Sleeps for `duration`, waking early on pause or cancellation.
    ///
    /// Returns the part of `duration` that was not slept.
    pub(crate) fn sleep(&self, duration: Duration) -> Duration {
        let deadline = Instant::now() + duration;
        let mut gate = self.gate.lock();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Duration::ZERO;
            }
            if self.is_cancelled() || self.is_paused() {
                return deadline - now;
            }
            self.wake.wait_until(&mut gate, deadline);
        }
    }
}

#[test]
fn transitions_follow_the_state_machine() {
    use pretty_assertions::assert_eq;

    let control = Control::new();
    assert_eq!(control.state(), PlaybackState::Stopped);
    assert!(!control.pause());
    assert!(!control.resume());
    assert!(!control.toggle_pause());

    assert!(control.start());
    assert_eq!(control.state(), PlaybackState::Playing);
    assert!(control.pause());
    assert!(!control.pause());
    assert!(control.is_paused());
    assert!(control.toggle_pause());
    assert_eq!(control.state(), PlaybackState::Playing);

    control.finish();
    assert!(!control.is_running());
}

#[test]
fn cancelled_control_cannot_start() {
    let control = Control::new();
    control.cancel();
    assert!(!control.start());
    assert!(!control.is_running());
}

#[test]
fn cancel_wakes_a_sleeper() {
    use std::sync::Arc;

    let control = Arc::new(Control::new());
    control.start();
    let sleeper = {
        let control = Arc::clone(&control);
        std::thread::spawn(move || control.sleep(Duration::from_secs(30)))
    };
    std::thread::sleep(Duration::from_millis(20));
    control.cancel();
    let left = sleeper.join().unwrap();
    assert!(left > Duration::from_secs(20));
}

#[test]
fn resume_releases_a_paused_waiter() {
    use std::sync::Arc;

    let control = Arc::new(Control::new());
    control.start();
    control.pause();
    let waiter = {
        let control = Arc::clone(&control);
        std::thread::spawn(move || control.wait_while_paused())
    };
    std::thread::sleep(Duration::from_millis(20));
    assert!(control.resume());
    waiter.join().unwrap();
}

#[test]
fn short_sleep_completes() {
    let control = Control::new();
    control.start();
    let started = Instant::now();
    assert_eq!(control.sleep(Duration::from_millis(5)), Duration::ZERO);
    assert!(started.elapsed() >= Duration::from_millis(5));
}
