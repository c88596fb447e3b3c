mod common;

use std::{sync::Arc, time::Duration};

use common::{SmfBuilder, TrackBuilder};
use crossbeam_channel::Receiver;
use pretty_assertions::assert_eq;
use smf_sequencer::prelude::*;

fn run_virtual(bytes: &[u8]) -> (Result<Outcome, PlaybackError>, Vec<PlayerEvent>, VirtualClock) {
    let file = SequenceFile::from_bytes(bytes).unwrap();
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let clock = VirtualClock::new();
    let outcome = Scheduler::new(file, Arc::new(tx))
        .with_clock(clock.clone())
        .run();
    (outcome, rx.try_iter().collect(), clock)
}

fn ticks(events: &[PlayerEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::Tick { current_tick } => Some(*current_tick),
            _ => None,
        })
        .collect()
}

fn midi(events: &[PlayerEvent]) -> Vec<MidiMessage> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::Midi(message) => Some(*message),
            _ => None,
        })
        .collect()
}

#[test]
fn dispatches_events_tick_by_tick() {
    // events at 0, 10, 10 (a meta event) and 25, End of Track at 30
    let bytes = SmfBuilder::new(0, 96)
        .track(
            TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .note_on(10, 0, 64, 100)
                .text(0, "verse")
                .note_off(15, 0, 60)
                .end(5),
        )
        .build();

    let (outcome, events, _) = run_virtual(&bytes);
    assert_eq!(outcome.unwrap(), Outcome::Finished);
    assert_eq!(ticks(&events), vec![10, 25, 30]);
    assert_eq!(
        midi(&events),
        vec![
            MidiMessage::new(0x90, 60, 100),
            MidiMessage::new(0x90, 64, 100),
            MidiMessage::new(0x80, 60, 0),
        ]
    );
    assert_eq!(events[0], PlayerEvent::StateChanged(PlaybackState::Playing));
    assert_eq!(
        &events[events.len() - 2..],
        &[
            PlayerEvent::Finished,
            PlayerEvent::StateChanged(PlaybackState::Stopped)
        ]
    );
}

#[test]
fn channel_event_precedes_the_tick_that_follows_it() {
    let bytes = SmfBuilder::new(0, 96)
        .track(TrackBuilder::new().note_on(4, 0, 60, 1).end(4))
        .build();
    let (_, events, _) = run_virtual(&bytes);
    assert_eq!(
        events,
        vec![
            PlayerEvent::StateChanged(PlaybackState::Playing),
            PlayerEvent::Tick { current_tick: 4 },
            PlayerEvent::Midi(MidiMessage::new(0x90, 60, 1)),
            PlayerEvent::Tick { current_tick: 8 },
            PlayerEvent::Finished,
            PlayerEvent::StateChanged(PlaybackState::Stopped),
        ]
    );
}

#[test]
fn tracks_interleave_by_tick_then_by_index() {
    let bytes = SmfBuilder::new(1, 96)
        .track(TrackBuilder::new().note_on(5, 1, 10, 1).end(0))
        .track(
            TrackBuilder::new()
                .note_on(0, 2, 20, 1)
                .note_on(5, 2, 21, 1)
                .end(0),
        )
        .build();

    let (_, events, _) = run_virtual(&bytes);
    let keys: Vec<u8> = midi(&events).iter().map(MidiMessage::data1).collect();
    assert_eq!(keys, vec![20, 10, 21]);
}

#[test]
fn sleeps_follow_tempo_changes() {
    let bytes = SmfBuilder::new(0, 100)
        .track(
            TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .tempo(100, 250_000)
                .end(100),
        )
        .build();

    let (outcome, _, clock) = run_virtual(&bytes);
    assert_eq!(outcome.unwrap(), Outcome::Finished);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_millis(500), Duration::from_millis(250)]
    );
}

#[test]
fn tempo_in_one_track_times_the_others() {
    // conductor track halves the tempo at tick 0
    let bytes = SmfBuilder::new(1, 100)
        .track(TrackBuilder::new().tempo(0, 250_000).end(0))
        .track(TrackBuilder::new().note_on(100, 0, 60, 1).end(0))
        .build();

    let (_, _, clock) = run_virtual(&bytes);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
}

#[test]
fn track_without_end_of_track_ends_at_its_last_byte() {
    let bytes = SmfBuilder::new(1, 96)
        .track(TrackBuilder::new().note_on(0, 0, 60, 1))
        .track(TrackBuilder::new().note_on(10, 0, 61, 1).end(0))
        .build();

    let (outcome, events, _) = run_virtual(&bytes);
    assert_eq!(outcome.unwrap(), Outcome::Finished);
    assert_eq!(midi(&events).len(), 2);
}

#[test]
fn sysex_is_skipped_without_reaching_the_sink() {
    let bytes = SmfBuilder::new(0, 96)
        .track(
            TrackBuilder::new()
                .event(0, &[0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7])
                .note_on(0, 0, 60, 1)
                .end(0),
        )
        .build();

    let file = SequenceFile::from_bytes(&bytes).unwrap();
    let (tx, rx) = crossbeam_channel::unbounded::<u32>();
    Scheduler::new(file, Arc::new(NoopListener))
        .with_clock(VirtualClock::new())
        .with_sink(shared_sink(tx))
        .with_config(
            PlayerConfig::default()
                .with_silence_on_stop(false)
                .with_reset_sink_on_stop(false),
        )
        .run()
        .unwrap();

    let words: Vec<u32> = rx.try_iter().collect();
    assert_eq!(words, vec![0x0001_3C90]);
}

#[test]
fn meta_length_past_the_track_fails_playback() {
    let bytes = SmfBuilder::new(0, 96)
        .raw_track(&[0x00, 0xFF, 0x01, 0x40, b'a', b'b'])
        .build();

    let (outcome, events, _) = run_virtual(&bytes);
    match outcome {
        Err(PlaybackError::CorruptTrackData { track, source }) => {
            assert_eq!(track, 0);
            assert!(source.is_out_of_bounds());
        }
        other => panic!("expected corrupt track data, got {other:?}"),
    }
    assert!(!events.contains(&PlayerEvent::Finished));
}

#[test]
fn stop_sends_all_notes_off_then_resets() {
    struct Recorder(crossbeam_channel::Sender<Option<u32>>);
    impl MidiSink for Recorder {
        fn send(&mut self, packed: u32) {
            let _ = self.0.send(Some(packed));
        }
        fn reset(&mut self) {
            let _ = self.0.send(None);
        }
    }

    let bytes = SmfBuilder::new(0, 96)
        .track(TrackBuilder::new().note_on(0, 3, 60, 100).end(0))
        .build();
    let file = SequenceFile::from_bytes(&bytes).unwrap();
    let (tx, rx) = crossbeam_channel::unbounded();
    Scheduler::new(file, Arc::new(NoopListener))
        .with_clock(VirtualClock::new())
        .with_sink(shared_sink(Recorder(tx)))
        .run()
        .unwrap();

    let sent: Vec<Option<u32>> = rx.try_iter().collect();
    assert_eq!(sent.len(), 1 + 16 * 128 + 1);
    assert_eq!(sent[0], Some(0x0064_3C93));
    assert_eq!(sent[1], Some(0x0000_0080));
    assert_eq!(sent.last(), Some(&None));
}

fn drain_until(rx: &Receiver<PlayerEvent>, wanted: &PlayerEvent) -> Vec<PlayerEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
        let done = &event == wanted;
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

#[test]
fn finished_session_unloads_and_reports_stopped() {
    let bytes = SmfBuilder::new(0, 96)
        .track(TrackBuilder::new().note_on(0, 0, 60, 1).end(96))
        .build();
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);

    player
        .play_with_clock(SequenceFile::from_bytes(&bytes).unwrap(), VirtualClock::new())
        .unwrap();
    let events = drain_until(&rx, &PlayerEvent::StateChanged(PlaybackState::Stopped));
    assert_eq!(player.wait().map(Result::unwrap), Some(Outcome::Finished));
    assert_eq!(player.state(), PlaybackState::Stopped);

    let finished = events.iter().position(|e| e == &PlayerEvent::Finished);
    let stopped = events
        .iter()
        .position(|e| e == &PlayerEvent::StateChanged(PlaybackState::Stopped));
    assert!(finished.is_some());
    assert_eq!(stopped, finished.map(|i| i + 1));
}
