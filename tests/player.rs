mod common;

use std::{sync::Arc, time::Duration};

use common::{SmfBuilder, TrackBuilder};
use crossbeam_channel::Receiver;
use pretty_assertions::assert_eq;
use smf_sequencer::prelude::*;

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

fn long_song() -> SequenceFile {
    let bytes = SmfBuilder::new(0, 96)
        .track(
            TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .note_off(96 * 120, 0, 60)
                .end(0),
        )
        .build();
    SequenceFile::from_bytes(&bytes).unwrap()
}

#[test]
fn resume_does_not_catch_up_on_paused_time() {
    // 10 ticks at 100 per quarter and 120 BPM: 50 ms each
    let bytes = SmfBuilder::new(0, 100)
        .track(
            TrackBuilder::new()
                .note_on(0, 0, 60, 1)
                .note_on(10, 0, 62, 1)
                .note_on(10, 0, 64, 1)
                .end(10),
        )
        .build();
    let file = SequenceFile::from_bytes(&bytes).unwrap();

    let clock = VirtualClock::new();
    let control = Arc::new(Control::new());
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let pauser = {
        let control = Arc::clone(&control);
        let clock = clock.clone();
        move |event: &PlayerEvent| match event {
            PlayerEvent::Tick { current_tick: 10 } => {
                control.pause();
            }
            PlayerEvent::StateChanged(PlaybackState::Paused) => {
                let control = Arc::clone(&control);
                let clock = clock.clone();
                std::thread::spawn(move || {
                    clock.advance(Duration::from_secs(10));
                    control.resume();
                });
            }
            _ => {}
        }
    };

    let outcome = Scheduler::new(file, Arc::new((tx, pauser)))
        .with_clock(clock.clone())
        .with_control(control)
        .run()
        .unwrap();

    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(50); 3]);

    let events: Vec<PlayerEvent> = rx.try_iter().collect();
    let paused = events
        .iter()
        .position(|e| e == &PlayerEvent::StateChanged(PlaybackState::Paused))
        .unwrap();
    assert_eq!(events[paused - 1], PlayerEvent::Tick { current_tick: 10 });
    assert_eq!(
        events[paused + 1],
        PlayerEvent::StateChanged(PlaybackState::Playing)
    );
    assert_eq!(
        events[paused + 2],
        PlayerEvent::Midi(MidiMessage::new(0x90, 62, 1))
    );
}

#[test]
fn stop_while_paused_ends_the_session() {
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);
    player.play(long_song()).unwrap();

    drain_until(&rx, &PlayerEvent::Tick { current_tick: 96 * 120 });
    assert!(player.pause());
    assert_eq!(player.state(), PlaybackState::Paused);
    drain_until(&rx, &PlayerEvent::StateChanged(PlaybackState::Paused));

    assert_eq!(player.stop().map(Result::unwrap), Some(Outcome::Stopped));
    assert_eq!(player.state(), PlaybackState::Stopped);

    let rest: Vec<PlayerEvent> = rx.try_iter().collect();
    assert_eq!(rest, vec![PlayerEvent::StateChanged(PlaybackState::Stopped)]);
}

#[test]
fn toggle_pause_flips_between_states() {
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);
    assert!(!player.toggle_pause());

    player.play(long_song()).unwrap();
    drain_until(&rx, &PlayerEvent::StateChanged(PlaybackState::Playing));
    assert!(player.toggle_pause());
    assert_eq!(player.state(), PlaybackState::Paused);
    assert!(player.toggle_pause());
    assert_eq!(player.state(), PlaybackState::Playing);
    assert!(!player.resume());

    player.stop();
    assert!(!player.toggle_pause());
}

#[test]
fn new_session_starts_from_tick_zero() {
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);

    player.play(long_song()).unwrap();
    drain_until(&rx, &PlayerEvent::Tick { current_tick: 96 * 120 });
    player.stop();
    let _ = rx.try_iter().count();

    let bytes = SmfBuilder::new(0, 96)
        .track(TrackBuilder::new().note_on(7, 0, 60, 1).end(0))
        .build();
    player
        .play_with_clock(SequenceFile::from_bytes(&bytes).unwrap(), VirtualClock::new())
        .unwrap();
    let events = drain_until(&rx, &PlayerEvent::StateChanged(PlaybackState::Stopped));
    assert_eq!(player.wait().map(Result::unwrap), Some(Outcome::Finished));

    let first_tick = events.iter().find_map(|e| match e {
        PlayerEvent::Tick { current_tick } => Some(*current_tick),
        _ => None,
    });
    assert_eq!(first_tick, Some(7));
}

#[test]
fn dropping_the_player_stops_playback() {
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx).with_config(PlayerConfig::default().with_thread_name("drop-test"));
    player.play(long_song()).unwrap();
    drain_until(&rx, &PlayerEvent::StateChanged(PlaybackState::Playing));
    drop(player);

    let rest: Vec<PlayerEvent> = rx.try_iter().collect();
    assert_eq!(
        rest.last(),
        Some(&PlayerEvent::StateChanged(PlaybackState::Stopped))
    );
}

#[test]
fn set_sink_swaps_output_between_sessions() {
    let bytes = SmfBuilder::new(0, 96)
        .track(TrackBuilder::new().note_on(0, 0, 60, 1).end(0))
        .build();
    let quiet = PlayerConfig::default()
        .with_silence_on_stop(false)
        .with_reset_sink_on_stop(false);

    let (first_tx, first_rx) = crossbeam_channel::unbounded::<u32>();
    let (second_tx, second_rx) = crossbeam_channel::unbounded::<u32>();
    let mut player = Player::new(NoopListener)
        .with_config(quiet)
        .with_sink(first_tx);

    player
        .play_with_clock(SequenceFile::from_bytes(&bytes).unwrap(), VirtualClock::new())
        .unwrap();
    player.wait();
    player.set_sink(second_tx);
    player
        .play_with_clock(SequenceFile::from_bytes(&bytes).unwrap(), VirtualClock::new())
        .unwrap();
    player.wait();

    assert_eq!(first_rx.try_iter().collect::<Vec<_>>(), vec![0x0001_3C90]);
    assert_eq!(second_rx.try_iter().collect::<Vec<_>>(), vec![0x0001_3C90]);
}

#[test]
fn note_stats_follow_the_stream() {
    let bytes = SmfBuilder::new(1, 96)
        .track(
            TrackBuilder::new()
                .note_on(0, 0, 60, 100)
                .note_on(0, 0, 64, 100)
                .note_off(10, 0, 60)
                .end(0),
        )
        .track(TrackBuilder::new().note_on(5, 9, 36, 127).end(10))
        .build();

    let stats = Arc::new(NoteStats::new());
    let (tx, rx) = crossbeam_channel::unbounded::<NoteSnapshot>();
    let at_finish = {
        let stats = Arc::clone(&stats);
        move |event: &PlayerEvent| {
            if event == &PlayerEvent::Finished {
                let _ = tx.send(stats.snapshot());
            }
        }
    };

    Scheduler::new(
        SequenceFile::from_bytes(&bytes).unwrap(),
        Arc::new((Arc::clone(&stats), at_finish)),
    )
    .with_clock(VirtualClock::new())
    .run()
    .unwrap();

    let snapshot = rx.try_recv().unwrap();
    assert_eq!(snapshot.note_count, 3);
    assert_eq!(snapshot.max_polyphony, 3);
    assert_eq!(snapshot.polyphony, 2);
    assert_eq!(snapshot.current_tick, 15);
    assert!(snapshot.is_held(0, 64));
    assert!(!snapshot.is_held(0, 60));
    assert_eq!(snapshot.keyboard_channel(36), Some(9));

    // the closing Stopped notification cleared everything
    assert_eq!(stats.snapshot().note_count, 0);
}
