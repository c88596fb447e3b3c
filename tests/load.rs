mod common;

use std::io::Write;

use common::{SmfBuilder, TrackBuilder};
use pretty_assertions::assert_eq;
use smf_sequencer::prelude::*;

fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

fn two_tracks() -> Vec<u8> {
    SmfBuilder::new(1, 480)
        .track(TrackBuilder::new().tempo(0, 600_000).text(0, "conductor").end(0))
        .track(
            TrackBuilder::new()
                .program(0, 0, 1)
                .note_on(0, 0, 60, 100)
                .note_off(480, 0, 60)
                .end(0),
        )
        .build()
}

#[test]
fn loads_from_disk() {
    let bytes = two_tracks();
    let on_disk = write_temp(&bytes);

    let mut progress = Vec::new();
    let file =
        SequenceFile::open_with_progress(on_disk.path(), |index, len| progress.push((index, len)))
            .unwrap();

    assert_eq!(file.format(), FormatType::Simultaneous);
    assert_eq!(file.division().ticks_per_quarter_note(), 480);
    assert_eq!(file.track_count(), 2);
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].0, 0);
    assert_eq!(progress[1].0, 1);

    let total: u32 = progress.iter().map(|(_, len)| len).sum();
    assert_eq!(file.data().len(), total as usize);
    assert_eq!(file.offsets()[1], progress[0].1 as usize);
    assert_eq!(file.current_tick(), 0);
}

#[test]
fn header_length_is_checked() {
    let mut bytes = two_tracks();
    bytes[7] = 7;
    assert!(matches!(
        SequenceFile::from_bytes(&bytes),
        Err(LoadError::InvalidHeaderLength(7))
    ));
}

#[test]
fn riff_wrapped_file_is_not_midi() {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&two_tracks()[4..]);
    let err = SequenceFile::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, LoadError::NotAMidiFile(0x5249_4646)));
    assert!(err.is_structural());
}

#[test]
fn format_two_is_refused() {
    let bytes = SmfBuilder::new(2, 96)
        .track(TrackBuilder::new().end(0))
        .build();
    assert!(matches!(
        SequenceFile::from_bytes(&bytes),
        Err(LoadError::UnsupportedFormat(2))
    ));
}

#[test]
fn smpte_timing_is_refused() {
    let bytes = SmfBuilder::new(0, 0xE728)
        .track(TrackBuilder::new().end(0))
        .build();
    assert!(matches!(
        SequenceFile::from_bytes(&bytes),
        Err(LoadError::UnsupportedTiming(0xE728))
    ));
}

#[test]
fn zero_tracks_is_refused() {
    let bytes = SmfBuilder::new(0, 96).build();
    assert!(matches!(
        SequenceFile::from_bytes(&bytes),
        Err(LoadError::NoTracks)
    ));
}

#[test]
fn truncated_header_is_an_io_error() {
    let bytes = two_tracks();
    let err = SequenceFile::from_bytes(&bytes[..10]).unwrap_err();
    match err {
        LoadError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SequenceFile::open(dir.path().join("nothing.mid")).unwrap_err();
    assert!(!err.is_structural());
}

#[test]
fn failed_load_is_reported_and_leaves_player_stopped() {
    let on_disk = write_temp(b"MThd\x00\x00\x00\x06\x00\x02\x00\x01\x00\x60");
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);

    let err = player.load(on_disk.path()).unwrap_err();
    assert!(matches!(
        err,
        PlayerError::Load(LoadError::UnsupportedFormat(2))
    ));
    assert_eq!(player.state(), PlaybackState::Stopped);

    let events: Vec<PlayerEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], PlayerEvent::LoadFailed { .. }));
}

#[test]
fn load_reports_every_track_then_plays() {
    let on_disk = write_temp(&two_tracks());
    let (tx, rx) = crossbeam_channel::unbounded::<PlayerEvent>();
    let mut player = Player::new(tx);

    player.load(on_disk.path()).unwrap();
    player.stop();

    let events: Vec<PlayerEvent> = rx.try_iter().collect();
    assert!(matches!(
        events[0],
        PlayerEvent::Loading { track_index: 0, .. }
    ));
    assert!(matches!(
        events[1],
        PlayerEvent::Loading { track_index: 1, .. }
    ));
    assert_eq!(events[2], PlayerEvent::Loaded { track_count: 2 });
    assert_eq!(
        events.last(),
        Some(&PlayerEvent::StateChanged(PlaybackState::Stopped))
    );
}
