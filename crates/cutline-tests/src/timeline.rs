//! End-to-end timeline editing scenarios.
//!
//! Exercises the full path: sequence → edit actions → atomic primitives →
//! native engine, asserting the shadow list and the native structure stay
//! in lockstep after every step.

use anyhow::Result;
use cutline_core::FrameRate;
use cutline_engine::MemoryEngine;
use cutline_timeline::{
    sync, Clip, CompositorKind, EditAction, Sequence, SequenceSnapshot, SourceRef, SyncState,
    Track,
};

// ── Helpers ────────────────────────────────────────────────────

fn clip(name: &str, frames: i64) -> Clip {
    Clip::new(name, SourceRef::new("media/test.mp4", frames))
}

fn build_sequence(video: usize, audio: usize) -> Sequence {
    crate::init_logging();
    Sequence::new(
        "Main Timeline",
        FrameRate::FPS_24,
        Box::new(MemoryEngine::new()),
        video,
        audio,
    )
}

/// The structural invariant: same count, same per-entry kind and bounds,
/// same total length in both representations.
fn assert_lockstep(track: &Track) {
    for (i, shadow) in track.clips().iter().enumerate() {
        let native = track
            .native_entry(i)
            .unwrap_or_else(|| panic!("native entry {i} missing on {}", track.name));
        assert_eq!(shadow.is_blank(), native.is_blank());
        assert_eq!(shadow.clip_in, native.clip_in);
        assert_eq!(shadow.clip_out, native.clip_out);
        assert_eq!(shadow.length(), native.length());
    }
    assert!(track.native_entry(track.entry_count()).is_none());
    assert_eq!(track.shadow_length(), track.get_length());
}

fn assert_all_lockstep(seq: &Sequence) {
    for track in seq.tracks() {
        assert_lockstep(track);
    }
}

fn bounds(track: &Track) -> Vec<(bool, i64, i64)> {
    track
        .clips()
        .iter()
        .map(|c| (c.is_blank(), c.clip_in, c.clip_out))
        .collect()
}

// ── Scenario 1: cut and restore a single clip ──────────────────

#[test]
fn cut_single_clip_and_undo_restores_identity() {
    let mut seq = build_sequence(1, 0);
    let original = clip("single", 100);
    let original_id = original.id;
    seq.do_edit(EditAction::append(0, original, 0, 99)).unwrap();

    seq.do_edit(EditAction::cut(0, 50)).unwrap();
    {
        let track = seq.track(0).unwrap();
        assert_eq!(bounds(track), vec![(false, 0, 49), (false, 50, 99)]);
        assert_eq!(track.clip_at(0).unwrap().id, original_id);
        assert_all_lockstep(&seq);
    }

    seq.undo().unwrap();
    let track = seq.track(0).unwrap();
    assert_eq!(bounds(track), vec![(false, 0, 99)]);
    assert_eq!(track.clip_at(0).unwrap().id, original_id);
    assert_all_lockstep(&seq);
}

// ── Scenario 2: blank + clip removal round trip ────────────────

#[test]
fn remove_multiple_restores_blank_and_clip() {
    let mut seq = build_sequence(1, 0);
    {
        let track = seq.track_mut(0).unwrap();
        track.insert_blank(0, 10);
        track.insert_clip(1, clip("after-gap", 20), 0, 19);
        assert_eq!(track.get_length(), 30);
    }
    assert_all_lockstep(&seq);

    seq.do_edit(EditAction::remove_multiple(0, 0, 2)).unwrap();
    assert_eq!(seq.track(0).unwrap().entry_count(), 0);

    seq.undo().unwrap();
    let track = seq.track(0).unwrap();
    assert_eq!(bounds(track), vec![(true, 0, 9), (false, 0, 19)]);
    assert_eq!(track.get_length(), 30);
    assert_all_lockstep(&seq);
}

// ── Scenario 3: non-adjacent blanks never merge ────────────────

#[test]
fn consolidate_all_blanks_needs_adjacency() {
    let mut seq = build_sequence(1, 0);
    {
        let track = seq.track_mut(0).unwrap();
        track.insert_blank(0, 5);
        track.insert_clip(1, clip("mid", 20), 0, 19);
        track.insert_blank(2, 5);
    }

    seq.do_edit(EditAction::consolidate_all_blanks()).unwrap();
    // Nothing merged; the trailing blank is normalized away, the leading
    // gap and the clip are untouched.
    let track = seq.track(0).unwrap();
    assert_eq!(bounds(track)[0], (true, 0, 4));
    assert_eq!(bounds(track)[1], (false, 0, 19));
    assert_all_lockstep(&seq);
}

// ── Scenario 4: adjacent blanks merge and unmerge exactly ──────

#[test]
fn consolidate_run_round_trip() {
    let mut seq = build_sequence(1, 0);
    {
        let track = seq.track_mut(0).unwrap();
        track.insert_blank(0, 3);
        track.insert_blank(1, 4);
        track.insert_clip(2, clip("tail", 10), 0, 9);
    }

    seq.do_edit(EditAction::consolidate_blanks(0, 0)).unwrap();
    assert_eq!(
        bounds(seq.track(0).unwrap()),
        vec![(true, 0, 6), (false, 0, 9)]
    );

    seq.undo().unwrap();
    assert_eq!(
        bounds(seq.track(0).unwrap()),
        vec![(true, 0, 2), (true, 0, 3), (false, 0, 9)],
        "per-run blank lengths must come back in original order"
    );
    assert_all_lockstep(&seq);
}

// ── Scenario 5: overwrite move ─────────────────────────────────

#[test]
fn overwrite_move_round_trip() {
    let mut seq = build_sequence(1, 0);
    let a = clip("A", 50);
    let b = clip("B", 100);
    let (a_id, b_id) = (a.id, b.id);
    seq.do_edit(EditAction::append(0, a, 0, 49)).unwrap();
    seq.do_edit(EditAction::append(0, b, 50, 99)).unwrap();

    // Drop B over [20, 69]: cuts A at 20, splices out the remnants.
    seq.do_edit(EditAction::overwrite_move(0, 0, 1, 1, 20))
        .unwrap();
    {
        let track = seq.track(0).unwrap();
        assert_eq!(bounds(track), vec![(false, 0, 19), (false, 50, 99)]);
        assert_eq!(track.clip_at(0).unwrap().id, a_id);
        assert_eq!(track.clip_at(1).unwrap().id, b_id);
        assert_eq!(track.clip_start(1), 20);
        assert_all_lockstep(&seq);
    }

    seq.undo().unwrap();
    {
        let track = seq.track(0).unwrap();
        assert_eq!(
            bounds(track),
            vec![(false, 0, 49), (false, 50, 99)],
            "A restored as a single clip, B back in its original slot"
        );
        assert_eq!(track.clip_at(0).unwrap().id, a_id);
        assert_eq!(track.clip_at(1).unwrap().id, b_id);
        assert_all_lockstep(&seq);
    }

    // The redo is observationally identical to the first apply.
    seq.redo().unwrap();
    let track = seq.track(0).unwrap();
    assert_eq!(bounds(track), vec![(false, 0, 19), (false, 50, 99)]);
    assert_eq!(track.clip_start(1), 20);
    assert_all_lockstep(&seq);
}

// ── Scenario 6: group resync ───────────────────────────────────

#[test]
fn group_resync_holds_offset_invariant() {
    let mut seq = build_sequence(2, 0);
    seq.do_edit(EditAction::append(0, clip("master", 50), 0, 49))
        .unwrap();
    {
        let track = seq.track_mut(1).unwrap();
        track.insert_blank(0, 10);
        track.insert_clip(1, clip("child", 20), 0, 19);
    }
    seq.do_edit(EditAction::set_sync_relation(1, 1, 0, 0))
        .unwrap();
    let child_id = seq.track(1).unwrap().clip_at(1).unwrap().id;

    // Move the master 5 frames right; the child drifts.
    seq.do_edit(EditAction::overwrite_move(0, 0, 0, 0, 5))
        .unwrap();
    let items = sync::drifted_items(&seq);
    assert_eq!(items.len(), 1, "exactly one drifted clip");

    let action = sync::resync_group_action(&seq, &items).unwrap();
    seq.do_edit(action).unwrap();

    let child_track = seq.track(1).unwrap();
    let ci = child_track.find_clip_index(child_id).unwrap();
    let child = child_track.clip_at(ci).unwrap();
    let master_track = seq.track(0).unwrap();
    let mi = master_track
        .clips()
        .iter()
        .position(|c| !c.is_blank())
        .unwrap();
    let master = master_track.clip_at(mi).unwrap();
    assert_eq!(
        (child_track.clip_start(ci) - child.clip_in)
            - (master_track.clip_start(mi) - master.clip_in),
        10,
        "child start − child in − (master start − master in) == offset"
    );
    assert_eq!(child.sync.as_ref().unwrap().state, SyncState::InSync);
    assert_all_lockstep(&seq);
}

// ── Compositors across restacks ────────────────────────────────

#[test]
fn compositor_destroy_ids_survive_every_restack() -> Result<()> {
    let mut seq = build_sequence(3, 0);
    let first = seq.add_compositor(CompositorKind::Dissolve, 0, 1, 0, 49)?;
    let second = seq.add_compositor(CompositorKind::Wipe, 1, 2, 25, 74)?;

    // Adds, moves and removes all trigger restacks.
    seq.move_compositor(first, 10, 59)?;
    for id in [first, second] {
        assert!(seq.compositor(id)?.is_attached());
    }

    seq.remove_compositor(first)?;
    assert!(seq.compositor(first).is_err(), "removed id must not resolve");
    assert!(seq.compositor(second)?.is_attached());
    Ok(())
}

#[test]
fn compositor_edits_are_undoable() -> Result<()> {
    let mut seq = build_sequence(2, 0);
    seq.do_edit(EditAction::add_compositor(
        CompositorKind::PictureInPicture,
        0,
        1,
        0,
        99,
    ))?;
    let id = seq.compositors()[0].destroy_id;

    seq.undo()?;
    assert!(seq.compositor(id).is_err());
    seq.redo()?;
    assert_eq!(
        seq.compositor(id)?.kind,
        CompositorKind::PictureInPicture,
        "redo recreates the compositor under the same destroy id"
    );
    Ok(())
}

// ── Snapshot round trip through the persistence boundary ───────

#[test]
fn snapshot_round_trip_preserves_timeline() -> Result<()> {
    let mut seq = build_sequence(2, 1);
    seq.do_edit(EditAction::append(0, clip("Intro", 120), 0, 119))?;
    seq.do_edit(EditAction::append(0, clip("Body", 720), 0, 719))?;
    seq.do_edit(EditAction::append(2, clip("Music", 1080), 0, 1079))?;
    seq.do_edit(EditAction::cut(0, 60))?;
    seq.add_compositor(CompositorKind::Dissolve, 0, 1, 100, 150)?;

    let json = serde_json::to_vec(&seq.snapshot())?;
    let snapshot: SequenceSnapshot = serde_json::from_slice(&json)?;
    let restored = Sequence::from_snapshot(snapshot, Box::new(MemoryEngine::new()))?;

    assert_eq!(restored.length(), seq.length());
    for (a, b) in seq.tracks().iter().zip(restored.tracks()) {
        assert_eq!(bounds(a), bounds(b));
    }
    assert_all_lockstep(&restored);
    assert_eq!(restored.compositors().len(), 1);
    Ok(())
}

// ── Unlimited linear history ───────────────────────────────────

#[test]
fn long_edit_chain_unwinds_completely() {
    let mut seq = build_sequence(1, 0);
    for i in 0..300 {
        seq.do_edit(EditAction::append(0, clip(&format!("c{i}"), 10), 0, 9))
            .unwrap();
    }
    assert_eq!(seq.undo_count(), 300);
    assert_eq!(seq.track(0).unwrap().entry_count(), 300);

    while seq.undo().unwrap() {}
    assert_eq!(seq.track(0).unwrap().entry_count(), 0);
    assert_eq!(seq.redo_count(), 300);

    while seq.redo().unwrap() {}
    assert_eq!(seq.track(0).unwrap().entry_count(), 300);
    assert_all_lockstep(&seq);
}

// ── Timecode at sequence boundaries ────────────────────────────

#[test]
fn sequence_length_formats_as_timecode() {
    let mut seq = build_sequence(1, 0);
    seq.do_edit(EditAction::append(0, clip("Long", 24 * 60 * 60), 0, 24 * 60 * 60 - 1))
        .unwrap();
    let rate = seq.frame_rate;
    assert_eq!(rate.timecode(seq.length()), "01:00:00:00");
}
