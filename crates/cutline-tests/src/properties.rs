//! Property tests for the edit engine invariants.
//!
//! Random edit sequences must keep the shadow list and the native
//! structure in lockstep after every action, unwind to the initial state
//! when fully undone, and replay to an observationally identical state
//! (media clip ids included) when fully redone.

use cutline_core::FrameRate;
use cutline_engine::MemoryEngine;
use cutline_timeline::{Clip, EditAction, Sequence, SourceRef};
use proptest::prelude::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Op {
    Append { frames: i64 },
    Insert { index: usize, frames: i64 },
    RemoveMultiple { index: usize, count: usize },
    Cut { frame: i64 },
    Overwrite { dst_in: i64, frames: i64 },
    ExtractRange { in_frame: i64, len: i64 },
    Move { first: usize, dst_in: i64 },
    ConsolidateAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..60).prop_map(|frames| Op::Append { frames }),
        (0usize..6, 1i64..60).prop_map(|(index, frames)| Op::Insert { index, frames }),
        (0usize..6, 1usize..4).prop_map(|(index, count)| Op::RemoveMultiple { index, count }),
        (0i64..240).prop_map(|frame| Op::Cut { frame }),
        (0i64..180, 1i64..40).prop_map(|(dst_in, frames)| Op::Overwrite { dst_in, frames }),
        (0i64..180, 1i64..40).prop_map(|(in_frame, len)| Op::ExtractRange { in_frame, len }),
        (0usize..6, 0i64..180).prop_map(|(first, dst_in)| Op::Move { first, dst_in }),
        Just(Op::ConsolidateAll),
    ]
}

fn to_action(op: &Op, serial: &mut u32) -> EditAction {
    let mut fresh = |frames: i64| {
        *serial += 1;
        Clip::new(format!("p{serial}"), SourceRef::new("prop.mp4", frames))
    };
    match *op {
        Op::Append { frames } => EditAction::append(0, fresh(frames), 0, frames - 1),
        Op::Insert { index, frames } => {
            EditAction::insert(0, index, fresh(frames), 0, frames - 1)
        }
        Op::RemoveMultiple { index, count } => EditAction::remove_multiple(0, index, count),
        Op::Cut { frame } => EditAction::cut(0, frame),
        Op::Overwrite { dst_in, frames } => {
            EditAction::three_point_overwrite(0, dst_in, fresh(frames), 0, frames - 1)
        }
        Op::ExtractRange { in_frame, len } => {
            EditAction::extract_range(0, in_frame, in_frame + len - 1)
        }
        Op::Move { first, dst_in } => EditAction::overwrite_move(0, 0, first, first, dst_in),
        Op::ConsolidateAll => EditAction::consolidate_all_blanks(),
    }
}

/// Observational state: media entries by id and bounds, blanks by bounds
/// only (they have no persistent identity).
type Fingerprint = Vec<Vec<(Option<Uuid>, i64, i64)>>;

fn fingerprint(seq: &Sequence) -> Fingerprint {
    seq.tracks()
        .iter()
        .map(|track| {
            track
                .clips()
                .iter()
                .map(|c| {
                    let id = if c.is_blank() { None } else { Some(c.id) };
                    (id, c.clip_in, c.clip_out)
                })
                .collect()
        })
        .collect()
}

fn check_lockstep(seq: &Sequence) -> Result<(), TestCaseError> {
    for track in seq.tracks() {
        for (i, shadow) in track.clips().iter().enumerate() {
            let native = track.native_entry(i);
            prop_assert!(native.is_some(), "native entry {} missing", i);
            let native = native.unwrap();
            prop_assert_eq!(shadow.is_blank(), native.is_blank());
            prop_assert_eq!(shadow.clip_in, native.clip_in);
            prop_assert_eq!(shadow.clip_out, native.clip_out);
        }
        prop_assert!(track.native_entry(track.entry_count()).is_none());
        prop_assert_eq!(track.shadow_length(), track.get_length());
    }
    Ok(())
}

fn build_sequence() -> Sequence {
    Sequence::new(
        "Property",
        FrameRate::FPS_24,
        Box::new(MemoryEngine::new()),
        1,
        0,
    )
}

proptest! {
    #[test]
    fn random_edits_hold_lockstep_and_unwind(
        ops in prop::collection::vec(op_strategy(), 1..12)
    ) {
        let mut seq = build_sequence();
        let initial = fingerprint(&seq);
        let mut serial = 0;
        let mut applied = 0usize;

        for op in &ops {
            // Structurally impossible ops (e.g. moving from an empty
            // track) are rejected atomically and stay off the stack.
            if seq.do_edit(to_action(op, &mut serial)).is_ok() {
                applied += 1;
            }
            check_lockstep(&seq)?;
        }
        prop_assert_eq!(seq.undo_count(), applied);
        let applied_state = fingerprint(&seq);

        let mut undone = 0usize;
        while seq.undo().unwrap() {
            undone += 1;
            check_lockstep(&seq)?;
        }
        prop_assert_eq!(undone, applied);
        prop_assert_eq!(fingerprint(&seq), initial);

        let mut redone = 0usize;
        while seq.redo().unwrap() {
            redone += 1;
            check_lockstep(&seq)?;
        }
        prop_assert_eq!(redone, applied);
        prop_assert_eq!(fingerprint(&seq), applied_state);
    }

    #[test]
    fn repeated_cuts_at_same_frame_are_idempotent(
        frames in 2i64..120,
        frame in 1i64..119,
    ) {
        prop_assume!(frame < frames);
        let mut seq = build_sequence();
        let clip = Clip::new("base", SourceRef::new("prop.mp4", frames));
        seq.do_edit(EditAction::append(0, clip, 0, frames - 1)).unwrap();

        seq.do_edit(EditAction::cut(0, frame)).unwrap();
        let count_after_first = seq.track(0).unwrap().entry_count();
        prop_assert_eq!(count_after_first, 2);

        // The frame now lies on a boundary; further cuts change nothing.
        for _ in 0..3 {
            seq.do_edit(EditAction::cut(0, frame)).unwrap();
            prop_assert_eq!(seq.track(0).unwrap().entry_count(), count_after_first);
        }
        check_lockstep(&seq)?;
    }

    #[test]
    fn undo_redo_is_observationally_identical(
        ops in prop::collection::vec(op_strategy(), 1..8)
    ) {
        let mut seq = build_sequence();
        let mut serial = 0;
        for op in &ops {
            let _ = seq.do_edit(to_action(op, &mut serial));
        }
        let before = fingerprint(&seq);
        if seq.undo().unwrap() {
            seq.redo().unwrap();
        }
        prop_assert_eq!(fingerprint(&seq), before);
        check_lockstep(&seq)?;
    }
}
