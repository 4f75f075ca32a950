//! Clip-to-clip synchronization.
//!
//! A child clip carries a frame offset to a master clip. After every
//! completed edit the engine recomputes whether each child still holds
//! its offset; the resulting state is a cosmetic signal. Re-snapping a
//! drifted child is itself an overwrite-move edit, so resync reuses the
//! composite algorithms instead of inventing new mutation logic.

use uuid::Uuid;

use crate::clip::SyncState;
use crate::edit::{Edit, EditAction};
use crate::sequence::Sequence;

/// One drifted clip as supplied by the resync data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncItem {
    /// Child clip id
    pub clip_id: Uuid,
    /// Track the child sits on
    pub track: usize,
    /// Entry index of the child on its track
    pub index: usize,
    /// Offset the child must keep to its master
    pub pos_offset: i64,
}

/// Locate a clip by id across all tracks. Returns (track, index).
fn find_clip(seq: &Sequence, id: Uuid) -> Option<(usize, usize)> {
    seq.tracks
        .iter()
        .enumerate()
        .find_map(|(ti, track)| track.find_clip_index(id).map(|ci| (ti, ci)))
}

/// Recompute the sync state of every child clip. Runs globally when any
/// track saw a primitive since the last pass; the comparison itself is
/// the only drift detection this core performs.
pub(crate) fn recompute(seq: &mut Sequence) {
    let mut any_dirty = false;
    for track in &mut seq.tracks {
        any_dirty |= track.take_dirty();
    }
    if !any_dirty {
        return;
    }

    // Collect child positions first; master lookups need shared access.
    let mut children = Vec::new();
    for (ti, track) in seq.tracks.iter().enumerate() {
        for (ci, clip) in track.clips().iter().enumerate() {
            if let Some(sync) = &clip.sync {
                children.push((
                    ti,
                    ci,
                    sync.master_clip,
                    sync.pos_offset,
                    track.clip_start(ci) - clip.clip_in,
                ));
            }
        }
    }

    let mut states = Vec::with_capacity(children.len());
    for &(ti, ci, master_id, pos_offset, child_pos) in &children {
        let state = match find_clip(seq, master_id) {
            Some((mt, mi)) => {
                let track = &seq.tracks[mt];
                let master = &track.clips()[mi];
                let actual = child_pos - (track.clip_start(mi) - master.clip_in);
                if actual == pos_offset {
                    SyncState::InSync
                } else {
                    SyncState::OutOfSync(actual - pos_offset)
                }
            }
            None => SyncState::MasterGone,
        };
        states.push((ti, ci, state));
    }

    for (ti, ci, state) in states {
        if let Some(clip) = seq.tracks[ti].clip_at_mut(ci) {
            if let Some(sync) = &mut clip.sync {
                sync.state = state;
            }
        }
    }
}

/// Convenience resync data provider: every child currently out of sync,
/// as `(clip, track, index, pos_offset)` items.
pub fn drifted_items(seq: &Sequence) -> Vec<ResyncItem> {
    let mut items = Vec::new();
    for (ti, track) in seq.tracks().iter().enumerate() {
        for (ci, clip) in track.clips().iter().enumerate() {
            if let Some(sync) = &clip.sync {
                if matches!(sync.state, SyncState::OutOfSync(_)) {
                    items.push(ResyncItem {
                        clip_id: clip.id,
                        track: ti,
                        index: ci,
                        pos_offset: sync.pos_offset,
                    });
                }
            }
        }
    }
    items
}

/// Build the overwrite-move that snaps one drifted child back to its
/// offset. `None` when the child or master is gone, the child is already
/// in place, or the target would start before frame 0.
pub fn resync_edit(seq: &Sequence, item: &ResyncItem) -> Option<Edit> {
    let track = seq.track(item.track)?;
    let index = if track.clip_at(item.index).map(|c| c.id) == Some(item.clip_id) {
        item.index
    } else {
        track.find_clip_index(item.clip_id)?
    };
    let child = track.clip_at(index)?;
    let master_id = child.sync.as_ref()?.master_clip;
    let (mt, mi) = find_clip(seq, master_id)?;
    let master_track = seq.track(mt)?;
    let master = master_track.clip_at(mi)?;

    let want_start =
        master_track.clip_start(mi) - master.clip_in + item.pos_offset + child.clip_in;
    let current = track.clip_start(index);
    if want_start == current || want_start < 0 {
        return None;
    }
    Some(Edit::OverwriteMove {
        track: item.track,
        to_track: item.track,
        first: index,
        last: index,
        dst_in: want_start,
        state: None,
    })
}

/// Fold a provider-supplied list of drifted clips into one composite
/// action of independent overwrite-moves, recorded as a single undo
/// group. `None` when nothing needs to move.
pub fn resync_group_action(seq: &Sequence, items: &[ResyncItem]) -> Option<EditAction> {
    let edits: Vec<Edit> = items
        .iter()
        .filter_map(|item| resync_edit(seq, item))
        .collect();
    if edits.is_empty() {
        None
    } else {
        Some(EditAction::composite(edits))
    }
}

/// Number of frames a child's current position misses its offset by.
pub fn drift(seq: &Sequence, track: usize, index: usize) -> Option<i64> {
    let clip = seq.track(track)?.clip_at(index)?;
    match clip.sync.as_ref()?.state {
        SyncState::OutOfSync(delta) => Some(delta),
        SyncState::InSync => Some(0),
        SyncState::MasterGone => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────
