//! Edit operations with undo/redo support.
//!
//! Every mutation is an [`Edit`] variant carrying its own typed data bag,
//! with a symmetric `apply`/`unapply` pair built purely from the four
//! atomic track primitives. [`EditAction`] wraps an edit with the
//! editor-state flags and the blank-normalization record; the sequence
//! runs actions through a strictly linear history.
//!
//! Trailing-blank normalization happens here, outside the individual
//! apply/unapply bodies, so every edit kind gets it without having to
//! remember it: the forward pass strips blanks off track ends and the
//! inverse pass restores them before unapplying. Blank consolidation is
//! deliberately not automatic (adjacent gaps are a legitimate timeline
//! state and blank cuts depend on them); the consolidate edits share the
//! helpers below instead. Trim edits manage clip bounds without
//! structural changes and opt out via `normalize_blanks`.

use cutline_core::{CutlineError, Result};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::clip::{Clip, SyncData};
use crate::compositor::{Compositor, CompositorKind, DestroyId};
use crate::sequence::Sequence;
use crate::track::Track;

// ── Action lifecycle ────────────────────────────────────────────

/// Lifecycle of an [`EditAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Constructed, not yet applied.
    Unregistered,
    /// On the undo side of the history; apply has run at least once.
    Applied,
    /// Undone; may be redone or discarded by a new edit.
    Superseded,
}

// ── Edge cuts shared by the overwrite family ────────────────────

/// Pre-cut bounds of an entry split by a range boundary.
#[derive(Debug, Clone, Copy)]
struct EdgeCut {
    orig_in: i64,
    orig_out: i64,
    is_blank: bool,
}

impl EdgeCut {
    fn orig_len(&self) -> i64 {
        self.orig_out - self.orig_in + 1
    }
}

/// Cut the entry containing `frame` in two.
///
/// Returns `None` when `frame` already lies on an entry boundary or past
/// the track end: the documented no-op outcome, not an error. The left
/// half keeps the original clip id; the right half is a fresh clone on
/// first use and is taken from `reuse` on later redos so undo→redo keeps
/// ids stable. Blanks split blank-wise, no clone involved.
fn cut_edge(track: &mut Track, frame: i64, reuse: &mut Option<Clip>) -> Option<(usize, EdgeCut)> {
    let index = track.clip_index_at(frame)?;
    let start = track.clip_start(index);
    if frame == start {
        return None;
    }
    let offset = frame - start;
    let left = track.remove_clip(index)?;
    let edge = EdgeCut {
        orig_in: left.clip_in,
        orig_out: left.clip_out,
        is_blank: left.is_blank(),
    };
    if edge.is_blank {
        track.insert_blank(index, offset);
        track.insert_blank(index + 1, edge.orig_len() - offset);
    } else {
        let right = reuse.take().unwrap_or_else(|| {
            let mut clone = left.clone();
            clone.id = Uuid::new_v4();
            clone
        });
        let split = edge.orig_in + offset;
        track.insert_clip(index, left, edge.orig_in, split - 1);
        track.insert_clip(index + 1, right, split, edge.orig_out);
    }
    Some((index, edge))
}

// ── Range cut machinery ─────────────────────────────────────────

/// Captured state of one destination-range splice, the common core of
/// the overwrite family. Opaque; owned by the edit's data bag.
#[derive(Debug, Default)]
pub struct RangeCutState {
    in_index: usize,
    /// Length of the blank appended because the range started past the
    /// track end. Implies no cuts and nothing displaced.
    pad: Option<i64>,
    in_cut: Option<EdgeCut>,
    out_cut: Option<EdgeCut>,
    /// Both boundaries fell inside the same original entry.
    nested: bool,
    /// Everything spliced out of the range, cut fragments included.
    removed: Vec<Clip>,
    /// Fragment clones kept across undo so redo reuses their ids.
    in_fragment: Option<Clip>,
    out_fragment: Option<Clip>,
}

impl RangeCutState {
    /// Entries spliced out of the range (in-range cut fragments included).
    pub fn removed(&self) -> &[Clip] {
        &self.removed
    }
}

/// Open the inclusive range `[in_frame, out_frame]` on `track`: pad if it
/// starts past the end, cut both boundaries unless already on cuts, and
/// splice out everything in between.
fn range_cut(
    track: &mut Track,
    in_frame: i64,
    out_frame: i64,
    prev: Option<RangeCutState>,
) -> RangeCutState {
    let (mut in_reuse, mut out_reuse) = match prev {
        Some(p) => (p.in_fragment, p.out_fragment),
        None => (None, None),
    };
    let old_len = track.get_length();
    let pad = if in_frame > old_len {
        let gap = in_frame - old_len;
        track.insert_blank(track.entry_count(), gap);
        Some(gap)
    } else {
        None
    };
    let in_cut = cut_edge(track, in_frame, &mut in_reuse).map(|(_, e)| e);
    let out_cut = cut_edge(track, out_frame + 1, &mut out_reuse).map(|(_, e)| e);
    let in_index = track
        .clip_index_at(in_frame)
        .unwrap_or_else(|| track.entry_count());
    let out_index = track
        .clip_index_at(out_frame + 1)
        .unwrap_or_else(|| track.entry_count());
    let mut removed = Vec::with_capacity(out_index - in_index);
    for _ in in_index..out_index {
        if let Some(clip) = track.remove_clip(in_index) {
            removed.push(clip);
        }
    }
    let nested = in_cut.is_some() && out_cut.is_some() && removed.len() == 1;
    RangeCutState {
        in_index,
        pad,
        in_cut,
        out_cut,
        nested,
        removed,
        in_fragment: in_reuse,
        out_fragment: out_reuse,
    }
}

/// Reinsert a clip with the bounds it already carries.
fn reinsert(track: &mut Track, index: usize, clip: Clip) {
    if clip.is_blank() {
        track.insert_blank(index, clip.length());
    } else {
        let (clip_in, clip_out) = (clip.clip_in, clip.clip_out);
        track.insert_clip(index, clip, clip_in, clip_out);
    }
}

/// Reverse a [`range_cut`]. The caller has already removed whatever it
/// inserted at `insert_index`. Re-fuses the cut halves to their pre-cut
/// lengths (fresh blanks where the split entry was a blank) and restores
/// the displaced entries in their original order.
fn range_restore(track: &mut Track, state: &mut RangeCutState) {
    let mut removed = std::mem::take(&mut state.removed);

    if state.pad.is_some() {
        // Nothing pre-existing was displaced; drop the pad debris. The
        // pad may already be gone when it was trailing, hence the soft
        // removal.
        if state.in_index > 0 {
            track.remove_clip(state.in_index - 1);
        }
        return;
    }

    if state.nested {
        // Both boundaries hit one entry: the bag holds the middle
        // fragment, the track holds the left half and the tail fragment.
        let tail = track.remove_clip(state.in_index);
        let middle = removed.pop();
        let left = track.remove_clip(state.in_index - 1);
        if let Some(edge) = state.in_cut {
            if edge.is_blank {
                track.insert_blank(state.in_index - 1, edge.orig_len());
            } else {
                state.out_fragment = tail;
                state.in_fragment = middle;
                if let Some(left) = left {
                    track.insert_clip(state.in_index - 1, left, edge.orig_in, edge.orig_out);
                }
            }
        }
        return;
    }

    if let Some(edge) = state.out_cut {
        // The surviving tail fragment shrinks away; the left half from
        // the bag comes back at its pre-cut length.
        let tail = track.remove_clip(state.in_index);
        let left = removed.pop();
        if edge.is_blank {
            track.insert_blank(state.in_index, edge.orig_len());
        } else {
            state.out_fragment = tail;
            if let Some(left) = left {
                track.insert_clip(state.in_index, left, edge.orig_in, edge.orig_out);
            }
        }
    }

    if let Some(edge) = state.in_cut {
        let fragment = if removed.is_empty() {
            None
        } else {
            Some(removed.remove(0))
        };
        let left = track.remove_clip(state.in_index - 1);
        if edge.is_blank {
            track.insert_blank(state.in_index - 1, edge.orig_len());
        } else {
            state.in_fragment = fragment;
            if let Some(left) = left {
                track.insert_clip(state.in_index - 1, left, edge.orig_in, edge.orig_out);
            }
        }
    }

    for (k, clip) in removed.into_iter().enumerate() {
        reinsert(track, state.in_index + k, clip);
    }
}

// ── Blank normalization ─────────────────────────────────────────

/// One run of adjacent blanks merged into a single blank.
#[derive(Debug, Clone)]
pub struct BlankRun {
    track: usize,
    index: usize,
    lengths: SmallVec<[i64; 4]>,
}

/// A trailing blank stripped off a track end.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrailingBlank {
    track: usize,
    length: i64,
}

/// Merge every run of adjacent blanks on one track starting at `index`.
/// Returns the original lengths, empty when there was nothing to merge.
fn consolidate_run(track: &mut Track, index: usize) -> SmallVec<[i64; 4]> {
    let mut lengths: SmallVec<[i64; 4]> = SmallVec::new();
    loop {
        let Some(len) = track
            .clip_at(index + lengths.len())
            .filter(|c| c.is_blank())
            .map(Clip::length)
        else {
            break;
        };
        lengths.push(len);
    }
    if lengths.len() < 2 {
        lengths.clear();
        return lengths;
    }
    let total = lengths.iter().sum();
    for _ in 0..lengths.len() {
        track.remove_clip(index);
    }
    track.insert_blank(index, total);
    lengths
}

/// Merge adjacent blanks on every track. Non-adjacent blanks are left
/// alone. Records are ordered left-to-right per track.
pub(crate) fn consolidate_all_blanks(seq: &mut Sequence) -> Vec<BlankRun> {
    let mut runs = Vec::new();
    for ti in 0..seq.tracks.len() {
        let track = &mut seq.tracks[ti];
        let mut i = 0;
        while i < track.entry_count() {
            let lengths = consolidate_run(track, i);
            if !lengths.is_empty() {
                runs.push(BlankRun {
                    track: ti,
                    index: i,
                    lengths,
                });
            }
            i += 1;
        }
    }
    runs
}

/// Undo [`consolidate_all_blanks`]: reinsert the original per-run blank
/// lengths in their original order, last run first so indices stay valid.
pub(crate) fn reverse_consolidation(seq: &mut Sequence, runs: Vec<BlankRun>) {
    for run in runs.into_iter().rev() {
        let track = &mut seq.tracks[run.track];
        track.remove_clip(run.index);
        for (k, len) in run.lengths.iter().enumerate() {
            track.insert_blank(run.index + k, *len);
        }
    }
}

/// Strip blanks off every track end, recording them for restoration.
pub(crate) fn strip_trailing_blanks(seq: &mut Sequence) -> SmallVec<[TrailingBlank; 2]> {
    let mut stripped: SmallVec<[TrailingBlank; 2]> = SmallVec::new();
    for (ti, track) in seq.tracks.iter_mut().enumerate() {
        loop {
            let n = track.entry_count();
            let Some(length) = track
                .clip_at(n.wrapping_sub(1))
                .filter(|c| c.is_blank())
                .map(Clip::length)
            else {
                break;
            };
            track.remove_clip(n - 1);
            stripped.push(TrailingBlank { track: ti, length });
        }
    }
    stripped
}

/// Put stripped trailing blanks back, innermost first.
pub(crate) fn restore_trailing_blanks(seq: &mut Sequence, stripped: &[TrailingBlank]) {
    for rec in stripped.iter().rev() {
        let track = &mut seq.tracks[rec.track];
        track.insert_blank(track.entry_count(), rec.length);
    }
}

// ── Edit variants ───────────────────────────────────────────────

/// Outcome of a cut, captured on first apply.
#[derive(Debug)]
pub enum CutOutcome {
    /// The frame was already on an entry boundary; the cut (and its undo)
    /// is a no-op.
    Boundary,
    /// The entry at `index` was split.
    Split {
        index: usize,
        edge: EdgeCutData,
        /// Right half while owned by the bag (between undo and redo).
        right: Option<Clip>,
    },
}

/// Public mirror of the edge-cut record inside [`CutOutcome`].
#[derive(Debug, Clone, Copy)]
pub struct EdgeCutData {
    orig_in: i64,
    orig_out: i64,
    is_blank: bool,
}

/// Lift-and-drop state of an overwrite move.
#[derive(Debug)]
pub struct MoveState {
    lifted_count: usize,
    range: RangeCutState,
}

/// A reversible edit operation on the timeline.
///
/// Every variant's `apply` and `unapply` are symmetric sequences of the
/// four atomic primitives; data captured during apply lives in the
/// variant's own fields ("populated when the edit is executed").
#[derive(Debug)]
pub enum Edit {
    /// Append a clip at the track end.
    Append {
        track: usize,
        /// Taken on apply, returned on unapply.
        clip: Option<Clip>,
        clip_in: i64,
        clip_out: i64,
    },
    /// Insert a clip at `index`.
    Insert {
        track: usize,
        index: usize,
        clip: Option<Clip>,
        clip_in: i64,
        clip_out: i64,
    },
    /// Remove `count` consecutive entries starting at `index`.
    RemoveMultiple {
        track: usize,
        index: usize,
        count: usize,
        /// Stored for undo — populated when the edit is executed.
        removed: Vec<Clip>,
    },
    /// Split the entry containing `frame` at that frame.
    Cut {
        track: usize,
        frame: i64,
        /// Populated on first apply.
        outcome: Option<CutOutcome>,
    },
    /// Overwrite the destination range with one new clip (3-point edit).
    ThreePointOverwrite {
        track: usize,
        dst_in: i64,
        clip: Option<Clip>,
        clip_in: i64,
        clip_out: i64,
        range: Option<RangeCutState>,
    },
    /// Lift entries `[first, last]` and drop them at `dst_in`,
    /// overwriting the destination range.
    OverwriteMove {
        track: usize,
        to_track: usize,
        first: usize,
        last: usize,
        dst_in: i64,
        state: Option<MoveState>,
    },
    /// Splice a frame range out into the bag, leaving a gap of the same
    /// length (non-destructive range extraction).
    ExtractRange {
        track: usize,
        in_frame: i64,
        out_frame: i64,
        range: Option<RangeCutState>,
    },
    /// Move a clip's in point by `delta` frames.
    TrimStart { track: usize, index: usize, delta: i64 },
    /// Move a clip's out point by `delta` frames.
    TrimEnd { track: usize, index: usize, delta: i64 },
    /// Merge the run of adjacent blanks starting at `index`.
    ConsolidateBlanks {
        track: usize,
        index: usize,
        /// Original per-run lengths; empty = nothing merged.
        lengths: SmallVec<[i64; 4]>,
    },
    /// Merge every run of adjacent blanks on every track.
    ConsolidateAllBlanks { runs: Vec<BlankRun> },
    /// Create a compositor. The destroy id is assigned on first apply
    /// and reused on redo so references stay valid.
    AddCompositor {
        kind: CompositorKind,
        a_track: usize,
        b_track: usize,
        clip_in: i64,
        clip_out: i64,
        destroy_id: Option<DestroyId>,
    },
    /// Remove a compositor by destroy id.
    RemoveCompositor {
        destroy_id: DestroyId,
        removed: Option<Compositor>,
    },
    /// Position-lock the child clip to a master clip at the current
    /// offset.
    SetSyncRelation {
        track: usize,
        index: usize,
        master_track: usize,
        master_index: usize,
        /// Previous relation, captured on apply.
        prev: Option<Option<SyncData>>,
    },
    /// Break the child clip's relation to its master.
    ClearSyncRelation {
        track: usize,
        index: usize,
        prev: Option<SyncData>,
    },
    /// An ordered batch applied as one undo group.
    Composite(Vec<Edit>),
}

fn track_mut(seq: &mut Sequence, index: usize) -> Result<&mut Track> {
    seq.tracks
        .get_mut(index)
        .ok_or(CutlineError::TrackOutOfRange(index))
}

impl Edit {
    /// Run this edit forward.
    pub(crate) fn apply(&mut self, seq: &mut Sequence) -> Result<()> {
        match self {
            Edit::Append {
                track,
                clip,
                clip_in,
                clip_out,
            } => {
                let clip = clip
                    .take()
                    .ok_or_else(|| CutlineError::Internal("append clip already placed".into()))?;
                track_mut(seq, *track)?.append_clip(clip, *clip_in, *clip_out);
                Ok(())
            }
            Edit::Insert {
                track,
                index,
                clip,
                clip_in,
                clip_out,
            } => {
                let clip = clip
                    .take()
                    .ok_or_else(|| CutlineError::Internal("insert clip already placed".into()))?;
                let track = track_mut(seq, *track)?;
                // Record the effective index so the inverse targets the
                // entry that was actually created.
                *index = (*index).min(track.entry_count());
                track.insert_clip(*index, clip, *clip_in, *clip_out);
                Ok(())
            }
            Edit::RemoveMultiple {
                track,
                index,
                count,
                removed,
            } => {
                let track = track_mut(seq, *track)?;
                removed.clear();
                for _ in 0..*count {
                    if let Some(clip) = track.remove_clip(*index) {
                        removed.push(clip);
                    }
                }
                Ok(())
            }
            Edit::Cut {
                track,
                frame,
                outcome,
            } => {
                let mut reuse = match outcome.take() {
                    Some(CutOutcome::Split { right, .. }) => right,
                    _ => None,
                };
                let track = track_mut(seq, *track)?;
                *outcome = Some(match cut_edge(track, *frame, &mut reuse) {
                    None => CutOutcome::Boundary,
                    Some((index, edge)) => CutOutcome::Split {
                        index,
                        edge: EdgeCutData {
                            orig_in: edge.orig_in,
                            orig_out: edge.orig_out,
                            is_blank: edge.is_blank,
                        },
                        right: None,
                    },
                });
                Ok(())
            }
            Edit::ThreePointOverwrite {
                track,
                dst_in,
                clip,
                clip_in,
                clip_out,
                range,
            } => {
                let clip = clip
                    .take()
                    .ok_or_else(|| CutlineError::Internal("overwrite clip already placed".into()))?;
                let length = *clip_out - *clip_in + 1;
                let track = track_mut(seq, *track)?;
                let state = range_cut(track, *dst_in, *dst_in + length - 1, range.take());
                track.insert_clip(state.in_index, clip, *clip_in, *clip_out);
                *range = Some(state);
                Ok(())
            }
            Edit::OverwriteMove {
                track,
                to_track,
                first,
                last,
                dst_in,
                state,
            } => {
                let prev = state.take().map(|s| s.range);
                let lifted = {
                    let src = track_mut(seq, *track)?;
                    let mut lifted = Vec::with_capacity(*last - *first + 1);
                    for _ in *first..=*last {
                        if let Some(clip) = src.remove_clip(*first) {
                            lifted.push(clip);
                        }
                    }
                    if lifted.is_empty() {
                        return Err(CutlineError::InvalidParameter(
                            "overwrite move source range is empty".into(),
                        ));
                    }
                    let lift_len = lifted.iter().map(Clip::length).sum();
                    src.insert_blank(*first, lift_len);
                    lifted
                };
                let lift_len: i64 = lifted.iter().map(Clip::length).sum();
                let dst = track_mut(seq, *to_track)?;
                let range = range_cut(dst, *dst_in, *dst_in + lift_len - 1, prev);
                let lifted_count = lifted.len();
                for (k, clip) in lifted.into_iter().enumerate() {
                    reinsert(dst, range.in_index + k, clip);
                }
                *state = Some(MoveState {
                    lifted_count,
                    range,
                });
                Ok(())
            }
            Edit::ExtractRange {
                track,
                in_frame,
                out_frame,
                range,
            } => {
                let track = track_mut(seq, *track)?;
                let state = range_cut(track, *in_frame, *out_frame, range.take());
                track.insert_blank(state.in_index, *out_frame - *in_frame + 1);
                *range = Some(state);
                Ok(())
            }
            Edit::TrimStart {
                track,
                index,
                delta,
            } => trim(seq, *track, *index, *delta, true),
            Edit::TrimEnd {
                track,
                index,
                delta,
            } => trim(seq, *track, *index, *delta, false),
            Edit::ConsolidateBlanks {
                track,
                index,
                lengths,
            } => {
                *lengths = consolidate_run(track_mut(seq, *track)?, *index);
                Ok(())
            }
            Edit::ConsolidateAllBlanks { runs } => {
                *runs = consolidate_all_blanks(seq);
                Ok(())
            }
            Edit::AddCompositor {
                kind,
                a_track,
                b_track,
                clip_in,
                clip_out,
                destroy_id,
            } => {
                match *destroy_id {
                    Some(id) => {
                        seq.add_compositor_with_id(id, *kind, *a_track, *b_track, *clip_in, *clip_out)?;
                    }
                    None => {
                        let id =
                            seq.add_compositor(*kind, *a_track, *b_track, *clip_in, *clip_out)?;
                        *destroy_id = Some(id);
                    }
                }
                Ok(())
            }
            Edit::RemoveCompositor {
                destroy_id,
                removed,
            } => {
                *removed = Some(seq.remove_compositor(*destroy_id)?);
                Ok(())
            }
            Edit::SetSyncRelation {
                track,
                index,
                master_track,
                master_index,
                prev,
            } => {
                let (master_id, master_in, master_start) = {
                    let mt = seq
                        .tracks
                        .get(*master_track)
                        .ok_or(CutlineError::TrackOutOfRange(*master_track))?;
                    let master = mt.clip_at(*master_index).ok_or_else(|| {
                        CutlineError::InvalidParameter("sync master index out of range".into())
                    })?;
                    if master.is_blank() {
                        return Err(CutlineError::InvalidParameter(
                            "blanks cannot be sync masters".into(),
                        ));
                    }
                    (master.id, master.clip_in, mt.clip_start(*master_index))
                };
                let child_track = track_mut(seq, *track)?;
                let child_start = child_track.clip_start(*index);
                let child = child_track.clip_at_mut(*index).ok_or_else(|| {
                    CutlineError::InvalidParameter("sync child index out of range".into())
                })?;
                if child.is_blank() {
                    return Err(CutlineError::InvalidParameter(
                        "blanks cannot be sync children".into(),
                    ));
                }
                if child.id == master_id {
                    return Err(CutlineError::InvalidParameter(
                        "clip cannot be its own sync master".into(),
                    ));
                }
                let pos_offset = (child_start - child.clip_in) - (master_start - master_in);
                *prev = Some(child.sync.replace(SyncData::new(pos_offset, master_id)));
                Ok(())
            }
            Edit::ClearSyncRelation { track, index, prev } => {
                let child = track_mut(seq, *track)?.clip_at_mut(*index).ok_or_else(|| {
                    CutlineError::InvalidParameter("sync child index out of range".into())
                })?;
                *prev = child.sync.take();
                Ok(())
            }
            Edit::Composite(edits) => {
                for edit in edits.iter_mut() {
                    edit.apply(seq)?;
                }
                Ok(())
            }
        }
    }

    /// Reverse this edit, assuming `apply` ran last.
    pub(crate) fn unapply(&mut self, seq: &mut Sequence) -> Result<()> {
        match self {
            Edit::Append { track, clip, .. } => {
                let track = track_mut(seq, *track)?;
                let n = track.entry_count();
                if n > 0 {
                    *clip = track.remove_clip(n - 1);
                }
                Ok(())
            }
            Edit::Insert {
                track, index, clip, ..
            } => {
                *clip = track_mut(seq, *track)?.remove_clip(*index);
                Ok(())
            }
            Edit::RemoveMultiple {
                track,
                index,
                removed,
                ..
            } => {
                let track = track_mut(seq, *track)?;
                for (k, clip) in std::mem::take(removed).into_iter().enumerate() {
                    reinsert(track, *index + k, clip);
                }
                Ok(())
            }
            Edit::Cut {
                track, outcome, ..
            } => {
                match outcome.take() {
                    None | Some(CutOutcome::Boundary) => {
                        // Boundary cuts have nothing to restore.
                        *outcome = Some(CutOutcome::Boundary);
                    }
                    Some(CutOutcome::Split { index, edge, .. }) => {
                        let track = track_mut(seq, *track)?;
                        let right = track.remove_clip(index + 1);
                        let left = track.remove_clip(index);
                        if edge.is_blank {
                            track.insert_blank(index, edge.orig_out - edge.orig_in + 1);
                        } else if let Some(left) = left {
                            track.insert_clip(index, left, edge.orig_in, edge.orig_out);
                        }
                        *outcome = Some(CutOutcome::Split {
                            index,
                            edge,
                            right: if edge.is_blank { None } else { right },
                        });
                    }
                }
                Ok(())
            }
            Edit::ThreePointOverwrite {
                track, clip, range, ..
            } => {
                let mut state = range
                    .take()
                    .ok_or_else(|| CutlineError::Internal("overwrite undone before apply".into()))?;
                let track = track_mut(seq, *track)?;
                *clip = track.remove_clip(state.in_index);
                range_restore(track, &mut state);
                *range = Some(state);
                Ok(())
            }
            Edit::OverwriteMove {
                track,
                to_track,
                first,
                state,
                ..
            } => {
                let mut st = state
                    .take()
                    .ok_or_else(|| CutlineError::Internal("move undone before apply".into()))?;
                let lifted = {
                    let dst = track_mut(seq, *to_track)?;
                    let mut lifted = Vec::with_capacity(st.lifted_count);
                    for _ in 0..st.lifted_count {
                        if let Some(clip) = dst.remove_clip(st.range.in_index) {
                            lifted.push(clip);
                        }
                    }
                    range_restore(dst, &mut st.range);
                    lifted
                };
                let src = track_mut(seq, *track)?;
                // The lift blank; already gone when it was track-final.
                src.remove_clip(*first);
                for (k, clip) in lifted.into_iter().enumerate() {
                    reinsert(src, *first + k, clip);
                }
                *state = Some(st);
                Ok(())
            }
            Edit::ExtractRange { track, range, .. } => {
                let mut state = range
                    .take()
                    .ok_or_else(|| CutlineError::Internal("extract undone before apply".into()))?;
                let track = track_mut(seq, *track)?;
                track.remove_clip(state.in_index);
                range_restore(track, &mut state);
                *range = Some(state);
                Ok(())
            }
            Edit::TrimStart {
                track,
                index,
                delta,
            } => trim(seq, *track, *index, -*delta, true),
            Edit::TrimEnd {
                track,
                index,
                delta,
            } => trim(seq, *track, *index, -*delta, false),
            Edit::ConsolidateBlanks {
                track,
                index,
                lengths,
            } => {
                if lengths.is_empty() {
                    return Ok(());
                }
                let track = track_mut(seq, *track)?;
                track.remove_clip(*index);
                for (k, len) in lengths.iter().enumerate() {
                    track.insert_blank(*index + k, *len);
                }
                Ok(())
            }
            Edit::ConsolidateAllBlanks { runs } => {
                reverse_consolidation(seq, std::mem::take(runs));
                Ok(())
            }
            Edit::AddCompositor { destroy_id, .. } => {
                let id = destroy_id
                    .ok_or_else(|| CutlineError::Internal("compositor undone before apply".into()))?;
                seq.remove_compositor(id)?;
                Ok(())
            }
            Edit::RemoveCompositor { removed, .. } => {
                let compositor = removed
                    .take()
                    .ok_or_else(|| CutlineError::Internal("compositor undone before apply".into()))?;
                seq.reinsert_compositor(compositor);
                Ok(())
            }
            Edit::SetSyncRelation {
                track, index, prev, ..
            } => {
                let child = track_mut(seq, *track)?.clip_at_mut(*index).ok_or_else(|| {
                    CutlineError::InvalidParameter("sync child index out of range".into())
                })?;
                child.sync = prev
                    .take()
                    .ok_or_else(|| CutlineError::Internal("sync undone before apply".into()))?;
                Ok(())
            }
            Edit::ClearSyncRelation { track, index, prev } => {
                let child = track_mut(seq, *track)?.clip_at_mut(*index).ok_or_else(|| {
                    CutlineError::InvalidParameter("sync child index out of range".into())
                })?;
                child.sync = prev.take();
                Ok(())
            }
            Edit::Composite(edits) => {
                for edit in edits.iter_mut().rev() {
                    edit.unapply(seq)?;
                }
                Ok(())
            }
        }
    }

    /// Entries spliced out by the last apply of a range-family edit.
    pub fn extracted(&self) -> &[Clip] {
        match self {
            Edit::ExtractRange {
                range: Some(state), ..
            } => state.removed(),
            Edit::ThreePointOverwrite {
                range: Some(state), ..
            } => state.removed(),
            Edit::OverwriteMove {
                state: Some(st), ..
            } => st.range.removed(),
            _ => &[],
        }
    }
}

/// Remove the clip at `index` and reinsert it with the in or out point
/// moved by `delta`. Blanks are never resized in place, so trimming one
/// is an invalid parameter, not a resize.
fn trim(seq: &mut Sequence, track: usize, index: usize, delta: i64, at_start: bool) -> Result<()> {
    let track = track_mut(seq, track)?;
    let is_blank = track
        .clip_at(index)
        .map(Clip::is_blank)
        .ok_or_else(|| CutlineError::InvalidParameter("trim index out of range".into()))?;
    if is_blank {
        return Err(CutlineError::InvalidParameter(
            "blanks cannot be trimmed in place".into(),
        ));
    }
    let clip = track
        .remove_clip(index)
        .ok_or_else(|| CutlineError::InvalidParameter("trim index out of range".into()))?;
    let (new_in, new_out) = if at_start {
        (clip.clip_in + delta, clip.clip_out)
    } else {
        (clip.clip_in, clip.clip_out + delta)
    };
    if new_in < 0 || new_out < new_in {
        let (orig_in, orig_out) = (clip.clip_in, clip.clip_out);
        track.insert_clip(index, clip, orig_in, orig_out);
        return Err(CutlineError::InvalidParameter(format!(
            "trim delta {delta} leaves no clip"
        )));
    }
    if let Some(source) = &clip.source {
        if new_out >= source.media_length {
            let (orig_in, orig_out) = (clip.clip_in, clip.clip_out);
            track.insert_clip(index, clip, orig_in, orig_out);
            return Err(CutlineError::InvalidParameter(format!(
                "trim delta {delta} runs past the media end"
            )));
        }
    }
    track.insert_clip(index, clip, new_in, new_out);
    Ok(())
}

// ── EditAction ──────────────────────────────────────────────────

/// An edit bundled with its editor-state flags and normalization record.
///
/// Constructed by the per-kind factory functions, executed once through
/// [`Sequence::do_edit`], then replayed by undo/redo against the same
/// data bag. Clips removed by an apply are owned by the action until an
/// inverse pass reinserts them.
#[derive(Debug)]
pub struct EditAction {
    pub(crate) edit: Edit,
    /// Exit an active trim tool before applying.
    pub(crate) exit_trim_mode_on_edit: bool,
    /// Strip trailing blanks after the apply and restore them around the
    /// undo. Trim edits opt out; they manage clip bounds themselves.
    pub(crate) normalize_blanks: bool,
    /// Fully stop and restart the consumer around the mutation.
    pub(crate) stop_for_edit: bool,
    /// Trailing blanks the forward pass stripped, for exact restoration.
    stripped_blanks: Option<SmallVec<[TrailingBlank; 2]>>,
    state: ActionState,
}

impl EditAction {
    fn with_flags(edit: Edit, normalize_blanks: bool, stop_for_edit: bool) -> Self {
        Self {
            edit,
            exit_trim_mode_on_edit: true,
            normalize_blanks,
            stop_for_edit,
            stripped_blanks: None,
            state: ActionState::Unregistered,
        }
    }

    /// Wrap an edit with the default flags.
    pub fn new(edit: Edit) -> Self {
        Self::with_flags(edit, true, false)
    }

    // ── Factories, one per edit kind ────────────────────────────

    pub fn append(track: usize, clip: Clip, clip_in: i64, clip_out: i64) -> Self {
        Self::new(Edit::Append {
            track,
            clip: Some(clip),
            clip_in,
            clip_out,
        })
    }

    pub fn insert(track: usize, index: usize, clip: Clip, clip_in: i64, clip_out: i64) -> Self {
        Self::new(Edit::Insert {
            track,
            index,
            clip: Some(clip),
            clip_in,
            clip_out,
        })
    }

    pub fn remove_multiple(track: usize, index: usize, count: usize) -> Self {
        Self::new(Edit::RemoveMultiple {
            track,
            index,
            count,
            removed: Vec::new(),
        })
    }

    pub fn cut(track: usize, frame: i64) -> Self {
        Self::new(Edit::Cut {
            track,
            frame,
            outcome: None,
        })
    }

    pub fn three_point_overwrite(
        track: usize,
        dst_in: i64,
        clip: Clip,
        clip_in: i64,
        clip_out: i64,
    ) -> Self {
        Self::with_flags(
            Edit::ThreePointOverwrite {
                track,
                dst_in,
                clip: Some(clip),
                clip_in,
                clip_out,
                range: None,
            },
            true,
            true,
        )
    }

    pub fn overwrite_move(
        track: usize,
        to_track: usize,
        first: usize,
        last: usize,
        dst_in: i64,
    ) -> Self {
        Self::with_flags(
            Edit::OverwriteMove {
                track,
                to_track,
                first,
                last,
                dst_in,
                state: None,
            },
            true,
            true,
        )
    }

    pub fn extract_range(track: usize, in_frame: i64, out_frame: i64) -> Self {
        Self::with_flags(
            Edit::ExtractRange {
                track,
                in_frame,
                out_frame,
                range: None,
            },
            true,
            true,
        )
    }

    pub fn trim_start(track: usize, index: usize, delta: i64) -> Self {
        Self::with_flags(Edit::TrimStart { track, index, delta }, false, false)
    }

    pub fn trim_end(track: usize, index: usize, delta: i64) -> Self {
        Self::with_flags(Edit::TrimEnd { track, index, delta }, false, false)
    }

    pub fn consolidate_blanks(track: usize, index: usize) -> Self {
        Self::new(Edit::ConsolidateBlanks {
            track,
            index,
            lengths: SmallVec::new(),
        })
    }

    pub fn consolidate_all_blanks() -> Self {
        Self::new(Edit::ConsolidateAllBlanks { runs: Vec::new() })
    }

    pub fn add_compositor(
        kind: CompositorKind,
        a_track: usize,
        b_track: usize,
        clip_in: i64,
        clip_out: i64,
    ) -> Self {
        Self::new(Edit::AddCompositor {
            kind,
            a_track,
            b_track,
            clip_in,
            clip_out,
            destroy_id: None,
        })
    }

    pub fn remove_compositor(destroy_id: DestroyId) -> Self {
        Self::new(Edit::RemoveCompositor {
            destroy_id,
            removed: None,
        })
    }

    pub fn set_sync_relation(
        track: usize,
        index: usize,
        master_track: usize,
        master_index: usize,
    ) -> Self {
        Self::new(Edit::SetSyncRelation {
            track,
            index,
            master_track,
            master_index,
            prev: None,
        })
    }

    pub fn clear_sync_relation(track: usize, index: usize) -> Self {
        Self::new(Edit::ClearSyncRelation {
            track,
            index,
            prev: None,
        })
    }

    /// Batch several edits into one undo group (e.g. a group resync).
    pub fn composite(edits: Vec<Edit>) -> Self {
        Self::with_flags(Edit::Composite(edits), true, true)
    }

    // ── Introspection ───────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> ActionState {
        self.state
    }

    /// The wrapped edit.
    pub fn edit(&self) -> &Edit {
        &self.edit
    }

    // ── Engine passes ───────────────────────────────────────────

    /// Forward pass, shared by first execution and redo: clear the
    /// selection, apply, strip trailing blanks, recompute sync states.
    pub(crate) fn redo_pass(&mut self, seq: &mut Sequence) -> Result<()> {
        seq.listener.clear_selection();
        self.edit.apply(seq)?;
        if self.normalize_blanks {
            self.stripped_blanks = Some(strip_trailing_blanks(seq));
        }
        seq.recompute_sync_states();
        let length = seq.length();
        seq.listener.timeline_length_changed(length);
        self.state = ActionState::Applied;
        Ok(())
    }

    /// Inverse pass: restore the blanks the forward pass stripped so the
    /// unapply sees the exact post-apply layout, unapply, re-normalize.
    pub(crate) fn undo_pass(&mut self, seq: &mut Sequence) -> Result<()> {
        seq.listener.clear_selection();
        if let Some(stripped) = self.stripped_blanks.take() {
            restore_trailing_blanks(seq, &stripped);
        }
        self.edit.unapply(seq)?;
        if self.normalize_blanks {
            let _ = strip_trailing_blanks(seq);
        }
        seq.recompute_sync_states();
        let length = seq.length();
        seq.listener.timeline_length_changed(length);
        self.state = ActionState::Superseded;
        Ok(())
    }
}

// ── Edit history ────────────────────────────────────────────────

/// Linear undo/redo history: append on apply, truncate the redo tail on
/// a new edit after an undo.
#[derive(Debug, Default)]
pub(crate) struct EditStack {
    undo: Vec<EditAction>,
    redo: Vec<EditAction>,
}

impl EditStack {
    /// Register a freshly applied action, discarding any undone tail.
    pub(crate) fn push(&mut self, action: EditAction) {
        self.redo.clear();
        self.undo.push(action);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<EditAction> {
        self.undo.pop()
    }

    /// Park an undone action on the redo side.
    pub(crate) fn push_undone(&mut self, action: EditAction) {
        self.redo.push(action);
    }

    pub(crate) fn pop_redo(&mut self) -> Option<EditAction> {
        self.redo.pop()
    }

    /// Return a redone action to the undo side without touching the tail.
    pub(crate) fn push_redone(&mut self, action: EditAction) {
        self.undo.push(action);
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub(crate) fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub(crate) fn redo_count(&self) -> usize {
        self.redo.len()
    }

    pub(crate) fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────
