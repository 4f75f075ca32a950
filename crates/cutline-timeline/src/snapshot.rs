//! Serde snapshot types for the external persistence collaborator.
//!
//! This core owns no file format. A snapshot is the serializable view of
//! a sequence; loading one rebuilds the native playlists by replaying
//! the atomic primitives and re-attaches the compositors with a restack.

use cutline_core::{CutlineError, FrameRate, Result};
use cutline_engine::PlaybackEngine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::Clip;
use crate::compositor::{Compositor, CompositorKind, DestroyId};
use crate::sequence::{CompositingMode, Sequence};
use crate::track::{Track, TrackFreedom, TrackKind};

/// Serializable view of one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: Uuid,
    pub name: String,
    pub kind: TrackKind,
    pub freedom: TrackFreedom,
    pub muted: bool,
    pub clips: Vec<Clip>,
}

/// Serializable view of one compositor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositorSnapshot {
    pub destroy_id: DestroyId,
    pub kind: CompositorKind,
    pub a_track: usize,
    pub b_track: usize,
    pub clip_in: i64,
    pub clip_out: i64,
}

/// Serializable view of a sequence. The edit history is deliberately not
/// part of it; a loaded sequence starts with a fresh history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub id: Uuid,
    pub name: String,
    pub frame_rate: FrameRate,
    pub compositing_mode: CompositingMode,
    pub next_destroy_id: DestroyId,
    pub tracks: Vec<TrackSnapshot>,
    pub compositors: Vec<CompositorSnapshot>,
}

impl Sequence {
    /// Capture the serializable state of this sequence.
    pub fn snapshot(&self) -> SequenceSnapshot {
        SequenceSnapshot {
            id: self.id,
            name: self.name.clone(),
            frame_rate: self.frame_rate,
            compositing_mode: self.compositing_mode(),
            next_destroy_id: self.next_destroy_id_hint(),
            tracks: self
                .tracks()
                .iter()
                .map(|t| TrackSnapshot {
                    id: t.id,
                    name: t.name.clone(),
                    kind: t.kind,
                    freedom: t.freedom,
                    muted: t.muted,
                    clips: t.clips().to_vec(),
                })
                .collect(),
            compositors: self
                .compositors()
                .iter()
                .map(|c| CompositorSnapshot {
                    destroy_id: c.destroy_id,
                    kind: c.kind,
                    a_track: c.a_track,
                    b_track: c.b_track,
                    clip_in: c.clip_in,
                    clip_out: c.clip_out,
                })
                .collect(),
        }
    }

    /// Rebuild a sequence from a snapshot over a fresh engine.
    ///
    /// Native playlists are reconstructed entry by entry through the
    /// primitives, so the lockstep invariant holds from the first frame.
    pub fn from_snapshot(
        snapshot: SequenceSnapshot,
        mut engine: Box<dyn PlaybackEngine>,
    ) -> Result<Sequence> {
        let mut tracks = Vec::with_capacity(snapshot.tracks.len());
        for ts in &snapshot.tracks {
            let mut track = Track::new(ts.kind, ts.name.clone(), engine.create_playlist());
            track.id = ts.id;
            track.freedom = ts.freedom;
            track.muted = ts.muted;
            for clip in &ts.clips {
                if clip.is_blank() {
                    track.insert_blank(track.entry_count(), clip.length());
                } else {
                    track.append_clip(clip.clone(), clip.clip_in, clip.clip_out);
                }
            }
            tracks.push(track);
        }

        let mut seq = Sequence::from_parts(
            snapshot.id,
            snapshot.name,
            snapshot.frame_rate,
            tracks,
            engine,
            snapshot.compositing_mode,
            snapshot.next_destroy_id,
        );

        for cs in &snapshot.compositors {
            if cs.a_track >= seq.tracks().len() || cs.b_track >= seq.tracks().len() {
                return Err(CutlineError::Serialization(format!(
                    "compositor {} references a missing track",
                    cs.destroy_id
                )));
            }
            seq.push_compositor_raw(Compositor::new(
                cs.destroy_id,
                cs.kind,
                cs.a_track,
                cs.b_track,
                cs.clip_in,
                cs.clip_out,
            ));
        }
        seq.restack_compositors();
        Ok(seq)
    }
}
