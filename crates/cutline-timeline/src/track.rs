//! Track: the dual-representation clip container.
//!
//! A track owns two views of the same timeline data: the shadow list
//! (`Vec<Clip>`, used for all bookkeeping) and the native playlist
//! (authoritative for playback). The four atomic primitives below are the
//! only operations that mutate either one, and each touches both in the
//! same call, so the representations cannot drift apart. Composite edit
//! algorithms are written purely in terms of these primitives.

use cutline_engine::{EngineEntry, NativePlaylist};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clip::Clip;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// How much editing a track currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackFreedom {
    /// All edits allowed.
    Free,
    /// No edits allowed.
    Locked,
    /// Only edits that keep sync children aligned.
    SyncLocked,
}

/// A track containing clips and blanks, mirrored into the native engine.
#[derive(Debug)]
pub struct Track {
    /// Unique track ID
    pub id: Uuid,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Editing freedom; enforcement is the command layer's job
    pub freedom: TrackFreedom,
    /// Is track muted
    pub muted: bool,
    /// Shadow list; mirrors the native playlist entry for entry
    clips: Vec<Clip>,
    /// Native ordered-list structure
    playlist: Box<dyn NativePlaylist>,
    /// Set by the primitives, drained by the sync engine
    dirty: bool,
}

impl Track {
    /// Create an empty track over a freshly created native playlist.
    pub fn new(kind: TrackKind, name: impl Into<String>, playlist: Box<dyn NativePlaylist>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            freedom: TrackFreedom::Free,
            muted: false,
            clips: Vec::new(),
            playlist,
            dirty: false,
        }
    }

    // ── Atomic mutation primitives ──────────────────────────────

    /// Append `clip` with the given inclusive bounds.
    pub fn append_clip(&mut self, mut clip: Clip, clip_in: i64, clip_out: i64) {
        clip.clip_in = clip_in;
        clip.clip_out = clip_out;
        self.playlist
            .insert(clip.id, self.clips.len(), clip_in, clip_out);
        self.clips.push(clip);
        self.dirty = true;
    }

    /// Insert `clip` at `index` with the given inclusive bounds.
    pub fn insert_clip(&mut self, index: usize, mut clip: Clip, clip_in: i64, clip_out: i64) {
        let index = index.min(self.clips.len());
        clip.clip_in = clip_in;
        clip.clip_out = clip_out;
        self.playlist.insert(clip.id, index, clip_in, clip_out);
        self.clips.insert(index, clip);
        self.dirty = true;
    }

    /// Insert a gap of `length` frames at `index`.
    ///
    /// The native insert takes the blank's last frame (`length - 1`,
    /// exclusive-end convention); the correction happens here and nowhere
    /// else.
    pub fn insert_blank(&mut self, index: usize, length: i64) {
        let index = index.min(self.clips.len());
        self.playlist.insert_blank(index, length - 1);
        self.clips.insert(index, Clip::blank(length));
        self.dirty = true;
    }

    /// Remove and return the entry at `index` from both representations.
    ///
    /// `None` when `index` is past the end: redundant removals are an
    /// expected no-op in composite algorithms (a moved range may already
    /// have been track-final), never an error.
    pub fn remove_clip(&mut self, index: usize) -> Option<Clip> {
        if index >= self.clips.len() {
            return None;
        }
        self.playlist.remove(index);
        self.dirty = true;
        Some(self.clips.remove(index))
    }

    // ── Shadow-list queries ─────────────────────────────────────

    /// Number of entries (clips and blanks).
    pub fn entry_count(&self) -> usize {
        self.clips.len()
    }

    /// All entries in timeline order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Entry at `index`.
    pub fn clip_at(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    /// Entry at `index`, mutably. Crate-internal: bounds changes must go
    /// through the primitives, so this is only for non-structural fields
    /// (sync data, color, filters).
    pub(crate) fn clip_at_mut(&mut self, index: usize) -> Option<&mut Clip> {
        self.clips.get_mut(index)
    }

    /// Find an entry by clip id.
    pub fn find_clip_index(&self, id: Uuid) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    /// Number of media clips (excluding blanks).
    pub fn clip_count(&self) -> usize {
        self.clips.iter().filter(|c| !c.is_blank()).count()
    }

    /// Sum of shadow-list entry lengths. Equals [`Track::get_length`] at
    /// every quiescent point; tests assert this after each operation.
    pub fn shadow_length(&self) -> i64 {
        self.clips.iter().map(Clip::length).sum()
    }

    // ── Native-structure queries ────────────────────────────────

    /// Authoritative track length in frames.
    pub fn get_length(&self) -> i64 {
        self.playlist.get_length()
    }

    /// Index of the entry containing `frame`, or `None` past the end.
    pub fn clip_index_at(&self, frame: i64) -> Option<usize> {
        self.playlist.get_clip_index_at(frame)
    }

    /// Timeline frame the entry at `index` starts on.
    pub fn clip_start(&self, index: usize) -> i64 {
        self.playlist.clip_start(index)
    }

    /// Native entry at `index`, for lockstep verification in tests.
    pub fn native_entry(&self, index: usize) -> Option<EngineEntry> {
        self.playlist.entry(index)
    }

    /// True when edits are currently allowed on this track.
    pub fn is_editable(&self) -> bool {
        self.freedom == TrackFreedom::Free
    }

    /// Drain the structural-change flag set by the primitives.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
