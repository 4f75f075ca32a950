//! Clip types for the timeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a media source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Path to the media file
    pub path: String,
    /// Source length in frames
    pub media_length: i64,
}

impl SourceRef {
    /// Create a new source reference.
    pub fn new(path: impl Into<String>, media_length: i64) -> Self {
        Self {
            path: path.into(),
            media_length,
        }
    }
}

/// Opaque reference to a filter instance owned by the effects layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRef {
    /// Filter instance id
    pub id: Uuid,
    /// Filter name as the effects layer knows it
    pub name: String,
}

/// Color tag shown on the clip in the timeline UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipColor {
    Red,
    Orange,
    Green,
    Blue,
    Purple,
}

/// Whether a child clip still holds its offset to its master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Position offset to the master matches the stored offset.
    InSync,
    /// Drifted by the contained frame delta.
    OutOfSync(i64),
    /// The master clip is no longer on the timeline.
    MasterGone,
}

/// Relation of a child clip to its master clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncData {
    /// Frame offset the child must keep relative to the master.
    pub pos_offset: i64,
    /// Master clip id.
    pub master_clip: Uuid,
    /// Last computed sync state (cosmetic, recomputed after every edit).
    pub state: SyncState,
}

impl SyncData {
    /// Create a relation in the in-sync state.
    pub fn new(pos_offset: i64, master_clip: Uuid) -> Self {
        Self {
            pos_offset,
            master_clip,
            state: SyncState::InSync,
        }
    }
}

/// A clip on the timeline, or a blank gap.
///
/// A blank is a clip with no media reference: `clip_in` is always 0 and
/// the length is carried by `clip_out`. Blanks are never resized in
/// place; resizing means remove-and-reinsert a fresh blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: Uuid,
    /// Clip name (displayed in UI)
    pub name: String,
    /// Media source; `None` makes this a blank
    pub source: Option<SourceRef>,
    /// First source frame on the timeline (inclusive)
    pub clip_in: i64,
    /// Last source frame on the timeline (inclusive)
    pub clip_out: i64,
    /// Color tag
    pub color: Option<ClipColor>,
    /// Relation to a master clip, when position-locked to one
    pub sync: Option<SyncData>,
    /// Filter muting this clip's audio, when set
    pub mute_filter: Option<FilterRef>,
    /// Filters applied to this clip (owned opaquely by the effects layer)
    pub filters: Vec<FilterRef>,
}

impl Clip {
    /// Create a new clip covering the whole source.
    pub fn new(name: impl Into<String>, source: SourceRef) -> Self {
        let clip_out = source.media_length - 1;
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source: Some(source),
            clip_in: 0,
            clip_out,
            color: None,
            sync: None,
            mute_filter: None,
            filters: Vec::new(),
        }
    }

    /// Create a blank of the given length.
    pub fn blank(length: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            source: None,
            clip_in: 0,
            clip_out: length - 1,
            color: None,
            sync: None,
            mute_filter: None,
            filters: Vec::new(),
        }
    }

    /// True when this clip is a gap.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.source.is_none()
    }

    /// Length in frames (inclusive bounds).
    #[inline]
    pub fn length(&self) -> i64 {
        self.clip_out - self.clip_in + 1
    }
}
