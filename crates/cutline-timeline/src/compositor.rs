//! Compositors: cross-track overlays with a persistent identity.

use cutline_engine::{CompositorDesc, CompositorHandle};
use serde::{Deserialize, Serialize};

/// Stable compositor identity, issued by the owning sequence.
///
/// Restacking tears every compositor down and recreates it, so native
/// handles and object addresses do not survive. Any reference held across
/// a restack must be this id.
pub type DestroyId = u64;

/// Compositor type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositorKind {
    Dissolve,
    Affine,
    PictureInPicture,
    Wipe,
}

impl CompositorKind {
    /// Engine-facing type name.
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Dissolve => "dissolve",
            Self::Affine => "affine",
            Self::PictureInPicture => "picture_in_picture",
            Self::Wipe => "wipe",
        }
    }
}

/// A cross-track overlay bound to a frame range.
#[derive(Debug, Clone)]
pub struct Compositor {
    /// Stable identity surviving restacks
    pub destroy_id: DestroyId,
    /// Compositor type
    pub kind: CompositorKind,
    /// Destination (lower) track index
    pub a_track: usize,
    /// Source (upper) track index
    pub b_track: usize,
    /// First active frame (inclusive)
    pub clip_in: i64,
    /// Last active frame (inclusive)
    pub clip_out: i64,
    /// Native handle while attached; invalidated by every restack
    pub(crate) handle: Option<CompositorHandle>,
}

impl Compositor {
    /// Create a detached compositor.
    pub(crate) fn new(
        destroy_id: DestroyId,
        kind: CompositorKind,
        a_track: usize,
        b_track: usize,
        clip_in: i64,
        clip_out: i64,
    ) -> Self {
        Self {
            destroy_id,
            kind,
            a_track,
            b_track,
            clip_in,
            clip_out,
            handle: None,
        }
    }

    /// True while attached to the engine.
    pub fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Descriptor for (re-)attaching this compositor.
    pub(crate) fn desc(&self) -> CompositorDesc {
        CompositorDesc {
            kind: self.kind.engine_name().to_string(),
            a_track: self.a_track,
            b_track: self.b_track,
            clip_in: self.clip_in,
            clip_out: self.clip_out,
        }
    }
}
