//! Cutline Engine - Native playback engine boundary
//!
//! The timeline core never talks to the real playback/render process
//! directly. It goes through two contracts defined here:
//! - [`NativePlaylist`]: the per-track ordered-list service
//! - [`PlaybackEngine`]: playlist factory, compositor attachment, transport
//!
//! [`MemoryEngine`] is an in-process implementation of both, faithful to
//! the native semantics (including the exclusive-end blank-insert
//! convention). It backs headless use and the test suites.

pub mod memory;
pub mod playlist;

pub use memory::{MemoryEngine, MemoryPlaylist};
pub use playlist::{EngineEntry, NativePlaylist};

use uuid::Uuid;

/// Stable handle to a compositor instance inside the engine.
///
/// Handles are invalidated by every restack; callers that need an identity
/// surviving re-creation must use the sequence-level destroy id instead.
pub type CompositorHandle = u64;

/// Everything the engine needs to instantiate a compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositorDesc {
    /// Compositor type name as the engine knows it (e.g. "dissolve").
    pub kind: String,
    /// Destination (lower) track index.
    pub a_track: usize,
    /// Source (upper) track index.
    pub b_track: usize,
    /// First frame the compositor is active on (inclusive).
    pub clip_in: i64,
    /// Last frame the compositor is active on (inclusive).
    pub clip_out: i64,
}

/// Playback engine contract: playlist factory, compositor host, transport.
///
/// The edit model is single-threaded; implementations are driven from the
/// one control thread and carry no `Send` bound.
pub trait PlaybackEngine: std::fmt::Debug {
    /// Create an empty ordered-list structure for one track.
    fn create_playlist(&mut self) -> Box<dyn NativePlaylist>;

    /// Instantiate and attach a compositor. Returns its transient handle.
    fn attach_compositor(&mut self, desc: CompositorDesc) -> CompositorHandle;

    /// Tear down an attached compositor. Returns false if the handle was
    /// already gone.
    fn detach_compositor(&mut self, handle: CompositorHandle) -> bool;

    /// Pause the consumer before a timeline mutation.
    fn stop_playback(&mut self);

    /// Fully stop the consumer for edits that are unsafe mid-playback.
    fn full_stop(&mut self);

    /// Restart the consumer after a `full_stop` edit completed.
    fn restart(&mut self);

    /// True while the consumer is running.
    fn is_playing(&self) -> bool;
}

/// Identifier the engine uses to resolve a media producer.
pub type ProducerId = Uuid;
