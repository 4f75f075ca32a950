//! Ordered-list service contract for one track.

use crate::ProducerId;

/// One entry as the native structure sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineEntry {
    /// Media producer backing the entry; `None` for a blank.
    pub producer: Option<ProducerId>,
    /// First source frame (inclusive).
    pub clip_in: i64,
    /// Last source frame (inclusive).
    pub clip_out: i64,
}

impl EngineEntry {
    /// Frame length of this entry.
    #[inline]
    pub fn length(&self) -> i64 {
        self.clip_out - self.clip_in + 1
    }

    /// True when this entry is a gap.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.producer.is_none()
    }
}

/// The per-track ordered-list service exposed by the native playback
/// engine. This is the authoritative timeline structure; the edit model
/// mirrors it with a shadow list and keeps both in lockstep.
pub trait NativePlaylist: std::fmt::Debug {
    /// Insert a media entry at `index` with inclusive source bounds.
    fn insert(&mut self, producer: ProducerId, index: usize, clip_in: i64, clip_out: i64);

    /// Insert a blank at `index`.
    ///
    /// `out` is the blank's last frame, i.e. `length - 1`: the native
    /// call takes one less than the desired length (exclusive-end
    /// convention). Callers own the correction.
    fn insert_blank(&mut self, index: usize, out: i64);

    /// Remove and return the entry at `index`; `None` when out of range.
    fn remove(&mut self, index: usize) -> Option<EngineEntry>;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Total length in frames.
    fn get_length(&self) -> i64;

    /// Index of the entry containing `frame`, or `None` past the end.
    fn get_clip_index_at(&self, frame: i64) -> Option<usize>;

    /// Timeline frame the entry at `index` starts on.
    fn clip_start(&self, index: usize) -> i64;

    /// Read-only peek at an entry. Exists so tests can verify the shadow
    /// list and this structure agree; edit code never needs it.
    fn entry(&self, index: usize) -> Option<EngineEntry>;
}
