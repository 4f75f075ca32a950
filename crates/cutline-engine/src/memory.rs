//! In-process reference implementation of the engine contracts.
//!
//! Faithful to the native semantics the timeline core is written against:
//! blank inserts take `length - 1`, removals past the end fail softly,
//! compositor handles are transient. Used headless and by the test suites.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::playlist::{EngineEntry, NativePlaylist};
use crate::{CompositorDesc, CompositorHandle, PlaybackEngine, ProducerId};

/// In-memory ordered-list structure for one track.
#[derive(Debug, Default)]
pub struct MemoryPlaylist {
    entries: Vec<EngineEntry>,
}

impl MemoryPlaylist {
    /// Create an empty playlist.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativePlaylist for MemoryPlaylist {
    fn insert(&mut self, producer: ProducerId, index: usize, clip_in: i64, clip_out: i64) {
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            EngineEntry {
                producer: Some(producer),
                clip_in,
                clip_out,
            },
        );
    }

    fn insert_blank(&mut self, index: usize, out: i64) {
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            EngineEntry {
                producer: None,
                clip_in: 0,
                clip_out: out,
            },
        );
    }

    fn remove(&mut self, index: usize) -> Option<EngineEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn get_length(&self) -> i64 {
        self.entries.iter().map(EngineEntry::length).sum()
    }

    fn get_clip_index_at(&self, frame: i64) -> Option<usize> {
        if frame < 0 {
            return None;
        }
        let mut pos = 0;
        for (i, entry) in self.entries.iter().enumerate() {
            let end = pos + entry.length();
            if frame < end {
                return Some(i);
            }
            pos = end;
        }
        None
    }

    fn clip_start(&self, index: usize) -> i64 {
        self.entries[..index.min(self.entries.len())]
            .iter()
            .map(EngineEntry::length)
            .sum()
    }

    fn entry(&self, index: usize) -> Option<EngineEntry> {
        self.entries.get(index).copied()
    }
}

/// In-process playback engine.
///
/// Tracks attached compositors and transport state; the stop counters let
/// tests observe the pause-around-mutation policy.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    compositors: HashMap<CompositorHandle, CompositorDesc>,
    next_handle: CompositorHandle,
    playing: bool,
    /// Number of `stop_playback` calls.
    pub stop_count: u64,
    /// Number of `full_stop` calls.
    pub full_stop_count: u64,
}

impl MemoryEngine {
    /// Create an idle engine with no compositors attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin playback (test helper; the real consumer is driven by the UI).
    pub fn play(&mut self) {
        self.playing = true;
        info!("Playback started");
    }

    /// Number of compositors currently attached.
    pub fn attached_count(&self) -> usize {
        self.compositors.len()
    }

    /// Attached descriptors in handle order, deepest attachment first.
    pub fn attached_order(&self) -> Vec<CompositorDesc> {
        let mut handles: Vec<_> = self.compositors.keys().copied().collect();
        handles.sort_unstable();
        handles
            .into_iter()
            .map(|h| self.compositors[&h].clone())
            .collect()
    }
}

impl PlaybackEngine for MemoryEngine {
    fn create_playlist(&mut self) -> Box<dyn NativePlaylist> {
        Box::new(MemoryPlaylist::new())
    }

    fn attach_compositor(&mut self, desc: CompositorDesc) -> CompositorHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        debug!(handle, kind = %desc.kind, a = desc.a_track, b = desc.b_track, "Compositor attached");
        self.compositors.insert(handle, desc);
        handle
    }

    fn detach_compositor(&mut self, handle: CompositorHandle) -> bool {
        let found = self.compositors.remove(&handle).is_some();
        debug!(handle, found, "Compositor detached");
        found
    }

    fn stop_playback(&mut self) {
        self.stop_count += 1;
        if self.playing {
            self.playing = false;
            info!("Playback stopped");
        }
    }

    fn full_stop(&mut self) {
        self.full_stop_count += 1;
        self.playing = false;
        info!("Consumer fully stopped for edit");
    }

    fn restart(&mut self) {
        info!("Consumer restarted");
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
