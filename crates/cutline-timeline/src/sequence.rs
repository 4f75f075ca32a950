//! Sequence: the aggregate root of the timeline.
//!
//! Owns the tracks, the compositor registry (keyed by stable destroy
//! ids), the undo/redo history, the engine handle, and the listener that
//! the selection/GUI layer hangs off. All timeline mutation enters
//! through [`Sequence::do_edit`] and the undo/redo pair.

use cutline_core::{CutlineError, FrameRate, Result};
use cutline_engine::PlaybackEngine;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::compositor::{Compositor, CompositorKind, DestroyId};
use crate::edit::{ActionState, EditAction, EditStack};
use crate::listener::{EditorListener, NullListener};
use crate::sync;
use crate::track::{Track, TrackKind};

/// Order compositors are applied in during a restack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositingMode {
    /// Deepest source track attaches first.
    DeepestFirst,
    /// Shallowest source track attaches first.
    ShallowestFirst,
}

/// A sequence (timeline) containing tracks and compositors.
#[derive(Debug)]
pub struct Sequence {
    /// Unique sequence ID
    pub id: Uuid,
    /// Sequence name
    pub name: String,
    /// Frame rate
    pub frame_rate: FrameRate,
    /// Tracks, video first, index 0 deepest
    pub(crate) tracks: Vec<Track>,
    /// Compositors in insertion order; restacking sorts the attachments
    pub(crate) compositors: Vec<Compositor>,
    next_destroy_id: DestroyId,
    compositing_mode: CompositingMode,
    /// Native engine boundary
    pub(crate) engine: Box<dyn PlaybackEngine>,
    /// Selection/GUI collaborator
    pub(crate) listener: Box<dyn EditorListener>,
    stack: EditStack,
}

impl Sequence {
    /// Create a sequence with `video_tracks` + `audio_tracks` empty
    /// tracks. Tracks live for the whole sequence lifetime; changing the
    /// track count means building a new sequence with
    /// [`Sequence::with_track_counts`].
    pub fn new(
        name: impl Into<String>,
        frame_rate: FrameRate,
        mut engine: Box<dyn PlaybackEngine>,
        video_tracks: usize,
        audio_tracks: usize,
    ) -> Self {
        let mut tracks = Vec::with_capacity(video_tracks + audio_tracks);
        for i in 0..video_tracks {
            let playlist = engine.create_playlist();
            tracks.push(Track::new(TrackKind::Video, format!("V{}", i + 1), playlist));
        }
        for i in 0..audio_tracks {
            let playlist = engine.create_playlist();
            tracks.push(Track::new(TrackKind::Audio, format!("A{}", i + 1), playlist));
        }
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frame_rate,
            tracks,
            compositors: Vec::new(),
            next_destroy_id: 0,
            compositing_mode: CompositingMode::DeepestFirst,
            engine,
            listener: Box::new(NullListener),
            stack: EditStack::default(),
        }
    }

    /// Assemble a sequence from already-built tracks (snapshot loading).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        frame_rate: FrameRate,
        tracks: Vec<Track>,
        engine: Box<dyn PlaybackEngine>,
        compositing_mode: CompositingMode,
        next_destroy_id: DestroyId,
    ) -> Self {
        Self {
            id,
            name,
            frame_rate,
            tracks,
            compositors: Vec::new(),
            next_destroy_id,
            compositing_mode,
            engine,
            listener: Box::new(NullListener),
            stack: EditStack::default(),
        }
    }

    /// Append a compositor without restacking (snapshot loading; the
    /// caller restacks once after the batch).
    pub(crate) fn push_compositor_raw(&mut self, compositor: Compositor) {
        if compositor.destroy_id >= self.next_destroy_id {
            self.next_destroy_id = compositor.destroy_id + 1;
        }
        self.compositors.push(compositor);
    }

    /// Next destroy id to be issued.
    pub(crate) fn next_destroy_id_hint(&self) -> DestroyId {
        self.next_destroy_id
    }

    /// Replace the selection/GUI listener.
    pub fn set_listener(&mut self, listener: Box<dyn EditorListener>) {
        self.listener = listener;
    }

    /// Compositing mode; changing it reorders the stack.
    pub fn compositing_mode(&self) -> CompositingMode {
        self.compositing_mode
    }

    pub fn set_compositing_mode(&mut self, mode: CompositingMode) {
        if self.compositing_mode != mode {
            self.compositing_mode = mode;
            self.restack_compositors();
        }
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// All tracks, video first.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track at `index`.
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track at `index`, mutably. The atomic primitives on [`Track`] are
    /// the sanctioned mutation surface; everything structural beyond
    /// them goes through [`Sequence::do_edit`].
    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Number of video tracks (they occupy the leading indices).
    pub fn video_track_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Video)
            .count()
    }

    /// Timeline length: the longest track.
    pub fn length(&self) -> i64 {
        self.tracks.iter().map(Track::get_length).max().unwrap_or(0)
    }

    /// Build a new sequence with different track counts, cloning clip
    /// content and carrying over the compositors whose tracks survive
    /// (destroy ids preserved). The edit history starts fresh.
    pub fn with_track_counts(
        &self,
        video_tracks: usize,
        audio_tracks: usize,
        engine: Box<dyn PlaybackEngine>,
    ) -> Sequence {
        let old_video = self.video_track_count();

        let mut seq = Sequence::new(
            self.name.clone(),
            self.frame_rate,
            engine,
            video_tracks,
            audio_tracks,
        );
        seq.compositing_mode = self.compositing_mode;

        let remap = |index: usize| -> Option<usize> {
            if index < old_video {
                (index < video_tracks).then_some(index)
            } else {
                let k = index - old_video;
                (k < audio_tracks).then_some(video_tracks + k)
            }
        };

        for (old_index, old_track) in self.tracks.iter().enumerate() {
            let Some(new_index) = remap(old_index) else {
                continue;
            };
            let new_track = &mut seq.tracks[new_index];
            new_track.name = old_track.name.clone();
            new_track.freedom = old_track.freedom;
            new_track.muted = old_track.muted;
            for clip in old_track.clips() {
                if clip.is_blank() {
                    new_track.insert_blank(new_track.entry_count(), clip.length());
                } else {
                    new_track.append_clip(clip.clone(), clip.clip_in, clip.clip_out);
                }
            }
        }

        for comp in &self.compositors {
            if let (Some(a), Some(b)) = (remap(comp.a_track), remap(comp.b_track)) {
                seq.compositors.push(Compositor::new(
                    comp.destroy_id,
                    comp.kind,
                    a,
                    b,
                    comp.clip_in,
                    comp.clip_out,
                ));
            }
        }
        seq.next_destroy_id = self.next_destroy_id;
        seq.restack_compositors();
        seq
    }

    // ── Edit history ────────────────────────────────────────────

    /// Execute a fresh action and register it on the undo stack.
    ///
    /// A failed apply propagates and leaves the action unregistered.
    pub fn do_edit(&mut self, mut action: EditAction) -> Result<()> {
        if action.state() != ActionState::Unregistered {
            return Err(CutlineError::Internal(
                "edit action has already been executed".into(),
            ));
        }
        if action.exit_trim_mode_on_edit {
            self.listener.exit_trim_mode();
        }
        if action.stop_for_edit {
            self.engine.full_stop();
        } else {
            self.engine.stop_playback();
        }
        action.redo_pass(self)?;
        if action.stop_for_edit {
            self.engine.restart();
        }
        debug!(edit = ?action.edit(), "Edit applied");
        self.stack.push(action);
        Ok(())
    }

    /// Undo the most recent action. `Ok(false)` when the history is
    /// empty.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(mut action) = self.stack.pop_undo() else {
            return Ok(false);
        };
        self.engine.stop_playback();
        let result = action.undo_pass(self);
        debug!(edit = ?action.edit(), "Edit undone");
        self.stack.push_undone(action);
        result.map(|_| true)
    }

    /// Redo the most recently undone action. `Ok(false)` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(mut action) = self.stack.pop_redo() else {
            return Ok(false);
        };
        self.engine.stop_playback();
        let result = action.redo_pass(self);
        debug!(edit = ?action.edit(), "Edit redone");
        self.stack.push_redone(action);
        result.map(|_| true)
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub fn undo_count(&self) -> usize {
        self.stack.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.stack.redo_count()
    }

    /// Drop the whole edit history (e.g. after loading a snapshot).
    pub fn clear_history(&mut self) {
        self.stack.clear();
    }

    // ── Sync engine ─────────────────────────────────────────────

    /// Recompute every child clip's sync state after a structural
    /// change. Runs globally whenever any track reports one.
    pub fn recompute_sync_states(&mut self) {
        sync::recompute(self);
    }

    // ── Compositors ─────────────────────────────────────────────

    /// All compositors in insertion order.
    pub fn compositors(&self) -> &[Compositor] {
        &self.compositors
    }

    /// Resolve a compositor by destroy id.
    ///
    /// A miss is a hard error: restacking bugs must not be swallowed.
    pub fn compositor(&self, destroy_id: DestroyId) -> Result<&Compositor> {
        self.compositors
            .iter()
            .find(|c| c.destroy_id == destroy_id)
            .ok_or(CutlineError::CompositorNotFound(destroy_id))
    }

    /// Create a compositor and restack. Returns its stable destroy id.
    pub fn add_compositor(
        &mut self,
        kind: CompositorKind,
        a_track: usize,
        b_track: usize,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<DestroyId> {
        let destroy_id = self.next_destroy_id;
        self.add_compositor_with_id(destroy_id, kind, a_track, b_track, clip_in, clip_out)?;
        Ok(destroy_id)
    }

    /// Create a compositor under a caller-supplied destroy id. Used by
    /// the redo path so an undone compositor comes back under the id
    /// other code may still hold.
    pub(crate) fn add_compositor_with_id(
        &mut self,
        destroy_id: DestroyId,
        kind: CompositorKind,
        a_track: usize,
        b_track: usize,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<()> {
        if a_track >= self.tracks.len() {
            return Err(CutlineError::TrackOutOfRange(a_track));
        }
        if b_track >= self.tracks.len() {
            return Err(CutlineError::TrackOutOfRange(b_track));
        }
        if a_track == b_track {
            return Err(CutlineError::InvalidParameter(
                "compositor needs two distinct tracks".into(),
            ));
        }
        if self.compositors.iter().any(|c| c.destroy_id == destroy_id) {
            return Err(CutlineError::Internal(format!(
                "destroy id {destroy_id} already in use"
            )));
        }
        self.compositors.push(Compositor::new(
            destroy_id, kind, a_track, b_track, clip_in, clip_out,
        ));
        if destroy_id >= self.next_destroy_id {
            self.next_destroy_id = destroy_id + 1;
        }
        self.restack_compositors();
        Ok(())
    }

    /// Remove a compositor by destroy id, detach it, and restack.
    pub fn remove_compositor(&mut self, destroy_id: DestroyId) -> Result<Compositor> {
        let index = self
            .compositors
            .iter()
            .position(|c| c.destroy_id == destroy_id)
            .ok_or(CutlineError::CompositorNotFound(destroy_id))?;
        let mut compositor = self.compositors.remove(index);
        if let Some(handle) = compositor.handle.take() {
            self.engine.detach_compositor(handle);
        }
        self.restack_compositors();
        Ok(compositor)
    }

    /// Put a previously removed compositor back (undo path) and restack.
    pub(crate) fn reinsert_compositor(&mut self, mut compositor: Compositor) {
        compositor.handle = None;
        if compositor.destroy_id >= self.next_destroy_id {
            self.next_destroy_id = compositor.destroy_id + 1;
        }
        self.compositors.push(compositor);
        self.restack_compositors();
    }

    /// Move a compositor to a new frame range and restack.
    pub fn move_compositor(
        &mut self,
        destroy_id: DestroyId,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<()> {
        let compositor = self
            .compositors
            .iter_mut()
            .find(|c| c.destroy_id == destroy_id)
            .ok_or(CutlineError::CompositorNotFound(destroy_id))?;
        compositor.clip_in = clip_in;
        compositor.clip_out = clip_out;
        self.restack_compositors();
        Ok(())
    }

    /// Tear down and re-create every attached compositor in depth order.
    ///
    /// The engine cannot reorder in place, so overlay order is only
    /// correct after a full rebuild. Native handles are invalidated;
    /// destroy ids survive.
    pub fn restack_compositors(&mut self) {
        for compositor in &mut self.compositors {
            if let Some(handle) = compositor.handle.take() {
                self.engine.detach_compositor(handle);
            }
        }
        match self.compositing_mode {
            CompositingMode::DeepestFirst => {
                self.compositors.sort_by_key(|c| c.b_track);
            }
            CompositingMode::ShallowestFirst => {
                self.compositors.sort_by_key(|c| std::cmp::Reverse(c.b_track));
            }
        }
        for compositor in &mut self.compositors {
            let handle = self.engine.attach_compositor(compositor.desc());
            compositor.handle = Some(handle);
        }
        debug!(count = self.compositors.len(), "Compositors restacked");
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Clip, SourceRef};
    use crate::edit::EditAction;
    use cutline_engine::MemoryEngine;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_sequence(video: usize, audio: usize) -> Sequence {
        Sequence::new(
            "Test",
            FrameRate::FPS_24,
            Box::new(MemoryEngine::new()),
            video,
            audio,
        )
    }

    fn make_clip(name: &str, frames: i64) -> Clip {
        Clip::new(name, SourceRef::new("test.mp4", frames))
    }

    #[test]
    fn test_track_layout_video_first() {
        let seq = make_sequence(2, 2);
        assert_eq!(seq.tracks().len(), 4);
        assert_eq!(seq.track(0).unwrap().name, "V1");
        assert_eq!(seq.track(1).unwrap().name, "V2");
        assert_eq!(seq.track(2).unwrap().name, "A1");
        assert_eq!(seq.video_track_count(), 2);
    }

    #[test]
    fn test_length_is_longest_track() {
        let mut seq = make_sequence(2, 1);
        seq.track_mut(0).unwrap().append_clip(make_clip("a", 50), 0, 49);
        seq.track_mut(2).unwrap().append_clip(make_clip("m", 80), 0, 79);
        assert_eq!(seq.length(), 80);
    }

    // ── Compositors ─────────────────────────────────────────────

    #[test]
    fn test_destroy_id_survives_restacks() {
        let mut seq = make_sequence(3, 0);
        let c1 = seq
            .add_compositor(CompositorKind::Dissolve, 0, 1, 0, 49)
            .unwrap();
        let c2 = seq
            .add_compositor(CompositorKind::Affine, 0, 2, 10, 59)
            .unwrap();
        let c3 = seq
            .add_compositor(CompositorKind::Wipe, 1, 2, 20, 29)
            .unwrap();

        // Every add restacked; all ids still resolve and are attached.
        for id in [c1, c2, c3] {
            assert!(seq.compositor(id).unwrap().is_attached());
        }

        seq.move_compositor(c1, 100, 149).unwrap();
        assert_eq!(seq.compositor(c1).unwrap().clip_in, 100);
        assert!(seq.compositor(c1).unwrap().is_attached());
    }

    #[test]
    fn test_removed_compositor_lookup_is_hard_error() {
        let mut seq = make_sequence(2, 0);
        let id = seq
            .add_compositor(CompositorKind::Dissolve, 0, 1, 0, 9)
            .unwrap();
        seq.remove_compositor(id).unwrap();
        assert!(matches!(
            seq.compositor(id),
            Err(CutlineError::CompositorNotFound(_))
        ));
    }

    #[test]
    fn test_restack_orders_by_depth() {
        let mut seq = make_sequence(4, 0);
        let shallow = seq
            .add_compositor(CompositorKind::Dissolve, 0, 3, 0, 9)
            .unwrap();
        let deep = seq
            .add_compositor(CompositorKind::Dissolve, 0, 1, 0, 9)
            .unwrap();
        let mid = seq
            .add_compositor(CompositorKind::Dissolve, 0, 2, 0, 9)
            .unwrap();

        let order: Vec<_> = seq.compositors().iter().map(|c| c.destroy_id).collect();
        assert_eq!(order, vec![deep, mid, shallow]);

        seq.set_compositing_mode(CompositingMode::ShallowestFirst);
        let order: Vec<_> = seq.compositors().iter().map(|c| c.destroy_id).collect();
        assert_eq!(order, vec![shallow, mid, deep]);
    }

    #[test]
    fn test_compositor_edit_undo_redo_keeps_destroy_id() {
        let mut seq = make_sequence(2, 0);
        seq.do_edit(EditAction::add_compositor(
            CompositorKind::Dissolve,
            0,
            1,
            0,
            49,
        ))
        .unwrap();
        let id = seq.compositors()[0].destroy_id;

        seq.undo().unwrap();
        assert!(seq.compositor(id).is_err());

        seq.redo().unwrap();
        assert!(seq.compositor(id).unwrap().is_attached());

        seq.do_edit(EditAction::remove_compositor(id)).unwrap();
        assert!(seq.compositor(id).is_err());
        seq.undo().unwrap();
        assert_eq!(seq.compositor(id).unwrap().kind, CompositorKind::Dissolve);
    }

    #[test]
    fn test_compositor_validation() {
        let mut seq = make_sequence(2, 0);
        assert!(seq
            .add_compositor(CompositorKind::Dissolve, 0, 0, 0, 9)
            .is_err());
        assert!(seq
            .add_compositor(CompositorKind::Dissolve, 0, 5, 0, 9)
            .is_err());
    }

    // ── Track-count changes ─────────────────────────────────────

    #[test]
    fn test_with_track_counts_clones_content() {
        let mut seq = make_sequence(2, 1);
        {
            let track = seq.track_mut(0).unwrap();
            track.append_clip(make_clip("a", 50), 0, 49);
            track.insert_blank(1, 10);
            track.append_clip(make_clip("b", 20), 0, 19);
        }
        seq.track_mut(2).unwrap().append_clip(make_clip("m", 30), 0, 29);
        let comp = seq
            .add_compositor(CompositorKind::Dissolve, 0, 1, 0, 49)
            .unwrap();

        let grown = seq.with_track_counts(3, 1, Box::new(MemoryEngine::new()));
        assert_eq!(grown.tracks().len(), 4);
        assert_eq!(grown.track(0).unwrap().get_length(), 80);
        assert_eq!(
            grown.track(0).unwrap().shadow_length(),
            grown.track(0).unwrap().get_length()
        );
        // Audio content moved to the shifted index.
        assert_eq!(grown.track(3).unwrap().get_length(), 30);
        // Compositor carried over under its old destroy id, re-attached.
        assert!(grown.compositor(comp).unwrap().is_attached());
        assert!(!grown.can_undo());
    }

    #[test]
    fn test_with_track_counts_drops_orphaned_compositors() {
        let mut seq = make_sequence(3, 0);
        seq.add_compositor(CompositorKind::Dissolve, 0, 2, 0, 9)
            .unwrap();
        let shrunk = seq.with_track_counts(2, 0, Box::new(MemoryEngine::new()));
        assert!(shrunk.compositors().is_empty());
    }

    // ── Listener notifications ──────────────────────────────────

    #[derive(Debug, Default)]
    struct RecordingListener {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl EditorListener for RecordingListener {
        fn clear_selection(&mut self) {
            self.events.borrow_mut().push("clear".into());
        }
        fn exit_trim_mode(&mut self) {
            self.events.borrow_mut().push("exit_trim".into());
        }
        fn timeline_length_changed(&mut self, length: i64) {
            self.events.borrow_mut().push(format!("len {length}"));
        }
    }

    #[test]
    fn test_listener_notified_on_edit_and_undo() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut seq = make_sequence(1, 0);
        seq.set_listener(Box::new(RecordingListener {
            events: events.clone(),
        }));

        seq.do_edit(EditAction::append(0, make_clip("a", 50), 0, 49))
            .unwrap();
        assert_eq!(
            events.borrow().as_slice(),
            ["exit_trim", "clear", "len 50"]
        );

        events.borrow_mut().clear();
        seq.undo().unwrap();
        assert_eq!(events.borrow().as_slice(), ["clear", "len 0"]);
    }
}
