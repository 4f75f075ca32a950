//! Notifications to the selection/GUI layer.
//!
//! One-way calls: the edit engine reports, the GUI reacts, nothing comes
//! back. A structural change invalidates the current selection and may
//! change the timeline length the scroll bars are sized against.

/// Collaborator interface the edit engine notifies around every action.
pub trait EditorListener: std::fmt::Debug {
    /// The current clip selection is no longer valid.
    fn clear_selection(&mut self) {}

    /// An edit is about to run while a trim tool is active.
    fn exit_trim_mode(&mut self) {}

    /// The timeline length changed to `length` frames.
    fn timeline_length_changed(&mut self, length: i64) {
        let _ = length;
    }
}

/// Listener that ignores everything. Default for headless use.
#[derive(Debug, Default)]
pub struct NullListener;

impl EditorListener for NullListener {}
