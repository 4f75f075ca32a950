//! Cutline Timeline - Timeline edit model and action engine
//!
//! Implements the editable timeline for Cutline:
//! - Tracks containing clips and blanks, mirrored into the native engine
//! - Edit operations as paired do/undo actions with a linear history
//! - Composite edit algorithms (cut, overwrite, trim, range extraction)
//! - Blank consolidation and trailing-blank normalization
//! - Clip-to-clip synchronization and compositor restacking
//!
//! Every structural mutation flows through the four atomic primitives on
//! [`Track`], which touch the shadow list and the native structure in the
//! same call. Composite algorithms are expressed purely in those
//! primitives, so the two representations cannot drift.

pub mod clip;
pub mod compositor;
pub mod edit;
pub mod listener;
pub mod sequence;
pub mod snapshot;
pub mod sync;
pub mod track;

pub use clip::{Clip, ClipColor, FilterRef, SourceRef, SyncData, SyncState};
pub use compositor::{Compositor, CompositorKind, DestroyId};
pub use edit::{ActionState, Edit, EditAction};
pub use listener::{EditorListener, NullListener};
pub use sequence::{CompositingMode, Sequence};
pub use snapshot::{CompositorSnapshot, SequenceSnapshot, TrackSnapshot};
pub use sync::ResyncItem;
pub use track::{Track, TrackFreedom, TrackKind};
