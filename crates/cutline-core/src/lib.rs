//! Cutline Core - Foundation types for the timeline editor
//!
//! This crate provides the fundamental types used throughout Cutline:
//! - Frame-accurate time representation (FrameRate, timecode)
//! - The error taxonomy shared by all crates

pub mod error;
pub mod time;

pub use error::{CutlineError, Result};
pub use time::FrameRate;
