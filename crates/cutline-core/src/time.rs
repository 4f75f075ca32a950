//! Frame-accurate time representation
//!
//! The edit model addresses the timeline in integer frames with inclusive
//! in/out bounds. Rational arithmetic is used for everything that crosses
//! into seconds so fractional rates (23.976, 29.97) stay exact.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame in seconds.
    #[inline]
    pub fn frame_duration(self) -> Rational64 {
        Rational64::new(self.denominator as i64, self.numerator as i64)
    }

    /// Exact duration of `frames` frames in seconds.
    #[inline]
    pub fn frames_to_seconds(self, frames: i64) -> Rational64 {
        Rational64::new(frames * self.denominator as i64, self.numerator as i64)
    }

    /// Nominal whole-frame rate used for timecode math (24 for 23.976).
    #[inline]
    pub fn nominal_fps(self) -> i64 {
        let fps = self.to_fps_f64();
        fps.round() as i64
    }

    /// True for NTSC-family fractional rates that use drop-frame timecode.
    #[inline]
    pub fn is_drop_frame(self) -> bool {
        self.denominator == 1001 && self.numerator % 30000 == 0
    }

    /// Format a frame count as non-drop timecode `HH:MM:SS:FF`.
    pub fn timecode(self, frame: i64) -> String {
        let fps = self.nominal_fps();
        let ff = frame % fps;
        let total_secs = frame / fps;
        let ss = total_secs % 60;
        let mm = (total_secs / 60) % 60;
        let hh = total_secs / 3600;
        format!("{hh:02}:{mm:02}:{ss:02}:{ff:02}")
    }

    /// Format a frame count as drop-frame timecode `HH:MM:SS;FF`.
    ///
    /// Drops 2 frame numbers per minute except every tenth minute
    /// (the SMPTE 29.97 convention, scaled for 59.94).
    pub fn timecode_drop_frame(self, frame: i64) -> String {
        let fps = self.nominal_fps();
        let drop = 2 * (fps / 30);
        let frames_per_min = fps * 60 - drop;
        let frames_per_10min = frames_per_min * 10 + drop;

        let ten_min_blocks = frame / frames_per_10min;
        let rem = frame % frames_per_10min;
        // First minute of each block keeps all its frames.
        let extra_mins = if rem >= fps * 60 {
            (rem - drop) / frames_per_min
        } else {
            0
        };
        let adjusted = frame + drop * (ten_min_blocks * 9 + extra_mins);

        let ff = adjusted % fps;
        let total_secs = adjusted / fps;
        let ss = total_secs % 60;
        let mm = (total_secs / 60) % 60;
        let hh = total_secs / 3600;
        format!("{hh:02}:{mm:02}:{ss:02};{ff:02}")
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
