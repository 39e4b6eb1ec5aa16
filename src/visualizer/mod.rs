// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint colors shared by on-screen rendering and export.

/// Color definitions and the keypoint gradient.
pub mod color;

pub use color::{Color, blend, keypoint_color};
