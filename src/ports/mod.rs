//! The one external boundary: where source image bytes come from.
//!
//! Adapters in [`crate::adapters`] implement it live, recording or replaying.

pub mod image_source;

pub use image_source::ImageSource;
