//! Implementations of the [`ImageSource`](crate::ports::ImageSource) port.
//!
//! `live` fetches over HTTP, `recording` wraps another source and writes a
//! cassette, and `replaying` serves fetches back from one.

pub mod live;
pub mod recording;
pub mod replaying;
