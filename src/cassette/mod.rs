//! Cassettes: YAML recordings of image fetches, replayed without a network.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
