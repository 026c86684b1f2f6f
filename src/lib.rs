//! Beat-synchronized lane gameplay driven by offline audio analysis.
//!
//! The `audio` half turns a decoded track into onsets, a tempo, pitch samples and a
//! schedule of lane events. The `gameplay` half replays that schedule against a track
//! clock, spawning entities early enough to reach the judgment line on the beat.

pub mod audio;
pub mod config;
pub mod error;
pub mod gameplay;

pub use config::PipelineConfig;
pub use error::{Error, Result};
