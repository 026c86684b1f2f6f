pub mod analysis;
pub mod bpm;
pub mod decode;
pub mod features;
pub mod onset;
pub mod pitch;
pub mod pitch_tracker;
pub mod playback;

pub use analysis::{
    load_pitch_samples, spawn_analysis, AnalysisHandle, AnalysisSource, FileInfo, TrackAnalysis,
    TrackAnalyzer,
};
pub use bpm::{estimate_bpm, estimate_bpm_from_times, DEFAULT_BPM};
pub use decode::{load_audio_file, ChannelMode, DecodedAudio};
pub use features::{FeatureExtractor, FrameFeatures, SpectralFeatureExtractor};
pub use onset::{detect_onsets, OnsetDetector, OnsetEvent};
pub use pitch::{map_pitch_to_color, map_pitch_to_row, PitchSample, PitchTrack, Rgb};
pub use pitch_tracker::PitchTracker;
pub use playback::AudioPlayback;
