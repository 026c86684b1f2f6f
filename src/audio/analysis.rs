use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;

use super::bpm::estimate_bpm;
use super::decode::{load_audio_file, ChannelMode};
use super::features::SpectralFeatureExtractor;
use super::onset::{OnsetDetector, OnsetEvent};
use super::pitch::{PitchSample, PitchTrack};
use super::pitch_tracker::PitchTracker;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::gameplay::schedule::{build_schedule, ScheduledEvent};

/// Metadata about the analyzed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub total_samples: usize,
    #[serde(default = "default_channels")]
    pub source_channels: u16,
}

fn default_channels() -> u16 {
    1
}

/// Everything the offline pass produces for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackAnalysis {
    pub file_info: FileInfo,
    pub onsets: Vec<OnsetEvent>,
    pub bpm: f64,
    #[serde(default)]
    pub pitches: Vec<PitchSample>,
    pub schedule: Vec<ScheduledEvent>,
}

impl TrackAnalysis {
    pub fn save_json<P: AsRef<Path>>(&self, output_path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_path, json)?;
        Ok(())
    }

    /// Load a saved analysis. The schedule is re-sorted by time, so hand-edited files
    /// still replay in order.
    pub fn load_json<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let json = std::fs::read_to_string(input_path)?;
        let mut analysis: TrackAnalysis = serde_json::from_str(&json)?;
        analysis.schedule.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(analysis)
    }
}

/// Read externally produced pitch samples: a JSON array of `{ "time", "frequencyHz" }`.
pub fn load_pitch_samples<P: AsRef<Path>>(path: P) -> Result<PitchTrack> {
    let json = std::fs::read_to_string(&path)?;
    let samples: Vec<PitchSample> = serde_json::from_str(&json)?;
    debug!(
        "Loaded {} pitch samples from {}",
        samples.len(),
        path.as_ref().display()
    );
    Ok(PitchTrack::new(samples))
}

/// Runs the whole offline pass: decode, onsets, BPM, pitch samples, schedule.
#[derive(Debug, Clone, Default)]
pub struct TrackAnalyzer {
    config: PipelineConfig,
    channel_mode: ChannelMode,
    pitches: Option<PitchTrack>,
}

impl TrackAnalyzer {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            channel_mode: ChannelMode::default(),
            pitches: None,
        }
    }

    pub fn with_channel_mode(mut self, mode: ChannelMode) -> Self {
        self.channel_mode = mode;
        self
    }

    /// Use these pitch samples instead of tracking pitch from the audio.
    pub fn with_pitches(mut self, pitches: PitchTrack) -> Self {
        self.pitches = Some(pitches);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<TrackAnalysis> {
        let path = path.as_ref();
        info!("Analyzing audio file: {}", path.display());

        let decoded = load_audio_file(path, self.channel_mode)?;
        let mut analysis =
            self.analyze_samples(&decoded.samples, decoded.sample_rate, &path.to_string_lossy())?;
        analysis.file_info.source_channels = decoded.source_channels;
        Ok(analysis)
    }

    pub fn analyze_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
        filename: &str,
    ) -> Result<TrackAnalysis> {
        self.config.validate()?;

        let detector = OnsetDetector::new(self.config.onset.clone());
        let extractor = SpectralFeatureExtractor::new(sample_rate, self.config.onset.window_size);
        let onsets = detector.detect(samples, sample_rate, &extractor)?;
        let bpm = estimate_bpm(&onsets, self.config.schedule.default_bpm);

        let pitches = match &self.pitches {
            Some(track) => track.clone(),
            None => PitchTrack::new(
                PitchTracker::new(self.config.pitch_tracker.clone()).track(samples, sample_rate),
            ),
        };

        let schedule = build_schedule(&onsets, &pitches, &self.config.schedule, &self.config.grid);

        let duration_seconds = samples.len() as f64 / sample_rate as f64;
        info!(
            "Analysis complete: {} onsets, {:.0} BPM, {} pitch samples over {:.2}s",
            onsets.len(),
            bpm,
            pitches.len(),
            duration_seconds
        );

        Ok(TrackAnalysis {
            file_info: FileInfo {
                filename: filename.to_string(),
                duration_seconds,
                sample_rate,
                total_samples: samples.len(),
                source_channels: 1,
            },
            onsets,
            bpm,
            pitches: pitches.samples().to_vec(),
            schedule,
        })
    }
}

/// Input for a background analysis.
#[derive(Debug, Clone)]
pub enum AnalysisSource {
    File(PathBuf),
    Samples {
        samples: Vec<f32>,
        sample_rate: u32,
        name: String,
    },
}

/// Pending result of [`spawn_analysis`]. Dropping it discards the result.
pub struct AnalysisHandle {
    receiver: Receiver<Result<TrackAnalysis>>,
}

impl AnalysisHandle {
    /// Block until the worker finishes.
    pub fn wait(self) -> Result<TrackAnalysis> {
        self.receiver.recv().unwrap_or(Err(Error::AnalysisAborted))
    }

    /// Poll without blocking; `None` while the worker is still running.
    pub fn try_result(&self) -> Option<Result<TrackAnalysis>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::AnalysisAborted)),
        }
    }
}

/// Run the offline pass on a worker thread so the caller's loop stays responsive.
pub fn spawn_analysis(source: AnalysisSource, analyzer: TrackAnalyzer) -> Result<AnalysisHandle> {
    let (sender, receiver) = crossbeam_channel::bounded(1);

    thread::Builder::new()
        .name("track-analysis".into())
        .spawn(move || {
            let result = match source {
                AnalysisSource::File(path) => analyzer.analyze_file(&path),
                AnalysisSource::Samples {
                    samples,
                    sample_rate,
                    name,
                } => analyzer.analyze_samples(&samples, sample_rate, &name),
            };
            if sender.send(result).is_err() {
                debug!("Analysis finished after its handle was dropped");
            }
        })?;

    Ok(AnalysisHandle { receiver })
}
