use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::features::{FeatureExtractor, SpectralFeatureExtractor};
use crate::config::OnsetConfig;
use crate::error::{Error, Result};

/// A detected moment of rhythmic emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Seconds from track start.
    pub time: f64,
    /// RMS of the window that triggered the onset.
    #[serde(default)]
    pub rms: f32,
}

/// Adaptive-threshold energy-rise detector over a whole decoded track.
pub struct OnsetDetector {
    config: OnsetConfig,
}

impl OnsetDetector {
    pub fn new(config: OnsetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OnsetConfig {
        &self.config
    }

    /// Slide over `samples` and return onsets in strictly increasing time order,
    /// at least `min_gap_seconds` apart. An empty result is valid.
    pub fn detect<E: FeatureExtractor + ?Sized>(
        &self,
        samples: &[f32],
        sample_rate: u32,
        extractor: &E,
    ) -> Result<Vec<OnsetEvent>> {
        let config = &self.config;
        if sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be non-zero".into()));
        }
        if config.hop_size == 0 || config.window_size == 0 {
            return Err(Error::InvalidConfig(
                "onset hop_size and window_size must be non-zero".into(),
            ));
        }

        let rate = sample_rate as f64;
        let calibration_samples = (config.calibration_seconds * rate).round() as usize;
        if calibration_samples == 0 || samples.len() < calibration_samples {
            return Err(Error::InsufficientAudio {
                samples: samples.len(),
                required: calibration_samples,
            });
        }

        let baseline = samples[..calibration_samples]
            .iter()
            .map(|s| s.abs())
            .sum::<f32>()
            / calibration_samples as f32;
        let threshold = baseline * config.threshold_multiplier;
        let ramp_up_samples = config.ramp_up_seconds * rate;

        debug!(
            "Onset calibration: baseline {:.6}, threshold {:.6} ({} samples)",
            baseline, threshold, calibration_samples
        );

        let mut onsets: Vec<OnsetEvent> = Vec::new();
        let mut last_onset: Option<f64> = None;
        let mut start = 0usize;

        while start + config.window_size < samples.len() {
            let window_start_time = start as f64 / rate;

            if window_start_time >= config.warmup_skip_seconds {
                let ramp = ramp_factor(start, ramp_up_samples);
                let effective_threshold = threshold * ramp as f32;
                let gap_ok = last_onset
                    .map_or(true, |last| window_start_time - last >= config.min_gap_seconds);

                if gap_ok {
                    let window = &samples[start..start + config.window_size];
                    let features = extractor.extract(window);

                    if features.energy > effective_threshold {
                        trace!(
                            "Onset at {:.3}s: energy {:.5} > {:.5} (ramp {:.2})",
                            window_start_time, features.energy, effective_threshold, ramp
                        );
                        onsets.push(OnsetEvent {
                            time: window_start_time,
                            rms: features.rms,
                        });
                        last_onset = Some(window_start_time);
                    }
                }
            }

            start += config.hop_size;
        }

        // Forward sliding already yields sorted output.
        debug_assert!(onsets.windows(2).all(|pair| pair[0].time < pair[1].time));

        info!(
            "Detected {} onsets in {:.2}s of audio",
            onsets.len(),
            samples.len() as f64 / rate
        );
        Ok(onsets)
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new(OnsetConfig::default())
    }
}

/// Detect onsets with default thresholds and the built-in spectral extractor.
pub fn detect_onsets(
    samples: &[f32],
    sample_rate: u32,
    hop_size: usize,
    window_size: usize,
) -> Result<Vec<OnsetEvent>> {
    let detector = OnsetDetector::new(OnsetConfig {
        hop_size,
        window_size,
        ..OnsetConfig::default()
    });
    let extractor = SpectralFeatureExtractor::new(sample_rate, window_size);
    detector.detect(samples, sample_rate, &extractor)
}

fn ramp_factor(sample_index: usize, ramp_up_samples: f64) -> f64 {
    if ramp_up_samples <= 0.0 {
        return 1.0;
    }
    (sample_index as f64 / ramp_up_samples).min(1.0)
}
