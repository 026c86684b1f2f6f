use log::info;

use super::features::SpectralFeatureExtractor;
use super::pitch::PitchSample;
use crate::config::PitchTrackerConfig;

/// Derives sparse pitch samples from a decoded track: one sample per STFT frame whose
/// strongest in-band peak clears the silence gate.
pub struct PitchTracker {
    config: PitchTrackerConfig,
}

impl PitchTracker {
    pub fn new(config: PitchTrackerConfig) -> Self {
        Self { config }
    }

    pub fn track(&self, samples: &[f32], sample_rate: u32) -> Vec<PitchSample> {
        let config = &self.config;
        if sample_rate == 0 || config.hop_size == 0 || config.window_size < 2 {
            return Vec::new();
        }

        let spectral = SpectralFeatureExtractor::new(sample_rate, config.window_size);
        let bin_hz = sample_rate as f64 / config.window_size as f64;
        let lowest_bin = ((config.min_hz / bin_hz).ceil() as usize).max(1);
        let highest_bin = ((config.max_hz / bin_hz).floor() as usize).min(config.window_size / 2 - 1);

        let mut pitches = Vec::new();
        if lowest_bin > highest_bin {
            return pitches;
        }

        let mut start = 0usize;
        while start + config.window_size <= samples.len() {
            let frame = &samples[start..start + config.window_size];
            let rms = (frame.iter().map(|x| x * x).sum::<f32>() / frame.len() as f32).sqrt();

            if rms >= config.silence_rms {
                let spectrum = spectral.magnitude_spectrum(frame);
                if let Some(bin) = strongest_bin(&spectrum, lowest_bin, highest_bin) {
                    let offset = parabolic_offset(&spectrum, bin);
                    let frequency_hz = (bin as f64 + offset) * bin_hz;
                    if frequency_hz > 0.0 {
                        pitches.push(PitchSample {
                            time: start as f64 / sample_rate as f64,
                            frequency_hz,
                        });
                    }
                }
            }

            start += config.hop_size;
        }

        info!("Pitch tracking produced {} samples", pitches.len());
        pitches
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new(PitchTrackerConfig::default())
    }
}

fn strongest_bin(spectrum: &[f32], lowest: usize, highest: usize) -> Option<usize> {
    spectrum
        .get(lowest..=highest)?
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > 0.0)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| lowest + i)
}

/// Sub-bin peak refinement from the two neighbours, in bins (-0.5..0.5).
fn parabolic_offset(spectrum: &[f32], bin: usize) -> f64 {
    if bin == 0 || bin + 1 >= spectrum.len() {
        return 0.0;
    }
    let (left, center, right) = (
        spectrum[bin - 1] as f64,
        spectrum[bin] as f64,
        spectrum[bin + 1] as f64,
    );
    let denominator = left - 2.0 * center + right;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
}
