use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Scalar descriptors of one analysis window.
///
/// # Ranges
/// - `rms`: 0.0 to 1.0 for normalized input
/// - `energy`: sum of squared samples, grows with window size
/// - `spectral_centroid`, `spectral_spread`: Hz, 0.0 to Nyquist
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameFeatures {
    pub rms: f32,
    pub energy: f32,
    pub spectral_centroid: f32,
    pub spectral_spread: f32,
}

/// Computes per-window features. Implementations must not carry state between calls:
/// identical windows always produce identical features.
pub trait FeatureExtractor {
    /// Window length this extractor is planned for.
    fn window_size(&self) -> usize;

    fn extract(&self, window: &[f32]) -> FrameFeatures;
}

/// FFT-based extractor with a Hann window.
pub struct SpectralFeatureExtractor {
    sample_rate: f32,
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl SpectralFeatureExtractor {
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            sample_rate: sample_rate as f32,
            fft_size,
            fft,
            window: hann_window(fft_size),
        }
    }

    /// Magnitude spectrum (first half) of the Hann-windowed input, zero-padded to the FFT size.
    pub fn magnitude_spectrum(&self, samples: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .take(self.fft_size)
            .zip(&self.window)
            .map(|(&x, &w)| Complex::new(x * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer
            .iter()
            .take(self.fft_size / 2)
            .map(|c| c.norm())
            .collect()
    }

    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate / self.fft_size as f32
    }

    fn spectral_moments(&self, spectrum: &[f32]) -> (f32, f32) {
        let magnitude_sum: f32 = spectrum.iter().sum();
        if magnitude_sum <= 0.0 {
            return (0.0, 0.0);
        }

        let centroid = spectrum
            .iter()
            .enumerate()
            .map(|(i, &m)| self.bin_frequency(i) * m)
            .sum::<f32>()
            / magnitude_sum;

        let variance = spectrum
            .iter()
            .enumerate()
            .map(|(i, &m)| (self.bin_frequency(i) - centroid).powi(2) * m)
            .sum::<f32>()
            / magnitude_sum;

        (centroid, variance.sqrt())
    }
}

impl FeatureExtractor for SpectralFeatureExtractor {
    fn window_size(&self) -> usize {
        self.fft_size
    }

    fn extract(&self, window: &[f32]) -> FrameFeatures {
        if window.is_empty() {
            return FrameFeatures::default();
        }

        let energy: f32 = window.iter().map(|x| x * x).sum();
        let rms = (energy / window.len() as f32).sqrt();

        let spectrum = self.magnitude_spectrum(window);
        let (spectral_centroid, spectral_spread) = self.spectral_moments(&spectrum);

        FrameFeatures {
            rms,
            energy,
            spectral_centroid,
            spectral_spread,
        }
    }
}

pub(crate) fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_has_no_energy() {
        let extractor = SpectralFeatureExtractor::new(44100, 1024);
        let features = extractor.extract(&vec![0.0; 1024]);
        assert_eq!(features, FrameFeatures::default());
    }

    #[test]
    fn test_energy_and_rms() {
        let extractor = SpectralFeatureExtractor::new(8000, 4);
        let features = extractor.extract(&[0.5, -0.5, 0.5, -0.5]);
        assert!((features.energy - 1.0).abs() < 1e-6);
        assert!((features.rms - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_centroid_tracks_tone() {
        let extractor = SpectralFeatureExtractor::new(44100, 2048);
        let low = extractor.extract(&sine(220.0, 44100, 2048, 0.5));
        let high = extractor.extract(&sine(3520.0, 44100, 2048, 0.5));
        assert!(low.spectral_centroid < high.spectral_centroid);
        assert!((high.spectral_centroid - 3520.0).abs() < 200.0);
        assert!(low.spectral_spread >= 0.0);
    }

    #[test]
    fn test_extract_is_stateless() {
        let extractor = SpectralFeatureExtractor::new(44100, 512);
        let window = sine(440.0, 44100, 512, 0.3);
        assert_eq!(extractor.extract(&window), extractor.extract(&window));
    }
}
