use log::info;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

/// How multi-channel audio is reduced to the single channel the analysis reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Average all channels.
    #[default]
    Mixdown,
    /// Keep only the first channel.
    FirstChannel,
}

/// A decoded mono track.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub source_channels: u16,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file (WAV, MP3, M4A, OGG, FLAC) to mono `f32` samples.
pub fn load_audio_file<P: AsRef<Path>>(path: P, mode: ChannelMode) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"));

    let decoded = if is_wav {
        load_wav(path, mode)?
    } else {
        load_with_rodio(path, mode)?
    };

    info!(
        "Decoded {:?}: {} samples at {}Hz ({:.2}s, {} channel(s))",
        path,
        decoded.samples.len(),
        decoded.sample_rate,
        decoded.duration_seconds(),
        decoded.source_channels
    );
    Ok(decoded)
}

fn load_with_rodio(path: &Path, mode: ChannelMode) -> Result<DecodedAudio> {
    let file = BufReader::new(File::open(path)?);
    let source = Decoder::new(file).map_err(|e| Error::Decode(e.to_string()))?;

    let sample_rate = source.sample_rate();
    let channels = source.channels();
    let interleaved: Vec<f32> = source.convert_samples::<f32>().collect();

    Ok(DecodedAudio {
        samples: to_mono(&interleaved, channels, mode),
        sample_rate,
        source_channels: channels,
    })
}

fn load_wav(path: &Path, mode: ChannelMode) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        samples: to_mono(&interleaved, spec.channels, mode),
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

pub fn to_mono(interleaved: &[f32], channels: u16, mode: ChannelMode) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| match mode {
            ChannelMode::Mixdown => frame.iter().sum::<f32>() / channels as f32,
            ChannelMode::FirstChannel => frame[0],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixdown_and_first_channel() {
        let stereo = [1.0, 0.0, 0.5, -0.5, -1.0, 1.0];
        assert_eq!(to_mono(&stereo, 2, ChannelMode::Mixdown), vec![0.5, 0.0, 0.0]);
        assert_eq!(to_mono(&stereo, 2, ChannelMode::FirstChannel), vec![1.0, 0.5, -1.0]);
        assert_eq!(to_mono(&stereo, 1, ChannelMode::Mixdown), stereo.to_vec());
    }

    #[test]
    fn test_wav_round_trip() {
        let path = std::env::temp_dir().join(format!("beatlane-decode-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = load_audio_file(&path, ChannelMode::FirstChannel).unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.source_channels, 2);
        assert_eq!(decoded.samples.len(), 100);
        assert!((decoded.samples[0] - 0.5).abs() < 1e-4);

        let mixed = load_audio_file(&path, ChannelMode::Mixdown).unwrap();
        assert!((mixed.samples[0] - 0.25).abs() < 1e-4);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_audio_file("/nonexistent/beatlane-track.mp3", ChannelMode::Mixdown);
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
