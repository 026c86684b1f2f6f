use criterion::{black_box, criterion_group, criterion_main, Criterion};

use beatlane::audio::{OnsetDetector, PitchTracker, SpectralFeatureExtractor};
use beatlane::config::OnsetConfig;

const SAMPLE_RATE: u32 = 44100;

/// 30 seconds of low noise with a short click every half second.
fn synthetic_track() -> Vec<f32> {
    let len = SAMPLE_RATE as usize * 30;
    let beat = SAMPLE_RATE as usize / 2;
    (0..len)
        .map(|i| {
            let noise = if i % 3 == 0 { 0.002 } else { -0.001 };
            if i % beat < 600 {
                0.6 * (i as f32 * 0.15).sin()
            } else {
                noise
            }
        })
        .collect()
}

fn bench_onsets(c: &mut Criterion) {
    let samples = synthetic_track();
    let detector = OnsetDetector::new(OnsetConfig::default());
    let extractor = SpectralFeatureExtractor::new(SAMPLE_RATE, detector.config().window_size);

    c.bench_function("detect_onsets_30s", |b| {
        b.iter(|| detector.detect(black_box(&samples), SAMPLE_RATE, &extractor))
    });
}

fn bench_pitch_tracking(c: &mut Criterion) {
    let samples = synthetic_track();
    let tracker = PitchTracker::default();

    c.bench_function("track_pitch_30s", |b| {
        b.iter(|| tracker.track(black_box(&samples), SAMPLE_RATE))
    });
}

criterion_group!(benches, bench_onsets, bench_pitch_tracking);
criterion_main!(benches);
