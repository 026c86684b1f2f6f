//! End-to-end tests for the beatlane pipeline.
//!
//! Synthetic audio goes through onset detection, tempo estimation and schedule
//! building, then the schedule is replayed against a manually stepped clock.

use beatlane::audio::{
    detect_onsets, estimate_bpm, OnsetEvent, PitchSample, PitchTrack, TrackAnalyzer,
};
use beatlane::config::{GameplayConfig, GridConfig, OnsetConfig, ScheduleConfig};
use beatlane::gameplay::{build_schedule, GameSession, ManualClock, TrackClock};
use beatlane::{Error, PipelineConfig};

// ─── Helpers ───────────────────────────────────────────────────────────────

const RATE: u32 = 8000;
const TICK: f64 = 1.0 / 60.0;

/// Low alternating noise with a loud 50 ms burst at each time in `bursts`.
fn track_with_bursts(seconds: f64, bursts: &[f64]) -> Vec<f32> {
    let mut samples: Vec<f32> = (0..(seconds * RATE as f64) as usize)
        .map(|i| if i % 2 == 0 { 0.001 } else { -0.001 })
        .collect();
    for &at in bursts {
        let start = (at * RATE as f64) as usize;
        for (offset, sample) in samples[start..start + 400].iter_mut().enumerate() {
            *sample = if offset % 2 == 0 { 0.5 } else { -0.5 };
        }
    }
    samples
}

/// Onset windows aligned with the bursts.
fn aligned_config() -> PipelineConfig {
    PipelineConfig {
        onset: OnsetConfig {
            hop_size: 400,
            window_size: 400,
            ..OnsetConfig::default()
        },
        ..PipelineConfig::default()
    }
}

fn onsets_at(times: &[f64]) -> Vec<OnsetEvent> {
    times.iter().map(|&time| OnsetEvent { time, rms: 0.5 }).collect()
}

// ─── Offline pass ──────────────────────────────────────────────────────────

#[test]
fn test_three_bursts_give_forty_bpm() {
    let samples = track_with_bursts(8.0, &[3.0, 4.5, 6.0]);
    let pitches = PitchTrack::new(vec![
        PitchSample { time: 3.0, frequency_hz: 85.0 },
        PitchSample { time: 4.5, frequency_hz: 990.0 },
    ]);
    let analysis = TrackAnalyzer::new(aligned_config())
        .with_pitches(pitches)
        .analyze_samples(&samples, RATE, "bursts")
        .unwrap();

    let times: Vec<f64> = analysis.onsets.iter().map(|o| o.time).collect();
    assert_eq!(times, vec![3.0, 4.5, 6.0]);
    assert_eq!(analysis.bpm, 40.0);

    let layout: Vec<(usize, usize)> = analysis.schedule.iter().map(|e| (e.lane, e.row)).collect();
    // low pitch, high pitch, no pitch
    assert_eq!(layout, vec![(0, 0), (1, 2), (2, 1)]);
}

#[test]
fn test_steady_pulse_tempo() {
    let bursts: Vec<f64> = (3..=10).map(|s| s as f64).collect();
    let samples = track_with_bursts(12.0, &bursts);
    let analysis = TrackAnalyzer::new(aligned_config())
        .with_pitches(PitchTrack::default())
        .analyze_samples(&samples, RATE, "pulse")
        .unwrap();
    assert_eq!(analysis.onsets.len(), bursts.len());
    assert_eq!(analysis.bpm, 60.0);
}

#[test]
fn test_too_short_for_calibration() {
    let result = detect_onsets(&vec![0.0; RATE as usize - 1], RATE, 512, 1024);
    match result {
        Err(Error::InsufficientAudio { samples, required }) => {
            assert_eq!(samples, 7999);
            assert_eq!(required, 8000);
        }
        other => panic!("expected InsufficientAudio, got {:?}", other),
    }
}

#[test]
fn test_silent_track_yields_empty_schedule() {
    let samples = track_with_bursts(6.0, &[]);
    let analysis = TrackAnalyzer::new(aligned_config())
        .with_pitches(PitchTrack::default())
        .analyze_samples(&samples, RATE, "quiet")
        .unwrap();
    assert!(analysis.onsets.is_empty());
    assert_eq!(analysis.bpm, 120.0);
    assert!(analysis.schedule.is_empty());
}

// ─── Replay ────────────────────────────────────────────────────────────────

#[test]
fn test_replay_arrives_on_each_beat() {
    let samples = track_with_bursts(8.0, &[3.0, 4.5, 6.0]);
    let analysis = TrackAnalyzer::new(aligned_config())
        .with_pitches(PitchTrack::default())
        .analyze_samples(&samples, RATE, "bursts")
        .unwrap();

    let mut session = GameSession::new(GridConfig::default(), GameplayConfig::default(), analysis.bpm);
    session.load_track(analysis.schedule.clone(), analysis.bpm);
    // 40 BPM: speed 20 * (40 / 60) * 0.25
    assert!((session.travel_time() - 6.0).abs() < 1e-9);

    let report = session.tick(0.5);
    assert_eq!(report.spawned.len(), 3);

    for (index, &beat) in [3.0, 4.5, 6.0].iter().enumerate() {
        let report = session.tick(beat);
        assert!(report.spawned.is_empty());
        let update = report
            .updates
            .iter()
            .find(|u| u.id.0 == index as u64)
            .expect("entity still active at its beat");
        assert!(update.z.abs() < 1e-9, "beat {} arrived at z = {}", beat, update.z);
    }

    session.tick(7.0);
    assert!(session.is_finished());
}

#[test]
fn test_each_event_spawns_once_in_order() {
    let times: Vec<f64> = (0..40).map(|i| 3.0 + i as f64 * 0.5).collect();
    let schedule = build_schedule(
        &onsets_at(&times),
        &PitchTrack::default(),
        &ScheduleConfig::default(),
        &GridConfig::default(),
    );
    let bpm = estimate_bpm(&onsets_at(&times), 120.0);
    assert_eq!(bpm, 120.0);

    let gameplay = GameplayConfig {
        pool_capacity: 3,
        ..GameplayConfig::default()
    };
    let mut session = GameSession::new(GridConfig::default(), gameplay, bpm);
    session.load_track(schedule, bpm);

    let mut clock = ManualClock::new(0.0);
    let mut arrivals = Vec::new();
    let mut stalled = false;
    let mut retired = 0;

    while clock.track_time() < 40.0 {
        let report = session.tick(clock.track_time());
        assert!(report.dropped.is_empty());
        assert!(report.updates.len() <= 3);
        arrivals.extend(report.spawned.iter().map(|s| s.arrival_time));
        retired += report.retired.len();
        stalled |= report.stalled;
        clock.advance(TICK);
    }

    assert_eq!(arrivals, times);
    assert!(stalled);
    assert_eq!(retired, times.len());
    assert!(session.is_finished());
}

#[test]
fn test_far_apart_onsets_still_drain() {
    let samples = track_with_bursts(210.0, &[3.0, 200.0]);
    let analysis = TrackAnalyzer::new(aligned_config())
        .with_pitches(PitchTrack::default())
        .analyze_samples(&samples, RATE, "sparse")
        .unwrap();
    let times: Vec<f64> = analysis.onsets.iter().map(|o| o.time).collect();
    assert_eq!(times, vec![3.0, 200.0]);
    // round(60 / 197)
    assert_eq!(analysis.bpm, 0.0);

    let mut session = GameSession::new(GridConfig::default(), GameplayConfig::default(), analysis.bpm);
    session.load_track(analysis.schedule.clone(), analysis.bpm);
    assert_eq!(session.bpm(), 120.0);
    assert!(session.travel_time().is_finite());

    let mut clock = ManualClock::new(0.0);
    let mut spawned = 0;
    while clock.track_time() < 205.0 {
        let report = session.tick(clock.track_time());
        assert!(report.updates.iter().all(|u| u.z.is_finite()));
        spawned += report.spawned.len();
        clock.advance(TICK);
    }
    assert_eq!(spawned, 2);
    assert!(session.is_finished());
}

#[test]
fn test_seeking_backwards_does_not_respawn() {
    let times = [3.0, 4.0, 5.0];
    let schedule = build_schedule(
        &onsets_at(&times),
        &PitchTrack::default(),
        &ScheduleConfig::default(),
        &GridConfig::default(),
    );
    let mut session = GameSession::new(GridConfig::default(), GameplayConfig::default(), 120.0);
    session.load_track(schedule, 120.0);

    assert_eq!(session.tick(2.5).spawned.len(), 2);
    let report = session.tick(1.0);
    assert!(report.spawned.is_empty());
    // positions follow the clock backwards
    assert_eq!(report.updates.len(), 2);
    assert!((report.updates[0].z - 20.0).abs() < 1e-9);

    assert_eq!(session.tick(3.0).spawned.len(), 1);
    assert!(session.scheduler().is_drained());
}
