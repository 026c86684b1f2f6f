use super::onset::OnsetEvent;

pub const DEFAULT_BPM: f64 = 120.0;

/// Tempo from the mean inter-onset interval, rounded to a whole BPM.
///
/// No outlier rejection: one spurious onset skews the mean. Fewer than two onsets
/// returns `default_bpm`.
pub fn estimate_bpm(onsets: &[OnsetEvent], default_bpm: f64) -> f64 {
    let times: Vec<f64> = onsets.iter().map(|o| o.time).collect();
    estimate_bpm_from_times(&times, default_bpm)
}

pub fn estimate_bpm_from_times(times: &[f64], default_bpm: f64) -> f64 {
    if times.len() < 2 {
        return default_bpm;
    }

    let intervals: Vec<f64> = times.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let average_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;

    if average_interval <= 0.0 || !average_interval.is_finite() {
        return default_bpm;
    }

    (60.0 / average_interval).round()
}
