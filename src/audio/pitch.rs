use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One externally supplied pitch estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    pub time: f64,
    #[serde(rename = "frequencyHz", alias = "frequency_hz", alias = "pitch")]
    pub frequency_hz: f64,
}

/// Pitch samples sorted once by time for windowed lookup.
#[derive(Debug, Clone, Default)]
pub struct PitchTrack {
    samples: Vec<PitchSample>,
}

impl PitchTrack {
    /// Takes samples in any order.
    pub fn new(mut samples: Vec<PitchSample>) -> Self {
        samples.retain(|s| s.time.is_finite() && s.frequency_hz.is_finite());
        samples.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { samples }
    }

    pub fn samples(&self) -> &[PitchSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average_pitch_near(&self, time: f64, window_radius: f64) -> Option<f64> {
        average_pitch_near(time, &self.samples, window_radius)
    }
}

/// Mean frequency of the samples within `window_radius` seconds of `time`.
///
/// `sorted_samples` must be ascending by time; [`PitchTrack`] guarantees that.
pub fn average_pitch_near(time: f64, sorted_samples: &[PitchSample], window_radius: f64) -> Option<f64> {
    let lower = sorted_samples.partition_point(|s| s.time < time - window_radius);
    let upper = sorted_samples.partition_point(|s| s.time <= time + window_radius);
    if lower >= upper {
        return None;
    }

    let in_range = &sorted_samples[lower..upper];
    let sum: f64 = in_range.iter().map(|s| s.frequency_hz).sum();
    Some(sum / in_range.len() as f64)
}

/// Position of `pitch_hz` within `[min_hz, max_hz]`, clamped to 0.0-1.0.
pub fn pitch_ratio(pitch_hz: f64, min_hz: f64, max_hz: f64) -> f64 {
    let span = max_hz - min_hz;
    if span <= 0.0 || pitch_hz.is_nan() {
        return 0.0;
    }
    ((pitch_hz - min_hz) / span).clamp(0.0, 1.0)
}

/// Row band for a pitch; a missing pitch lands on the middle row.
pub fn map_pitch_to_row(pitch_hz: Option<f64>, min_hz: f64, max_hz: f64, row_count: usize) -> usize {
    if row_count == 0 {
        return 0;
    }
    match pitch_hz.filter(|p| !p.is_nan()) {
        None => row_count / 2,
        Some(pitch) => {
            let ratio = pitch_ratio(pitch, min_hz, max_hz);
            ((row_count as f64 * ratio).floor() as usize).min(row_count - 1)
        }
    }
}

/// Blend `base` toward `accent` in proportion to the pitch ratio.
pub fn map_pitch_to_color(pitch_hz: Option<f64>, min_hz: f64, max_hz: f64, base: Rgb, accent: Rgb) -> Rgb {
    match pitch_hz.filter(|p| !p.is_nan()) {
        None => base,
        Some(pitch) => base.blend(accent, pitch_ratio(pitch, min_hz, max_hz)),
    }
}

/// 24-bit RGB color, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const AQUA_BLUE: Rgb = Rgb(0x00ffff);
    pub const CRIMSON_RED: Rgb = Rgb(0xdc143c);
    pub const WHITE: Rgb = Rgb(0xffffff);

    pub fn from_channels(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Per-channel linear interpolation; `t` is clamped to 0.0-1.0.
    pub fn blend(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::from_channels(
            mix(self.r(), other.r()),
            mix(self.g(), other.g()),
            mix(self.b(), other.b()),
        )
    }

    pub fn parse_hex(text: &str) -> Option<Rgb> {
        let digits = text.trim().trim_start_matches('#').trim_start_matches("0x");
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Rgb)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xff_ffff)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Rgb::parse_hex(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}', expected #rrggbb", text)))
    }
}
