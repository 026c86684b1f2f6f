use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::pitch::Rgb;
use crate::error::{Error, Result};

/// Onset detection parameters.
///
/// The detector calibrates on the first `calibration_seconds` of audio, then accepts a window
/// when its energy exceeds `baseline * threshold_multiplier * ramp`, where
/// `ramp = min(1, elapsed / ramp_up_seconds)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    pub hop_size: usize,
    pub window_size: usize,
    pub threshold_multiplier: f32,
    pub min_gap_seconds: f64,
    /// Windows starting before this are never considered (intro noise).
    pub warmup_skip_seconds: f64,
    pub ramp_up_seconds: f64,
    pub calibration_seconds: f64,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            hop_size: 512,
            window_size: 1024,
            threshold_multiplier: 3.0,
            min_gap_seconds: 1.0,
            warmup_skip_seconds: 3.0,
            ramp_up_seconds: 15.0,
            calibration_seconds: 1.0,
        }
    }
}

/// Parameters for deriving sparse pitch samples from the decoded track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchTrackerConfig {
    pub window_size: usize,
    pub hop_size: usize,
    pub min_hz: f64,
    pub max_hz: f64,
    /// Frames quieter than this RMS produce no pitch sample.
    pub silence_rms: f32,
}

impl Default for PitchTrackerConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 512,
            min_hz: 80.0,
            max_hz: 2000.0,
            silence_rms: 0.01,
        }
    }
}

/// How onsets become scheduled events: pitch lookup, row/color bands, palette.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub pitch_window_radius: f64,
    pub pitch_min_hz: f64,
    pub pitch_max_hz: f64,
    pub default_bpm: f64,
    pub even_color: Rgb,
    pub odd_color: Rgb,
    /// High pitches blend the palette color toward this one.
    pub accent_color: Rgb,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            pitch_window_radius: 0.15,
            pitch_min_hz: 80.0,
            pitch_max_hz: 1000.0,
            default_bpm: crate::audio::bpm::DEFAULT_BPM,
            even_color: Rgb::AQUA_BLUE,
            odd_color: Rgb::CRIMSON_RED,
            accent_color: Rgb::WHITE,
        }
    }
}

/// Lane/row grid layout, plus the world-space block geometry used for positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub lanes: usize,
    pub rows: usize,
    pub block_size: f32,
    pub bridge_height: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            lanes: 4,
            rows: 3,
            block_size: 0.5,
            bridge_height: 0.25,
        }
    }
}

/// Runtime pool and motion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    pub pool_capacity: usize,
    pub spawn_distance: f64,
    pub speed_factor: f64,
    /// Distance past the judgment line an entity travels before it retires.
    pub arrival_tolerance: f64,
    /// Track seconds a freshly spawned entity keeps its cell reserved.
    pub reservation_seconds: f64,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 10,
            spawn_distance: 20.0,
            speed_factor: 0.25,
            arrival_tolerance: 1.0,
            reservation_seconds: 0.5,
        }
    }
}

/// Everything the analysis pass and the runtime session need, loadable from one JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub onset: OnsetConfig,
    pub pitch_tracker: PitchTrackerConfig,
    pub schedule: ScheduleConfig,
    pub grid: GridConfig,
    pub gameplay: GameplayConfig,
}

impl PipelineConfig {
    /// Load a configuration file. Missing fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(&path)?;
        let config: PipelineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let onset = &self.onset;
        if onset.hop_size == 0 || onset.window_size == 0 {
            return Err(invalid("onset hop_size and window_size must be non-zero"));
        }
        if onset.calibration_seconds <= 0.0 {
            return Err(invalid("onset calibration_seconds must be positive"));
        }
        if onset.min_gap_seconds < 0.0 || onset.ramp_up_seconds < 0.0 {
            return Err(invalid("onset gaps and ramp durations cannot be negative"));
        }

        let tracker = &self.pitch_tracker;
        if tracker.hop_size == 0 || tracker.window_size < 2 {
            return Err(invalid("pitch tracker needs hop_size > 0 and window_size >= 2"));
        }
        if tracker.max_hz <= tracker.min_hz {
            return Err(invalid("pitch tracker max_hz must exceed min_hz"));
        }

        let schedule = &self.schedule;
        if schedule.pitch_max_hz <= schedule.pitch_min_hz {
            return Err(invalid("schedule pitch_max_hz must exceed pitch_min_hz"));
        }
        if schedule.pitch_window_radius < 0.0 {
            return Err(invalid("schedule pitch_window_radius cannot be negative"));
        }
        if schedule.default_bpm <= 0.0 {
            return Err(invalid("schedule default_bpm must be positive"));
        }

        if self.grid.lanes == 0 || self.grid.rows == 0 {
            return Err(invalid("grid needs at least one lane and one row"));
        }

        let gameplay = &self.gameplay;
        if gameplay.pool_capacity == 0 {
            return Err(invalid("gameplay pool_capacity must be non-zero"));
        }
        if gameplay.spawn_distance <= 0.0 || gameplay.speed_factor <= 0.0 {
            return Err(invalid("gameplay spawn_distance and speed_factor must be positive"));
        }
        if gameplay.reservation_seconds < 0.0 || gameplay.arrival_tolerance < 0.0 {
            return Err(invalid("gameplay tolerances cannot be negative"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.onset.hop_size, 512);
        assert_eq!(config.onset.window_size, 1024);
        assert_eq!(config.grid.lanes, 4);
        assert_eq!(config.grid.rows, 3);
        assert_eq!(config.gameplay.pool_capacity, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "grid": { "lanes": 6 }, "gameplay": { "pool_capacity": 4 } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.grid.lanes, 6);
        assert_eq!(config.grid.rows, 3);
        assert_eq!(config.gameplay.pool_capacity, 4);
        assert_eq!(config.onset.threshold_multiplier, 3.0);
        assert_eq!(config.schedule.even_color, Rgb::AQUA_BLUE);
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let mut config = PipelineConfig::default();
        config.onset.hop_size = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.schedule.pitch_max_hz = config.schedule.pitch_min_hz;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.gameplay.pool_capacity = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("beatlane-config-{}.json", std::process::id()));
        let mut config = PipelineConfig::default();
        config.gameplay.speed_factor = 0.5;
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.gameplay.speed_factor, 0.5);
        let _ = std::fs::remove_file(&path);
    }
}
