use std::time::{Duration, Instant};

/// Source of monotonic track time in seconds, synchronized to playback.
pub trait TrackClock {
    fn track_time(&self) -> f64;
}

/// Wall-clock track time for headless runs. Pausing freezes the reading.
#[derive(Debug, Clone)]
pub struct WallClock {
    started: Option<Instant>,
    accumulated: Duration,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            started: None,
            accumulated: Duration::ZERO,
        }
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.started = None;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackClock for WallClock {
    fn track_time(&self) -> f64 {
        let running = self.started.map_or(Duration::ZERO, |started| started.elapsed());
        (self.accumulated + running).as_secs_f64()
    }
}

/// Externally stepped clock for tests and offline simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    time: f64,
}

impl ManualClock {
    pub fn new(time: f64) -> Self {
        Self { time }
    }

    pub fn set(&mut self, time: f64) {
        self.time = time;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time += delta;
    }
}

impl TrackClock for ManualClock {
    fn track_time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let mut clock = ManualClock::new(1.0);
        clock.advance(0.5);
        assert_eq!(clock.track_time(), 1.5);
        clock.set(0.25);
        assert_eq!(clock.track_time(), 0.25);
    }

    #[test]
    fn test_wall_clock_pause_freezes_time() {
        let mut clock = WallClock::new();
        assert_eq!(clock.track_time(), 0.0);
        clock.start();
        std::thread::sleep(Duration::from_millis(5));
        clock.pause();
        let frozen = clock.track_time();
        assert!(frozen > 0.0);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.track_time(), frozen);
        clock.reset();
        assert!(!clock.is_running());
        assert_eq!(clock.track_time(), 0.0);
    }
}
