use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::audio::onset::OnsetEvent;
use crate::audio::pitch::{map_pitch_to_color, map_pitch_to_row, PitchTrack, Rgb};
use crate::config::{GridConfig, ScheduleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Beat,
}

/// One gameplay event: the entity for it must reach the judgment line at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub time: f64,
    pub lane: usize,
    pub row: usize,
    pub color: Rgb,
    pub kind: EventKind,
}

/// Lay out one event per onset, in onset order.
///
/// Lanes are assigned round-robin; rows and color shade come from the average pitch
/// around each onset; the base color alternates with index parity.
pub fn build_schedule(
    onsets: &[OnsetEvent],
    pitches: &PitchTrack,
    schedule: &ScheduleConfig,
    grid: &GridConfig,
) -> Vec<ScheduledEvent> {
    let lanes = grid.lanes.max(1);

    let events: Vec<ScheduledEvent> = onsets
        .iter()
        .enumerate()
        .map(|(index, onset)| {
            let pitch = pitches.average_pitch_near(onset.time, schedule.pitch_window_radius);
            let row = map_pitch_to_row(pitch, schedule.pitch_min_hz, schedule.pitch_max_hz, grid.rows);
            let base = if index % 2 == 0 {
                schedule.even_color
            } else {
                schedule.odd_color
            };
            let color = map_pitch_to_color(
                pitch,
                schedule.pitch_min_hz,
                schedule.pitch_max_hz,
                base,
                schedule.accent_color,
            );

            debug!(
                "Beat {} at {:.2}s -> pitch {} -> lane {}, row {}, color {}",
                index,
                onset.time,
                pitch.map_or_else(|| "n/a".to_string(), |p| format!("{:.1}Hz", p)),
                index % lanes,
                row,
                color
            );

            ScheduledEvent {
                time: onset.time,
                lane: index % lanes,
                row,
                color,
                kind: EventKind::Beat,
            }
        })
        .collect();

    info!("Built schedule of {} events", events.len());
    events
}

/// Entity speed in world units per track second.
pub fn speed_for_bpm(bpm: f64, spawn_distance: f64, speed_factor: f64) -> f64 {
    spawn_distance * (bpm / 60.0) * speed_factor
}

/// Seconds an entity needs to cover `spawn_distance` at `speed`.
pub fn travel_time(spawn_distance: f64, speed: f64) -> f64 {
    if speed <= 0.0 {
        return f64::INFINITY;
    }
    spawn_distance / speed
}

/// Runtime cursor over a time-ordered schedule.
///
/// Each tick promotes, in order, the events whose required spawn time
/// (`event.time - travel_time`) has been reached. Scanning stops at the first event that
/// is not yet due, so the cost of a tick is bounded by what it promotes.
#[derive(Debug, Clone, Default)]
pub struct EventScheduler {
    events: Vec<ScheduledEvent>,
    next_index: usize,
    travel_time: f64,
}

impl EventScheduler {
    pub fn new(mut events: Vec<ScheduledEvent>, travel_time: f64) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            events,
            next_index: 0,
            travel_time,
        }
    }

    /// Promote due events, at most `free_slots` of them.
    ///
    /// An event that is due while no slot is free stays pending; later events wait behind it.
    pub fn tick(&mut self, current_track_time: f64, free_slots: usize) -> Vec<ScheduledEvent> {
        let mut promoted = Vec::new();

        while let Some(event) = self.events.get(self.next_index) {
            if current_track_time < self.required_spawn_time(event) {
                break;
            }
            if promoted.len() >= free_slots {
                break;
            }
            promoted.push(*event);
            self.next_index += 1;
        }

        promoted
    }

    pub fn required_spawn_time(&self, event: &ScheduledEvent) -> f64 {
        event.time - self.travel_time
    }

    /// Spawn time of the next pending event, if any.
    pub fn next_due_time(&self) -> Option<f64> {
        self.events
            .get(self.next_index)
            .map(|event| self.required_spawn_time(event))
    }

    /// Whether the next pending event is already due at `current_track_time`.
    pub fn has_due(&self, current_track_time: f64) -> bool {
        self.next_due_time().map_or(false, |due| current_track_time >= due)
    }

    /// Index of the most recently promoted event; `None` before the first promotion.
    pub fn last_spawned_index(&self) -> Option<usize> {
        self.next_index.checked_sub(1)
    }

    pub fn is_drained(&self) -> bool {
        self.next_index >= self.events.len()
    }

    pub fn pending(&self) -> usize {
        self.events.len() - self.next_index
    }

    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn travel_time(&self) -> f64 {
        self.travel_time
    }
}
