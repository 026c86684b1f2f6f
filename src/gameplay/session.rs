use log::{debug, info, warn};
use serde::Serialize;

use super::grid::{EntityId, EntityUpdate, GridPool};
use super::schedule::{speed_for_bpm, travel_time, EventScheduler, ScheduledEvent};
use crate::audio::bpm::DEFAULT_BPM;
use crate::audio::pitch::Rgb;
use crate::config::{GameplayConfig, GridConfig};

/// Instruction for the renderer to create an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnInstruction {
    pub id: EntityId,
    pub lane: usize,
    pub row: usize,
    pub color: Rgb,
    /// When the entity reaches the judgment line.
    pub arrival_time: f64,
}

/// Everything that changed during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub spawned: Vec<SpawnInstruction>,
    pub updates: Vec<EntityUpdate>,
    pub retired: Vec<EntityId>,
    /// Promoted events lost because their neighbourhood was saturated.
    pub dropped: Vec<ScheduledEvent>,
    /// A due event is waiting for a free pool slot.
    pub stalled: bool,
}

/// Per-track gameplay state: schedule cursor, active pool, tempo in effect.
///
/// Driven by a single clock from a single thread; every call runs in time bounded by
/// the pool capacity plus the events it promotes.
pub struct GameSession {
    grid: GridConfig,
    gameplay: GameplayConfig,
    scheduler: EventScheduler,
    pool: GridPool,
    bpm: f64,
    track_time: f64,
    stalled: bool,
    drained_logged: bool,
}

impl GameSession {
    pub fn new(grid: GridConfig, gameplay: GameplayConfig, bpm: f64) -> Self {
        let bpm = usable_bpm(bpm);
        let speed = speed_for_bpm(bpm, gameplay.spawn_distance, gameplay.speed_factor);
        let pool = GridPool::new(&grid, &gameplay, speed);
        Self {
            scheduler: EventScheduler::new(Vec::new(), travel_time(gameplay.spawn_distance, speed)),
            pool,
            grid,
            gameplay,
            bpm,
            track_time: 0.0,
            stalled: false,
            drained_logged: false,
        }
    }

    /// Replace the schedule for a new track: cursor reset, pool cleared, speed recomputed.
    ///
    /// A tempo that is not a positive finite number falls back to the default tempo.
    pub fn load_track(&mut self, schedule: Vec<ScheduledEvent>, bpm: f64) {
        let bpm = usable_bpm(bpm);
        let speed = speed_for_bpm(bpm, self.gameplay.spawn_distance, self.gameplay.speed_factor);
        let travel = travel_time(self.gameplay.spawn_distance, speed);

        self.bpm = bpm;
        self.pool.clear();
        self.pool.set_speed(speed);
        self.scheduler = EventScheduler::new(schedule, travel);
        self.track_time = 0.0;
        self.stalled = false;
        self.drained_logged = false;

        info!(
            "Loaded schedule: {} events at {:.0} BPM (speed {:.2}/s, travel {:.2}s)",
            self.scheduler.events().len(),
            bpm,
            speed,
            travel
        );
    }

    /// Drop all active entities and restart the current schedule from its first event.
    pub fn clear(&mut self) {
        let events = self.scheduler.events().to_vec();
        let bpm = self.bpm;
        self.load_track(events, bpm);
    }

    pub fn tick(&mut self, track_time: f64) -> TickReport {
        let mut report = TickReport::default();

        self.track_time = track_time;
        report.retired = self.pool.advance_to(track_time);

        let due = self.scheduler.tick(track_time, self.pool.free_slots());
        for event in due {
            let Some((lane, row)) = self.pool.place(event.lane, event.row) else {
                warn!(
                    "Placement saturated around ({}, {}); dropping beat at {:.2}s",
                    event.lane, event.row, event.time
                );
                report.dropped.push(event);
                continue;
            };

            let spawn_time = self.scheduler.required_spawn_time(&event);
            let Some(id) = self.pool.spawn(lane, row, event.color, spawn_time, event.time) else {
                warn!("Pool at capacity; dropping beat at {:.2}s", event.time);
                report.dropped.push(event);
                continue;
            };
            debug!(
                "Spawned {} for beat at {:.2}s in ({}, {}) at track time {:.2}s",
                id, event.time, lane, row, track_time
            );
            report.spawned.push(SpawnInstruction {
                id,
                lane,
                row,
                color: event.color,
                arrival_time: event.time,
            });
        }

        report.stalled = self.pool.is_full() && self.scheduler.has_due(track_time);
        if report.stalled && !self.stalled {
            debug!(
                "Pool full ({} active); {} events waiting",
                self.pool.len(),
                self.scheduler.pending()
            );
        }
        self.stalled = report.stalled;

        if self.scheduler.is_drained() && !self.drained_logged {
            info!("Schedule drained at track time {:.2}s", track_time);
            self.drained_logged = true;
        }

        report.updates = self.pool.positions();
        report
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn speed(&self) -> f64 {
        self.pool.speed()
    }

    pub fn travel_time(&self) -> f64 {
        self.scheduler.travel_time()
    }

    pub fn track_time(&self) -> f64 {
        self.track_time
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &GridPool {
        &self.pool
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Nothing left to spawn and nothing on screen.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_drained() && self.pool.is_empty()
    }
}

fn usable_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        return bpm;
    }
    warn!("Unusable tempo {} BPM; falling back to {} BPM", bpm, DEFAULT_BPM);
    DEFAULT_BPM
}
