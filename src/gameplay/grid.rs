use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audio::pitch::Rgb;
use crate::config::{GameplayConfig, GridConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box_{}", self.0)
    }
}

/// An entity travelling toward the judgment line. Its position is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEntity {
    pub id: EntityId,
    pub lane: usize,
    pub row: usize,
    pub color: Rgb,
    pub spawn_track_time: f64,
    /// Onset time the entity is meant to arrive at.
    pub event_time: f64,
    reserved: bool,
}

/// Per-tick position report for one active entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityUpdate {
    pub id: EntityId,
    pub lane: usize,
    pub row: usize,
    /// Distance covered since spawn.
    pub displacement: f64,
    pub x: f32,
    pub y: f32,
    /// Distance left to the judgment line; negative once past it.
    pub z: f64,
}

/// Bounded pool of active entities on a lane x row grid.
///
/// Each cell carries a reservation counter. A spawned entity holds its cell for
/// `reservation_seconds` of track time (or until it retires), which is what `place`
/// consults when deciding whether a cell is free.
pub struct GridPool {
    grid: GridConfig,
    gameplay: GameplayConfig,
    speed: f64,
    track_time: f64,
    entities: Vec<ActiveEntity>,
    reservations: Vec<u32>,
    next_id: u64,
}

impl GridPool {
    pub fn new(grid: &GridConfig, gameplay: &GameplayConfig, speed: f64) -> Self {
        let cells = grid.lanes * grid.rows;
        Self {
            grid: grid.clone(),
            gameplay: gameplay.clone(),
            speed,
            track_time: 0.0,
            entities: Vec::with_capacity(gameplay.pool_capacity),
            reservations: vec![0; cells],
            next_id: 0,
        }
    }

    /// The requested cell if free, otherwise the first free cell scanning lanes
    /// `lane-1..=lane+1` (clamped) ascending, rows ascending within each lane.
    /// `None` means the neighbourhood is saturated.
    pub fn place(&self, lane: usize, row: usize) -> Option<(usize, usize)> {
        if self.grid.lanes == 0 || self.grid.rows == 0 {
            return None;
        }
        let lane = lane.min(self.grid.lanes - 1);
        let row = row.min(self.grid.rows - 1);

        if !self.is_occupied(lane, row) {
            return Some((lane, row));
        }

        let first_lane = lane.saturating_sub(1);
        let last_lane = (lane + 1).min(self.grid.lanes - 1);
        for candidate_lane in first_lane..=last_lane {
            for candidate_row in 0..self.grid.rows {
                if !self.is_occupied(candidate_lane, candidate_row) {
                    debug!(
                        "Cell ({}, {}) occupied, relocating to ({}, {})",
                        lane, row, candidate_lane, candidate_row
                    );
                    return Some((candidate_lane, candidate_row));
                }
            }
        }

        None
    }

    /// Add an entity at a cell returned by [`GridPool::place`] and reserve that cell.
    /// Returns `None` when the pool is already at capacity.
    pub fn spawn(
        &mut self,
        lane: usize,
        row: usize,
        color: Rgb,
        spawn_track_time: f64,
        event_time: f64,
    ) -> Option<EntityId> {
        if self.is_full() {
            return None;
        }

        let id = EntityId(self.next_id);
        self.next_id += 1;

        let reserved = self.track_time - spawn_track_time < self.gameplay.reservation_seconds;
        if reserved {
            if let Some(cell) = self.cell_index(lane, row) {
                self.reservations[cell] += 1;
            }
        }

        self.entities.push(ActiveEntity {
            id,
            lane,
            row,
            color,
            spawn_track_time,
            event_time,
            reserved,
        });
        trace!("Spawned {} at ({}, {})", id, lane, row);
        Some(id)
    }

    /// Move the pool clock forward and retire entities past the judgment line.
    pub fn advance(&mut self, delta_track_time: f64) -> Vec<EntityId> {
        let target = self.track_time + delta_track_time;
        self.advance_to(target)
    }

    pub fn advance_to(&mut self, track_time: f64) -> Vec<EntityId> {
        self.track_time = track_time;

        let retire_at = self.gameplay.spawn_distance + self.gameplay.arrival_tolerance;
        let reservation_seconds = self.gameplay.reservation_seconds;
        let speed = self.speed;
        let mut retired = Vec::new();
        let mut released = Vec::new();

        self.entities.retain_mut(|entity| {
            let elapsed = track_time - entity.spawn_track_time;
            let past_line = elapsed * speed > retire_at;

            if entity.reserved && (past_line || elapsed >= reservation_seconds) {
                entity.reserved = false;
                released.push((entity.lane, entity.row));
            }
            if past_line {
                retired.push(entity.id);
            }
            !past_line
        });

        for (lane, row) in released {
            if let Some(cell) = self.cell_index(lane, row) {
                self.reservations[cell] = self.reservations[cell].saturating_sub(1);
            }
        }

        if !retired.is_empty() {
            trace!("Retired {} entities at {:.3}s", retired.len(), track_time);
        }
        retired
    }

    pub fn positions(&self) -> Vec<EntityUpdate> {
        self.entities
            .iter()
            .map(|entity| {
                let displacement = (self.track_time - entity.spawn_track_time) * self.speed;
                EntityUpdate {
                    id: entity.id,
                    lane: entity.lane,
                    row: entity.row,
                    displacement,
                    x: self.lane_x(entity.lane),
                    y: self.row_y(entity.row),
                    z: self.gameplay.spawn_distance - displacement,
                }
            })
            .collect()
    }

    /// Drop every entity and reservation (track change).
    pub fn clear(&mut self) {
        self.entities.clear();
        self.reservations.iter_mut().for_each(|count| *count = 0);
        self.next_id = 0;
        self.track_time = 0.0;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn is_occupied(&self, lane: usize, row: usize) -> bool {
        self.cell_index(lane, row)
            .map_or(true, |cell| self.reservations[cell] > 0)
    }

    pub fn is_full(&self) -> bool {
        self.entities.len() >= self.gameplay.pool_capacity
    }

    pub fn free_slots(&self) -> usize {
        self.gameplay.pool_capacity.saturating_sub(self.entities.len())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[ActiveEntity] {
        &self.entities
    }

    pub fn track_time(&self) -> f64 {
        self.track_time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// World x of a lane center; lanes are centered on x = 0.
    pub fn lane_x(&self, lane: usize) -> f32 {
        (lane as f32 - (self.grid.lanes as f32 - 1.0) / 2.0) * self.grid.block_size
    }

    /// World y of a row center, stacked on top of the bridge.
    pub fn row_y(&self, row: usize) -> f32 {
        let row = row.min(self.grid.rows.saturating_sub(1));
        self.grid.bridge_height + row as f32 * self.grid.block_size + self.grid.block_size / 2.0
    }

    fn cell_index(&self, lane: usize, row: usize) -> Option<usize> {
        (lane < self.grid.lanes && row < self.grid.rows).then(|| lane * self.grid.rows + row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> GridPool {
        GridPool::new(&GridConfig::default(), &GameplayConfig::default(), 10.0)
    }

    #[test]
    fn test_free_cell_is_returned_as_requested() {
        let pool = pool();
        assert_eq!(pool.place(2, 1), Some((2, 1)));
    }

    #[test]
    fn test_occupied_cell_scans_neighbourhood_in_order() {
        let mut pool = pool();
        pool.spawn(2, 1, Rgb::WHITE, 0.0, 2.0);
        // lane 1 is first in scan order
        assert_eq!(pool.place(2, 1), Some((1, 0)));

        pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0);
        pool.spawn(0, 1, Rgb::WHITE, 0.0, 2.0);
        pool.spawn(0, 2, Rgb::WHITE, 0.0, 2.0);
        pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0);
        assert_eq!(pool.place(0, 0), Some((1, 0)));
    }

    #[test]
    fn test_filling_pool_never_returns_occupied_cell() {
        let mut pool = pool();
        let mut placed = Vec::new();
        while !pool.is_full() {
            match pool.place(1, 1) {
                Some((lane, row)) => {
                    assert!(!pool.is_occupied(lane, row));
                    assert!(lane <= 2);
                    pool.spawn(lane, row, Rgb::WHITE, 0.0, 2.0);
                    placed.push((lane, row));
                }
                None => break,
            }
        }
        // lanes 0..=2 x 3 rows
        assert_eq!(placed.len(), 9);
        assert_eq!(pool.place(1, 1), None);

        // lane 3 is outside lane 1's neighbourhood but reachable from lane 2
        assert_eq!(pool.place(2, 0), Some((3, 0)));
    }

    #[test]
    fn test_reservation_expires_before_retirement() {
        let mut pool = pool();
        pool.spawn(1, 1, Rgb::WHITE, 0.0, 2.0);
        assert!(pool.is_occupied(1, 1));

        assert!(pool.advance(0.25).is_empty());
        assert!(pool.is_occupied(1, 1));

        assert!(pool.advance(0.25).is_empty());
        assert!(!pool.is_occupied(1, 1));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_retires_past_tolerance() {
        let mut pool = pool();
        let id = pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0).unwrap();

        // 20.5 has not yet passed 20 + 1
        assert!(pool.advance_to(2.05).is_empty());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.advance_to(2.2), vec![id]);
        assert!(pool.is_empty());
        assert!(!pool.is_occupied(0, 0));
    }

    #[test]
    fn test_positions_follow_formula() {
        let mut pool = pool();
        pool.spawn(0, 2, Rgb::WHITE, 1.0, 3.0);
        pool.advance_to(2.0);
        let updates = pool.positions();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].displacement, 10.0);
        assert_eq!(updates[0].z, 10.0);
        assert_eq!(updates[0].x, -0.75);
        assert_eq!(updates[0].y, 1.5);

        pool.advance_to(3.0);
        assert_eq!(pool.positions()[0].z, 0.0);
    }

    #[test]
    fn test_late_spawn_is_not_reserved() {
        let mut pool = pool();
        pool.advance_to(5.0);
        pool.spawn(1, 1, Rgb::WHITE, 3.0, 5.0);
        assert!(!pool.is_occupied(1, 1));
    }

    #[test]
    fn test_spawn_refuses_beyond_capacity() {
        let gameplay = GameplayConfig {
            pool_capacity: 2,
            ..GameplayConfig::default()
        };
        let mut pool = GridPool::new(&GridConfig::default(), &gameplay, 10.0);
        assert!(pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0).is_some());
        assert!(pool.spawn(1, 0, Rgb::WHITE, 0.0, 2.0).is_some());
        assert!(pool.is_full());

        assert_eq!(pool.spawn(2, 0, Rgb::WHITE, 0.0, 2.0), None);
        assert_eq!(pool.len(), 2);
        assert!(!pool.is_occupied(2, 0));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut pool = pool();
        pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0);
        pool.spawn(1, 0, Rgb::WHITE, 0.0, 2.0);
        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.is_occupied(0, 0));
        assert_eq!(pool.free_slots(), 10);
        assert_eq!(pool.spawn(0, 0, Rgb::WHITE, 0.0, 2.0), Some(EntityId(0)));
    }
}
