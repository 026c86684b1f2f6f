pub mod clock;
pub mod grid;
pub mod schedule;
pub mod session;

pub use clock::{ManualClock, TrackClock, WallClock};
pub use grid::{ActiveEntity, EntityId, EntityUpdate, GridPool};
pub use schedule::{build_schedule, speed_for_bpm, travel_time, EventKind, EventScheduler, ScheduledEvent};
pub use session::{GameSession, SpawnInstruction, TickReport};
