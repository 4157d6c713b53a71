//! Per-tick telemetry values read from the simulator.

use serde::{Deserialize, Serialize};

/// How the current session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceFormat {
    /// Session ends after a fixed number of laps.
    LapLimited { total_laps: u32 },
    /// Session ends when the session clock runs out.
    #[default]
    TimeLimited,
}

/// Player vehicle readings for one tick.
///
/// Times are in seconds, distances in meters. `last_lap_time` is zero or
/// negative until the simulator has confirmed a completed lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSample {
    pub tank_capacity: f64,
    pub fuel: f64,
    /// Current virtual energy, in simulator units.
    pub energy: f64,
    /// Maximum virtual energy; zero when the vehicle has no energy limit.
    pub max_energy: f64,
    pub lap_start_time: f64,
    pub elapsed_time: f64,
    pub current_lap_time: f64,
    pub last_lap_time: f64,
    pub session_remaining: f64,
    pub race_format: RaceFormat,
    pub completed_laps: u32,
    pub lap_distance: f64,
    /// Fraction of the current lap completed, `0.0..1.0`.
    pub lap_progress: f64,
    pub in_pits: bool,
    pub in_garage: bool,
    pub position_xyz: [f64; 3],
    /// Lap time at current pace, derived outside this core.
    pub pace_lap_time: f64,
    /// Whether the lap in progress still counts, derived outside this core.
    pub is_valid_lap: bool,
    pub battery_drain_last: f64,
    pub battery_regen_last: f64,
}

impl Default for PlayerSample {
    fn default() -> Self {
        Self {
            tank_capacity: 0.0,
            fuel: 0.0,
            energy: 0.0,
            max_energy: 0.0,
            lap_start_time: 0.0,
            elapsed_time: 0.0,
            current_lap_time: 0.0,
            last_lap_time: 0.0,
            session_remaining: 0.0,
            race_format: RaceFormat::default(),
            completed_laps: 0,
            lap_distance: 0.0,
            lap_progress: 0.0,
            in_pits: false,
            in_garage: false,
            position_xyz: [0.0; 3],
            pace_lap_time: 0.0,
            is_valid_lap: true,
            battery_drain_last: 0.0,
            battery_regen_last: 0.0,
        }
    }
}

impl PlayerSample {
    /// Virtual energy as a percentage of its maximum, if the vehicle has one.
    pub fn energy_percent(&self) -> Option<f64> {
        (self.max_energy > 0.0).then(|| self.energy / self.max_energy * 100.0)
    }

    pub fn has_energy_limit(&self) -> bool {
        self.max_energy > 0.0
    }
}

/// One vehicle of the field, as seen on a single tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSnapshot {
    /// Stable slot index assigned by the simulator.
    pub index: usize,
    pub lap_distance: f64,
    pub lap_progress: f64,
    pub class_name: String,
    /// Overall race position, 1-based.
    pub place: u32,
    pub in_pits: bool,
    pub in_garage: bool,
    pub best_lap_time: f64,
    pub last_lap_time: f64,
    pub position_xyz: [f64; 3],
}

/// Every vehicle in the session for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSnapshot {
    pub track_length: f64,
    pub player_index: usize,
    pub in_race: bool,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl FieldSnapshot {
    pub fn player(&self) -> Option<&VehicleSnapshot> {
        self.vehicle(self.player_index)
    }

    pub fn vehicle(&self, index: usize) -> Option<&VehicleSnapshot> {
        self.vehicles.iter().find(|v| v.index == index)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Complete simulator state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryFrame {
    /// Offset from the start of the recording.
    pub timestamp_ns: u64,
    pub on_track: bool,
    pub player: PlayerSample,
    pub field: FieldSnapshot,
}
