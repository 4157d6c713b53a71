//! Per-tick consumption pipeline for one gauge.
//!
//! Chains the lap tracker, the delta engine and the strategy estimator. One
//! instance runs for fuel and, on vehicles with a virtual energy limit, a
//! second one runs for energy.

use crate::curve::ReferenceLap;
use crate::delta::{DeltaCurveEngine, DeltaInput};
use crate::strategy::{StrategyEstimator, StrategyInput};
use crate::tracker::{LapConsumptionTracker, TrackerInput};
use racing_overlay_telemetry::PlayerSample;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaugeKind {
    Fuel,
    Energy,
}

impl GaugeKind {
    pub fn name(self) -> &'static str {
        match self {
            GaugeKind::Fuel => "fuel",
            GaugeKind::Energy => "energy",
        }
    }

    pub fn file_extension(self) -> &'static str {
        self.name()
    }

    /// Capacity and level of this gauge, or `None` if the vehicle has none.
    ///
    /// Energy is expressed as a percentage of the vehicle's maximum.
    pub fn reading(self, sample: &PlayerSample) -> Option<(f64, f64)> {
        match self {
            GaugeKind::Fuel => Some((sample.tank_capacity.max(1.0), sample.fuel)),
            GaugeKind::Energy => sample.energy_percent().map(|percent| (100.0, percent)),
        }
    }
}

/// Everything the rendering layer shows for one gauge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionOutput {
    pub capacity: f64,
    pub amount_start: f64,
    pub amount_current: f64,
    pub amount_needed: f64,
    pub amount_end_stint: f64,
    /// Used over the previous lap, validated or not.
    pub last_lap_consumption: f64,
    /// Reference lap usage plus the live delta.
    pub estimated_consumption: f64,
    /// As `estimated_consumption`, with the delta dropped on excluded laps.
    pub estimated_valid_consumption: f64,
    pub estimated_laps: f64,
    pub estimated_minutes: f64,
    pub estimated_empty_capacity: f64,
    pub pit_stops_end_stint: f64,
    pub pit_stops_end_lap: f64,
    pub delta_consumption: f64,
    pub one_less_pit_consumption: f64,
}

#[derive(Debug)]
pub struct ConsumptionEstimator {
    kind: GaugeKind,
    tracker: LapConsumptionTracker,
    delta: DeltaCurveEngine,
    strategy: StrategyEstimator,
}

impl ConsumptionEstimator {
    pub fn new(kind: GaugeKind, reference: ReferenceLap) -> Self {
        Self {
            kind,
            tracker: LapConsumptionTracker::new(Arc::new(reference)),
            delta: DeltaCurveEngine::new(),
            strategy: StrategyEstimator::new(),
        }
    }

    pub fn kind(&self) -> GaugeKind {
        self.kind
    }

    /// Processes one tick. Returns `None` when the vehicle lacks this gauge.
    pub fn step(&mut self, sample: &PlayerSample) -> Option<ConsumptionOutput> {
        let (capacity, amount) = self.kind.reading(sample)?;

        let tracked = self.tracker.step(&TrackerInput {
            amount,
            lap_start_time: sample.lap_start_time,
            elapsed_time: sample.elapsed_time,
            current_lap_time: sample.current_lap_time,
            last_lap_time: sample.last_lap_time,
            lap_distance: sample.lap_distance,
            in_pits: sample.in_pits,
        });

        let used_current = self.tracker.used_current();
        let delta = self.delta.update(
            &DeltaInput {
                position_xyz: sample.position_xyz,
                synced_position: tracked.position_changed.then_some(tracked.position),
                used_current,
                current_lap_time: sample.current_lap_time,
                in_garage: sample.in_garage,
            },
            self.tracker.reference(),
        );

        let used_last = self.tracker.used_last();
        let estimate = self.strategy.estimate(&StrategyInput {
            capacity,
            amount_current: amount,
            used_current,
            used_last,
            delta,
            delta_applies: !self.tracker.is_pit_lap() && sample.completed_laps > 0,
            race_format: sample.race_format,
            completed_laps: sample.completed_laps,
            lap_progress: sample.lap_progress,
            session_remaining: sample.session_remaining,
            pace_lap_time: sample.pace_lap_time,
        });

        Some(ConsumptionOutput {
            capacity,
            amount_start: self.tracker.amount_start(),
            amount_current: amount,
            amount_needed: estimate.amount_needed,
            amount_end_stint: estimate.amount_end_stint,
            last_lap_consumption: self.tracker.used_last_raw(),
            estimated_consumption: used_last + delta,
            estimated_valid_consumption: estimate.estimated_valid_consumption,
            estimated_laps: estimate.estimated_laps,
            estimated_minutes: estimate.estimated_minutes,
            estimated_empty_capacity: estimate.estimated_empty_capacity,
            pit_stops_end_stint: estimate.pit_stops_end_stint,
            pit_stops_end_lap: estimate.pit_stops_end_lap,
            delta_consumption: delta,
            one_less_pit_consumption: estimate.one_less_pit_consumption,
        })
    }

    pub fn reference(&self) -> &Arc<ReferenceLap> {
        self.tracker.reference()
    }

    /// Reference lap to persist, if a new one validated since the last call.
    pub fn take_save_request(&mut self) -> Option<Arc<ReferenceLap>> {
        self.tracker.take_save_request()
    }
}
