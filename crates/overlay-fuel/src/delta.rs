//! Live consumption delta against the reference lap.

use crate::curve::ReferenceLap;
use racing_overlay_telemetry::distance_3d;

/// Lap time after which the delta is considered meaningful, in seconds.
pub const DELTA_MIN_LAP_TIME: f64 = 0.3;

/// Estimates track position between sparse lap-distance updates.
///
/// The simulator refreshes lap distance less often than global position.
/// Between refreshes the estimate advances by the straight-line distance
/// travelled; each refresh snaps it back to the authoritative value.
#[derive(Debug, Clone, Default)]
pub struct PositionEstimator {
    estimate: f64,
    last_xyz: Option<[f64; 3]>,
    pending_sync: Option<f64>,
}

impl PositionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fresh authoritative lap distance, applied on the next move.
    pub fn sync(&mut self, position: f64) {
        self.pending_sync = Some(position);
    }

    /// Feeds the latest global position. Returns true if the vehicle moved.
    pub fn advance(&mut self, xyz: [f64; 3]) -> bool {
        let Some(last) = self.last_xyz else {
            self.last_xyz = Some(xyz);
            if let Some(position) = self.pending_sync.take() {
                self.estimate = position;
            }
            return true;
        };
        if same_point(last, xyz) {
            return false;
        }
        match self.pending_sync.take() {
            Some(position) => self.estimate = position,
            None => self.estimate += distance_3d(last, xyz),
        }
        self.last_xyz = Some(xyz);
        true
    }

    /// Current position estimate in meters from the start line.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}

fn same_point(a: [f64; 3], b: [f64; 3]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x.total_cmp(y).is_eq())
}

/// Inputs for one delta update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaInput {
    pub position_xyz: [f64; 3],
    /// Set when the tracker saw a new authoritative lap distance this tick.
    pub synced_position: Option<f64>,
    pub used_current: f64,
    pub current_lap_time: f64,
    pub in_garage: bool,
}

/// Compares the lap in progress with the reference lap at the same
/// estimated track position.
#[derive(Debug, Clone, Default)]
pub struct DeltaCurveEngine {
    position: PositionEstimator,
    delta: f64,
}

impl DeltaCurveEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the delta and returns it.
    ///
    /// The value only changes when the vehicle moves; while stationary the
    /// previous delta is held.
    pub fn update(&mut self, input: &DeltaInput, reference: &ReferenceLap) -> f64 {
        if let Some(position) = input.synced_position {
            self.position.sync(position);
        }
        if self.position.advance(input.position_xyz) {
            let enabled = input.current_lap_time > DELTA_MIN_LAP_TIME && !input.in_garage;
            self.delta = if enabled {
                reference.delta(self.position.estimate(), input.used_current)
            } else {
                0.0
            };
        }
        self.delta
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn estimated_position(&self) -> f64 {
        self.position.estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ConsumptionSample;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reference() -> ReferenceLap {
        ReferenceLap::from_completed_lap(
            vec![ConsumptionSample::ZERO, ConsumptionSample::new(500.0, 2.0)],
            1000.0,
            4.0,
            90.0,
        )
    }

    #[test]
    fn test_estimator_integrates_between_syncs() {
        let mut estimator = PositionEstimator::new();
        estimator.sync(100.0);
        assert!(estimator.advance([0.0, 0.0, 0.0]));
        assert!(close(estimator.estimate(), 100.0));

        assert!(estimator.advance([3.0, 4.0, 0.0]));
        assert!(close(estimator.estimate(), 105.0));

        assert!(!estimator.advance([3.0, 4.0, 0.0]));

        estimator.sync(120.0);
        assert!(estimator.advance([6.0, 8.0, 0.0]));
        assert!(close(estimator.estimate(), 120.0));
    }

    #[test]
    fn test_delta_against_reference() {
        let mut engine = DeltaCurveEngine::new();
        let input = DeltaInput {
            position_xyz: [1.0, 0.0, 0.0],
            synced_position: Some(750.0),
            used_current: 3.2,
            current_lap_time: 40.0,
            in_garage: false,
        };
        let delta = engine.update(&input, &reference());
        let expected = 3.2 - (2.0 + 2.0 * 250.0 / 510.0);
        assert!(close(delta, expected));
    }

    #[test]
    fn test_delta_disabled_at_lap_start_and_in_garage() {
        let mut engine = DeltaCurveEngine::new();
        let mut input = DeltaInput {
            position_xyz: [1.0, 0.0, 0.0],
            synced_position: Some(750.0),
            used_current: 3.2,
            current_lap_time: 0.1,
            in_garage: false,
        };
        assert!(close(engine.update(&input, &reference()), 0.0));

        input.position_xyz = [2.0, 0.0, 0.0];
        input.current_lap_time = 40.0;
        input.in_garage = true;
        assert!(close(engine.update(&input, &reference()), 0.0));
    }

    #[test]
    fn test_delta_held_while_stationary() {
        let mut engine = DeltaCurveEngine::new();
        let input = DeltaInput {
            position_xyz: [1.0, 0.0, 0.0],
            synced_position: Some(750.0),
            used_current: 3.2,
            current_lap_time: 40.0,
            in_garage: false,
        };
        let first = engine.update(&input, &reference());
        let stationary = DeltaInput {
            used_current: 3.5,
            synced_position: None,
            ..input
        };
        assert!(close(engine.update(&stationary, &reference()), first));
    }

    #[test]
    fn test_placeholder_reference_gives_zero_delta() {
        let mut engine = DeltaCurveEngine::new();
        let input = DeltaInput {
            position_xyz: [1.0, 0.0, 0.0],
            synced_position: Some(750.0),
            used_current: 3.2,
            current_lap_time: 40.0,
            in_garage: false,
        };
        assert!(close(engine.update(&input, &ReferenceLap::zero()), 0.0));
    }
}
