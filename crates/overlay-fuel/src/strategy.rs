//! Race strategy numbers derived from tank state and validated consumption.
//!
//! The free functions are shared with the standalone [`crate::calculator`].
//! Consumption arguments are per-lap amounts; a non-positive consumption
//! yields zero rather than a division by zero.

use racing_overlay_telemetry::RaceFormat;
use serde::{Deserialize, Serialize};

/// Laps remaining after the session clock runs out, counted from the line.
pub fn end_timer_laps_remaining(lap_into: f64, lap_time: f64, seconds_remaining: f64) -> f64 {
    if lap_time <= 0.0 {
        return 0.0;
    }
    if seconds_remaining <= 0.0 {
        return lap_into;
    }
    seconds_remaining / lap_time + lap_into
}

/// Whole laps to run in a timed race, counted from the line.
pub fn timed_full_laps_remaining(lap_into: f64, lap_time: f64, seconds_remaining: f64) -> f64 {
    end_timer_laps_remaining(lap_into, lap_time, seconds_remaining).ceil()
}

/// Additional amount needed to finish; negative when there is a surplus.
pub fn total_needed(laps_remaining: f64, consumption: f64, in_tank: f64) -> f64 {
    laps_remaining * consumption - in_tank
}

/// Amount left in the tank when the stint runs dry mid-lap.
pub fn end_stint_amount(in_tank: f64, used_this_lap: f64, consumption: f64) -> f64 {
    if consumption <= 0.0 {
        return 0.0;
    }
    let at_lap_start = in_tank + used_this_lap;
    (at_lap_start / consumption).rem_euclid(1.0) * consumption
}

/// Laps the amount in the tank lasts at `consumption` per lap.
///
/// Zero when no consumption has been measured yet.
pub fn end_stint_laps(in_tank: f64, consumption: f64) -> f64 {
    if consumption <= 0.0 {
        return 0.0;
    }
    in_tank / consumption
}

/// Converts a lap count into minutes at `lap_time` seconds per lap.
pub fn end_stint_minutes(laps: f64, lap_time: f64) -> f64 {
    laps * lap_time / 60.0
}

/// Empty space in the tank at the end of the current lap.
pub fn end_lap_empty_capacity(capacity: f64, at_lap_start: f64, consumption: f64) -> f64 {
    capacity - at_lap_start + consumption
}

/// Pit stops needed when every stop happens with the tank run dry.
pub fn end_stint_pit_stops(needed: f64, refill_capacity: f64) -> f64 {
    if refill_capacity <= 0.0 {
        return 0.0;
    }
    needed / refill_capacity
}

/// Pit stops needed when the first stop happens at the end of this lap.
pub fn end_lap_pit_stops(needed: f64, empty_capacity: f64, refill_capacity: f64) -> f64 {
    let addable = needed.min(empty_capacity);
    let before = if empty_capacity > 0.0 {
        addable / empty_capacity
    } else {
        1.0
    };
    let after = if refill_capacity > 0.0 {
        (needed - addable) / refill_capacity
    } else {
        0.0
    };
    before + after
}

/// Per-lap consumption that would save one pit stop. May be negative when
/// no saving is possible.
pub fn one_less_pit_consumption(
    end_stint_stops: f64,
    capacity: f64,
    in_tank: f64,
    laps_remaining: f64,
) -> f64 {
    if laps_remaining.abs() <= f64::EPSILON {
        return 0.0;
    }
    let stops = end_stint_stops.ceil() - 1.0;
    (stops * capacity + in_tank) / laps_remaining
}

/// Fuel used per unit of virtual energy, or zero without energy usage.
pub fn fuel_to_energy_ratio(fuel: f64, energy: f64) -> f64 {
    if energy.abs() <= f64::EPSILON {
        return 0.0;
    }
    fuel / energy
}

/// Rounds a fractional stop count up to whole stops.
pub fn required_stops(fractional: f64) -> u32 {
    let stops = fractional.ceil();
    if stops.is_nan() || stops <= 0.0 {
        0
    } else if stops >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "range checked above"
        )]
        let whole = stops as u32;
        whole
    }
}

/// Per-tick inputs for the strategy estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyInput {
    pub capacity: f64,
    pub amount_current: f64,
    pub used_current: f64,
    /// Used over the reference lap.
    pub used_last: f64,
    pub delta: f64,
    /// Current lap counts toward the consumption estimate.
    pub delta_applies: bool,
    pub race_format: RaceFormat,
    pub completed_laps: u32,
    pub lap_progress: f64,
    pub session_remaining: f64,
    pub pace_lap_time: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyEstimate {
    pub laps_remaining: f64,
    pub estimated_valid_consumption: f64,
    pub amount_needed: f64,
    pub amount_end_stint: f64,
    pub estimated_laps: f64,
    pub estimated_minutes: f64,
    pub estimated_empty_capacity: f64,
    pub pit_stops_end_stint: f64,
    pub pit_stops_end_lap: f64,
    pub one_less_pit_consumption: f64,
}

impl StrategyEstimate {
    pub fn required_stops_end_stint(&self) -> u32 {
        required_stops(self.pit_stops_end_stint)
    }

    pub fn required_stops_end_lap(&self) -> u32 {
        required_stops(self.pit_stops_end_lap)
    }
}

/// Stateful strategy estimator.
///
/// In timed races the remaining lap count is only refreshed while a pace
/// lap time is known; otherwise the previous count is held.
#[derive(Debug, Clone, Default)]
pub struct StrategyEstimator {
    laps_remaining: f64,
}

impl StrategyEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn estimate(&mut self, input: &StrategyInput) -> StrategyEstimate {
        let consumption = if input.delta_applies {
            input.used_last + input.delta
        } else {
            input.used_last
        };

        match input.race_format {
            RaceFormat::LapLimited { total_laps } => {
                let full = f64::from(total_laps) - f64::from(input.completed_laps);
                self.laps_remaining = full - input.lap_progress;
            }
            RaceFormat::TimeLimited => {
                if input.pace_lap_time > 0.0 {
                    let full = timed_full_laps_remaining(
                        input.lap_progress,
                        input.pace_lap_time,
                        input.session_remaining,
                    );
                    self.laps_remaining = (full - input.lap_progress).max(0.0);
                }
            }
        }
        let laps_remaining = self.laps_remaining;

        let amount_needed = total_needed(laps_remaining, consumption, input.amount_current);
        let amount_end_stint =
            end_stint_amount(input.amount_current, input.used_current, consumption);
        let estimated_laps = end_stint_laps(input.amount_current, consumption);
        let estimated_minutes = end_stint_minutes(estimated_laps, input.pace_lap_time);
        let estimated_empty_capacity = end_lap_empty_capacity(
            input.capacity,
            input.amount_current + input.used_current,
            input.used_last + input.delta,
        );
        let refill_capacity = input.capacity - amount_end_stint;
        let pit_stops_end_stint = end_stint_pit_stops(amount_needed, refill_capacity);
        let pit_stops_end_lap =
            end_lap_pit_stops(amount_needed, estimated_empty_capacity, refill_capacity);
        let one_less_pit_consumption = one_less_pit_consumption(
            pit_stops_end_stint,
            input.capacity,
            input.amount_current,
            laps_remaining,
        );

        StrategyEstimate {
            laps_remaining,
            estimated_valid_consumption: consumption,
            amount_needed,
            amount_end_stint,
            estimated_laps,
            estimated_minutes,
            estimated_empty_capacity,
            pit_stops_end_stint,
            pit_stops_end_lap,
            one_less_pit_consumption,
        }
    }

    pub fn laps_remaining(&self) -> f64 {
        self.laps_remaining
    }
}
