//! Standalone race fuel calculator.
//!
//! Plans a whole race from a start on a full (or given) tank. Pit time lost
//! shortens a timed race, which changes the fuel needed, which changes the
//! number of stops, so the stop count is iterated to a fixed point.

use crate::strategy::{
    end_stint_amount, end_stint_laps, end_stint_minutes, end_stint_pit_stops,
    one_less_pit_consumption, required_stops, timed_full_laps_remaining, total_needed,
};
use serde::{Deserialize, Serialize};

/// Upper bound on stop-count refinement rounds.
pub const MAX_ITERATIONS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceLength {
    Minutes(f64),
    Laps(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub race_length: RaceLength,
    pub formation_laps: u32,
    pub lap_time: f64,
    /// Time lost per pit stop, in seconds.
    pub pit_stop_seconds: f64,
    pub tank_capacity: f64,
    pub consumption: f64,
    /// Amount in the tank at the start; a full tank when `None`.
    pub start_amount: Option<f64>,
}

impl CalculatorInput {
    fn is_runnable(&self) -> bool {
        let has_length = match self.race_length {
            RaceLength::Minutes(minutes) => minutes > 0.0,
            RaceLength::Laps(laps) => laps > 0,
        };
        has_length && self.lap_time > 0.0 && self.tank_capacity > 0.0 && self.consumption > 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorOutput {
    /// Laps including formation laps.
    pub total_laps: f64,
    pub total_needed: f64,
    /// `total_needed` rounded up to a whole unit.
    pub total_needed_rounded: f64,
    pub end_stint_amount: f64,
    pub pit_stops: f64,
    pub required_pit_stops: u32,
    pub run_laps: f64,
    pub run_minutes: f64,
    pub one_less_pit_consumption: f64,
    pub average_refuel: f64,
    pub iterations: u32,
}

/// Runs the calculator, or returns `None` when an input is missing.
pub fn calculate(input: &CalculatorInput) -> Option<CalculatorOutput> {
    if !input.is_runnable() {
        return None;
    }
    let capacity = input.tank_capacity;
    let consumption = input.consumption;
    let start_amount = input.start_amount.unwrap_or(capacity);
    let formation = f64::from(input.formation_laps);

    let mut pit_stops = 0.0_f64;
    let mut min_stops = 0.0_f64;
    let mut total_laps = 0.0;
    let mut needed = 0.0;
    let mut needed_rounded = 0.0;
    let mut in_tank = 0.0;
    let mut end_amount = 0.0;
    let mut remaining = MAX_ITERATIONS;
    let mut iterations = 0;

    while remaining > 0 {
        iterations += 1;
        min_stops = pit_stops.ceil().max(0.0);
        total_laps = formation
            + match input.race_length {
                RaceLength::Minutes(minutes) => timed_full_laps_remaining(
                    0.0,
                    input.lap_time,
                    minutes * 60.0 - min_stops * input.pit_stop_seconds,
                ),
                RaceLength::Laps(laps) => f64::from(laps),
            };

        needed = total_needed(total_laps, consumption, 0.0);
        needed_rounded = needed.ceil();
        let refuel = needed_rounded - capacity;
        in_tank = needed_rounded.min(capacity);
        end_amount = end_stint_amount(in_tank, 0.0, consumption);
        pit_stops = end_stint_pit_stops(refuel, capacity - end_amount);

        remaining -= 1;
        // Rounded-up count fell short; one more round settles on it.
        if min_stops < pit_stops && (min_stops - pit_stops.floor()).abs() <= f64::EPSILON {
            remaining = 1;
        }
        if (min_stops - pit_stops.ceil().max(0.0)).abs() <= f64::EPSILON {
            break;
        }
    }

    let run_laps = end_stint_laps(needed_rounded, consumption);
    let whole_stops = required_stops(min_stops);
    let average_refuel = if whole_stops > 0 {
        (needed_rounded - start_amount + min_stops * end_amount) / min_stops
    } else if start_amount < needed_rounded && needed_rounded <= capacity {
        needed_rounded - start_amount
    } else {
        0.0
    };

    Some(CalculatorOutput {
        total_laps,
        total_needed: needed,
        total_needed_rounded: needed_rounded,
        end_stint_amount: end_amount,
        pit_stops: pit_stops.max(0.0),
        required_pit_stops: whole_stops,
        run_laps,
        run_minutes: end_stint_minutes(run_laps, input.lap_time),
        one_less_pit_consumption: one_less_pit_consumption(pit_stops, capacity, in_tank, total_laps)
            .max(0.0),
        average_refuel,
        iterations,
    })
}
