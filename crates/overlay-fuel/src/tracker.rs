//! Per-lap consumption accounting.
//!
//! Turns a gauge that only ever drops while driving and jumps up when
//! refilled into per-lap usage, records the lap's consumption curve, and
//! promotes the curve to the reference lap once the simulator confirms the
//! lap was completed legitimately.

use crate::curve::{ConsumptionSample, ReferenceLap};
use std::sync::Arc;
use tracing::debug;

/// Reported positions above this value shortly after the start line are
/// stale readings carried over from the previous lap.
pub const LAP_START_DESYNC_DISTANCE: f64 = 300.0;

/// Lap time below which the desync correction applies, in seconds.
pub const LAP_START_DESYNC_WINDOW: f64 = 1.0;

/// Earliest confirmation accepted after a lap boundary, in seconds.
pub const VALIDATION_DELAY: f64 = 0.3;

/// Latest confirmation accepted after a lap boundary, in seconds.
pub const VALIDATION_TIMEOUT: f64 = 3.0;

/// Readings consumed by the tracker on every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerInput {
    pub amount: f64,
    pub lap_start_time: f64,
    pub elapsed_time: f64,
    pub current_lap_time: f64,
    /// Last lap time reported by the simulator; positive once confirmed.
    pub last_lap_time: f64,
    pub lap_distance: f64,
    pub in_pits: bool,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerStep {
    /// Lap distance after desync correction.
    pub position: f64,
    pub position_changed: bool,
    pub lap_completed: bool,
    pub lap_validated: bool,
    pub lap_discarded: bool,
}

#[derive(Debug, Clone)]
struct PendingLap {
    lap: ReferenceLap,
    completed_at: f64,
}

/// Per-tick consumption state machine.
///
/// A lap is recorded only when the tracker saw it start at the line. On the
/// next lap boundary the recorded curve is held as pending, and becomes the
/// reference lap if the simulator reports a positive last lap time between
/// [`VALIDATION_DELAY`] and [`VALIDATION_TIMEOUT`] seconds later. Laps that
/// touched the pit lane are never promoted.
///
/// Samples are appended only past the furthest recorded position, so the
/// curve stays sorted when the car rolls backwards.
#[derive(Debug)]
pub struct LapConsumptionTracker {
    reference: Arc<ReferenceLap>,
    amount_start: f64,
    amount_last: f64,
    used_current: f64,
    used_last_raw: f64,
    last_lap_start: Option<f64>,
    recording: bool,
    pit_lap: bool,
    samples: Vec<ConsumptionSample>,
    last_position: f64,
    pending: Option<PendingLap>,
    save_requested: bool,
}

impl Default for LapConsumptionTracker {
    fn default() -> Self {
        Self::new(Arc::new(ReferenceLap::zero()))
    }
}

impl LapConsumptionTracker {
    pub fn new(reference: Arc<ReferenceLap>) -> Self {
        Self {
            reference,
            amount_start: 0.0,
            amount_last: 0.0,
            used_current: 0.0,
            used_last_raw: 0.0,
            last_lap_start: None,
            recording: false,
            pit_lap: false,
            samples: vec![ConsumptionSample::ZERO],
            last_position: 0.0,
            pending: None,
            save_requested: false,
        }
    }

    /// Advances the tracker by one tick.
    pub fn step(&mut self, input: &TrackerInput) -> TrackerStep {
        let mut step = TrackerStep::default();

        self.track_gauge(input.amount);

        match self.last_lap_start {
            None => self.last_lap_start = Some(input.lap_start_time),
            Some(previous) if input.lap_start_time.total_cmp(&previous).is_ne() => {
                step.lap_completed = self.close_lap(input, previous);
            }
            Some(_) => {}
        }

        self.pit_lap |= input.in_pits;

        let mut position = input.lap_distance;
        if input.current_lap_time > 0.0
            && input.current_lap_time < LAP_START_DESYNC_WINDOW
            && position > LAP_START_DESYNC_DISTANCE
        {
            position = 0.0;
            self.last_position = 0.0;
        }

        if position >= 0.0 && position.total_cmp(&self.last_position).is_ne() {
            // Rolling backwards must not reorder the curve.
            let furthest = self
                .samples
                .last()
                .map_or(f64::NEG_INFINITY, |s| s.position);
            if self.recording && position > furthest {
                self.samples
                    .push(ConsumptionSample::new(position, self.used_current));
            }
            self.last_position = position;
            step.position_changed = true;
        }
        step.position = position;

        if let Some(pending) = &self.pending {
            let timer = input.elapsed_time - pending.completed_at;
            if timer > VALIDATION_DELAY && timer <= VALIDATION_TIMEOUT && input.last_lap_time > 0.0
            {
                if let Some(pending) = self.pending.take() {
                    debug!(
                        used = pending.lap.used_total(),
                        lap_time = pending.lap.lap_time(),
                        samples = pending.lap.len(),
                        "Lap validated"
                    );
                    self.reference = Arc::new(pending.lap);
                    self.save_requested = true;
                    step.lap_validated = true;
                }
            } else if !(0.0..=VALIDATION_TIMEOUT).contains(&timer) {
                debug!(timer, "Pending lap discarded without confirmation");
                self.pending = None;
                step.lap_discarded = true;
            }
        }

        step
    }

    fn track_gauge(&mut self, amount: f64) {
        if self.amount_last < amount {
            self.amount_last = amount;
            self.amount_start = amount;
        } else if self.amount_last > amount {
            self.used_current += self.amount_last - amount;
            self.amount_last = amount;
        }
    }

    /// Handles a change of the lap-start signal. Returns whether a recorded
    /// lap was queued for validation.
    fn close_lap(&mut self, input: &TrackerInput, previous_start: f64) -> bool {
        let lap_time = input.lap_start_time - previous_start;
        let mut queued = false;
        if lap_time > 0.0 && self.samples.len() > 1 && !self.pit_lap {
            let samples = std::mem::replace(&mut self.samples, vec![ConsumptionSample::ZERO]);
            self.pending = Some(PendingLap {
                lap: ReferenceLap::from_completed_lap(
                    samples,
                    self.last_position,
                    self.used_current,
                    lap_time,
                ),
                completed_at: input.elapsed_time,
            });
            queued = true;
        } else {
            self.samples.clear();
            self.samples.push(ConsumptionSample::ZERO);
        }

        self.last_position = input.lap_distance;
        self.used_last_raw = self.used_current;
        self.used_current = 0.0;
        self.recording = input.current_lap_time < LAP_START_DESYNC_WINDOW;
        self.pit_lap = false;
        self.last_lap_start = Some(input.lap_start_time);
        queued
    }

    /// Latest validated lap.
    pub fn reference(&self) -> &Arc<ReferenceLap> {
        &self.reference
    }

    pub fn amount_start(&self) -> f64 {
        self.amount_start
    }

    pub fn amount_current(&self) -> f64 {
        self.amount_last
    }

    /// Used so far on the lap in progress.
    pub fn used_current(&self) -> f64 {
        self.used_current
    }

    /// Used over the previous lap, whether or not it validated.
    pub fn used_last_raw(&self) -> f64 {
        self.used_last_raw
    }

    /// Used over the reference lap.
    pub fn used_last(&self) -> f64 {
        self.reference.used_total()
    }

    /// Whether the lap in progress has touched the pit lane.
    pub fn is_pit_lap(&self) -> bool {
        self.pit_lap
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn has_pending_lap(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the reference lap if it changed since the last call.
    pub fn take_save_request(&mut self) -> Option<Arc<ReferenceLap>> {
        std::mem::take(&mut self.save_requested).then(|| Arc::clone(&self.reference))
    }
}
