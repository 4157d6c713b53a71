//! Fuel and virtual energy consumption tracking and pit strategy.
//!
//! Raw gauge readings arrive once per polling tick. The pipeline turns them
//! into a validated per-lap consumption curve, a live delta against that
//! curve, and strategy numbers for the rest of the session.
//!
//! ## Modules
//! - `curve` - Distance-indexed consumption curve and the reference lap
//! - `tracker` - Lap boundary detection, usage accounting and validation
//! - `delta` - Position estimation and delta to the reference lap
//! - `strategy` - Remaining laps, fuel needed and pit stop counts
//! - `calculator` - Whole-race planner with fixed-point pit iteration
//! - `history` - Bounded per-lap consumption history
//! - `storage` - Per-combo persistence of reference laps
//! - `estimator` - The per-tick pipeline for one gauge

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod calculator;
pub mod curve;
pub mod delta;
pub mod error;
pub mod estimator;
pub mod history;
pub mod storage;
pub mod strategy;
pub mod tracker;

pub use calculator::{CalculatorInput, CalculatorOutput, RaceLength, calculate};
pub use curve::{ConsumptionSample, CurveRow, ReferenceLap};
pub use delta::{DeltaCurveEngine, DeltaInput, PositionEstimator};
pub use error::{CurveError, StorageError};
pub use estimator::{ConsumptionEstimator, ConsumptionOutput, GaugeKind};
pub use history::{ConsumptionHistory, ConsumptionHistoryEntry, HistoryProbe};
pub use storage::CurveStore;
pub use strategy::{StrategyEstimate, StrategyEstimator, StrategyInput, fuel_to_energy_ratio};
pub use tracker::{LapConsumptionTracker, TrackerInput, TrackerStep};
