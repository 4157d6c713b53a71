//! Telemetry sample surface for the racing overlay core.
//!
//! The simulator itself is an external collaborator. This crate defines the
//! narrow read surface the estimators consume every polling tick, plus the
//! helpers shared by every consumer of that surface.
//!
//! ## Modules
//! - `sample` - Per-tick player sample and field snapshot types
//! - `activity` - Active/idle tracking with transition edges
//! - `source` - In-memory source fed by an external reader
//! - `replay` - Recorded and synthetic sessions replayed as a source

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;
use thiserror::Error;

pub mod activity;
pub mod replay;
pub mod sample;
pub mod source;

pub use activity::{ActivityState, ActivityTracker, ActivityTransition};
pub use replay::{RecordingMetadata, ReplaySource, SyntheticSession, TelemetryRecording};
pub use sample::{FieldSnapshot, PlayerSample, RaceFormat, TelemetryFrame, VehicleSnapshot};
pub use source::SnapshotSource;

/// Characters that cannot appear in a file name on any supported platform.
const INVALID_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Per-tick read surface of a running simulator.
///
/// Every getter returns a complete, self-consistent value. Implementations
/// are shared between several polling loops, so they must be `Send + Sync`.
pub trait TelemetrySource: Send + Sync {
    /// Whether the player is currently on track.
    fn is_active(&self) -> bool;

    /// Track and vehicle class identity, already sanitized for use as a file name.
    fn combo_id(&self) -> String;

    fn player(&self) -> PlayerSample;

    fn field(&self) -> FieldSnapshot;
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to read recording {path:?}: {source}")]
    RecordingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid recording format in {path:?}: {source}")]
    RecordingFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Recording contains no frames")]
    EmptyRecording,
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Builds the persisted-data key for a track and vehicle class pair.
pub fn combo_id(track_name: &str, vehicle_class: &str) -> String {
    strip_invalid_chars(&format!("{track_name} - {vehicle_class}"))
}

pub fn strip_invalid_chars(name: &str) -> String {
    name.chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect()
}

/// Signed distance from `player` to `other` along a closed lap.
///
/// Positive values are ahead of the player. Whenever the direct difference
/// is longer than half a lap, the shorter way around the circuit is used.
pub fn circular_relative_distance(track_length: f64, player: f64, other: f64) -> f64 {
    let rel_dist = other - player;
    if rel_dist.abs() <= track_length * 0.5 {
        return rel_dist;
    }
    if other > player {
        rel_dist - track_length
    } else if other < player {
        rel_dist + track_length
    } else {
        rel_dist
    }
}

/// Straight-line distance between two global positions.
pub fn distance_3d(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
