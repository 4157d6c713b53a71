//! In-memory telemetry source.

use crate::sample::{FieldSnapshot, PlayerSample, TelemetryFrame};
use crate::{TelemetrySource, combo_id};
use parking_lot::RwLock;
use std::sync::Arc;

/// Source fed by an external simulator reader.
///
/// The reader publishes whole frames; consumers always observe either the
/// previous or the new frame, never a mix of both.
#[derive(Debug, Default)]
pub struct SnapshotSource {
    frame: RwLock<Arc<TelemetryFrame>>,
    combo: RwLock<String>,
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_combo(track_name: &str, vehicle_class: &str) -> Self {
        let source = Self::default();
        source.set_combo(track_name, vehicle_class);
        source
    }

    pub fn publish(&self, frame: TelemetryFrame) {
        *self.frame.write() = Arc::new(frame);
    }

    pub fn set_combo(&self, track_name: &str, vehicle_class: &str) {
        *self.combo.write() = combo_id(track_name, vehicle_class);
    }

    pub fn frame(&self) -> Arc<TelemetryFrame> {
        Arc::clone(&self.frame.read())
    }
}

impl TelemetrySource for SnapshotSource {
    fn is_active(&self) -> bool {
        self.frame.read().on_track
    }

    fn combo_id(&self) -> String {
        self.combo.read().clone()
    }

    fn player(&self) -> PlayerSample {
        self.frame.read().player.clone()
    }

    fn field(&self) -> FieldSnapshot {
        self.frame.read().field.clone()
    }
}
