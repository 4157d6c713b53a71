//! Fuel and virtual energy modules.
//!
//! Both run the same consumption pipeline on a different gauge. The fuel
//! module also owns the per-lap history; the energy module owns the
//! fuel-to-energy ratio.

use crate::hub::OutputHub;
use crate::module::DataModule;
use async_trait::async_trait;
use racing_overlay_fuel::{
    ConsumptionEstimator, ConsumptionHistory, ConsumptionOutput, CurveStore, GaugeKind,
    HistoryProbe, ReferenceLap, fuel_to_energy_ratio,
};
use racing_overlay_telemetry::{PlayerSample, TelemetrySource};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ConsumptionModule {
    kind: GaugeKind,
    store: CurveStore,
    hub: Arc<OutputHub>,
    estimator: ConsumptionEstimator,
    combo: String,
    pending_save: Option<Arc<ReferenceLap>>,
    writes: Vec<JoinHandle<()>>,
    history: Option<ConsumptionHistory>,
}

impl ConsumptionModule {
    pub fn fuel(data_dir: &Path, hub: Arc<OutputHub>) -> Self {
        let mut module = Self::new(GaugeKind::Fuel, data_dir, hub);
        module.history = Some(ConsumptionHistory::default());
        module
    }

    pub fn energy(data_dir: &Path, hub: Arc<OutputHub>) -> Self {
        Self::new(GaugeKind::Energy, data_dir, hub)
    }

    fn new(kind: GaugeKind, data_dir: &Path, hub: Arc<OutputHub>) -> Self {
        Self {
            kind,
            store: CurveStore::new(data_dir, kind.file_extension()),
            hub,
            estimator: ConsumptionEstimator::new(kind, ReferenceLap::zero()),
            combo: String::new(),
            pending_save: None,
            writes: Vec::new(),
            history: None,
        }
    }

    pub fn kind(&self) -> GaugeKind {
        self.kind
    }

    pub fn reference(&self) -> &Arc<ReferenceLap> {
        self.estimator.reference()
    }

    fn publish(&mut self, sample: &PlayerSample, output: Option<ConsumptionOutput>) {
        match self.kind {
            GaugeKind::Fuel => {
                self.hub.publish_fuel(output);
                self.record_history(sample, output);
            }
            GaugeKind::Energy => {
                self.hub.publish_energy(output);
                let ratio = match (self.hub.latest_fuel(), output) {
                    (Some(fuel), Some(energy)) => fuel_to_energy_ratio(
                        fuel.estimated_consumption,
                        energy.estimated_consumption,
                    ),
                    _ => 0.0,
                };
                self.hub.publish_hybrid_ratio(ratio);
            }
        }
    }

    async fn await_writes(&mut self) {
        for write in self.writes.drain(..) {
            if let Err(e) = write.await {
                warn!(module = self.kind.name(), error = %e, "Background save task failed");
            }
        }
    }

    fn record_history(&mut self, sample: &PlayerSample, fuel: Option<ConsumptionOutput>) {
        let Some(history) = self.history.as_mut() else {
            return;
        };
        let energy_used = self
            .hub
            .latest_energy()
            .map_or(0.0, |energy| energy.last_lap_consumption);
        let probe = HistoryProbe {
            completed_laps: sample.completed_laps,
            is_valid_lap: sample.is_valid_lap,
            last_lap_time: sample.last_lap_time,
            current_lap_time: sample.current_lap_time,
            fuel_used: fuel.map_or(0.0, |fuel| fuel.last_lap_consumption),
            energy_used,
            battery_drain: sample.battery_drain_last,
            battery_regen: sample.battery_regen_last,
        };
        if history.record(&probe) {
            debug!(lap = sample.completed_laps, "Consumption history updated");
            self.hub.publish_history(history.to_vec());
        }
    }
}

#[async_trait]
impl DataModule for ConsumptionModule {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    async fn on_activate(&mut self, source: &dyn TelemetrySource) {
        // A save queued by the previous deactivation must land before the load.
        self.await_writes().await;
        self.combo = source.combo_id();
        let store = self.store.clone();
        let combo = self.combo.clone();
        let reference = match tokio::task::spawn_blocking(move || store.load_or_default(&combo)).await
        {
            Ok(lap) => lap,
            Err(e) => {
                warn!(module = self.kind.name(), error = %e, "Reference lap load task failed");
                ReferenceLap::zero()
            }
        };
        self.estimator = ConsumptionEstimator::new(self.kind, reference);
        self.pending_save = None;
        if let Some(history) = &self.history {
            self.hub.publish_history(history.to_vec());
        }
    }

    async fn on_deactivate(&mut self) {
        let Some(lap) = self.pending_save.take() else {
            return;
        };
        let store = self.store.clone();
        let combo = self.combo.clone();
        let kind = self.kind.name();
        info!(module = kind, combo = %combo, "Saving reference lap in background");
        self.writes.retain(|write| !write.is_finished());
        self.writes.push(tokio::task::spawn_blocking(move || {
            if let Err(e) = store.save(&combo, &lap) {
                warn!(module = kind, combo = %combo, error = %e, "Failed to save reference lap");
            }
        }));
    }

    fn tick(&mut self, source: &dyn TelemetrySource) {
        let sample = source.player();
        let output = self.estimator.step(&sample);
        if let Some(lap) = self.estimator.take_save_request() {
            debug!(module = self.kind.name(), samples = lap.len(), "New reference lap queued for saving");
            self.pending_save = Some(lap);
        }
        self.publish(&sample, output);
    }

    async fn finish(&mut self) {
        self.await_writes().await;
    }
}
