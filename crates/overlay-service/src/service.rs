//! Wiring of the configured modules into running loops.

use crate::config::{OverlayConfig, PollIntervals};
use crate::hub::{OutputHub, OverlayOutputs};
use crate::module::{DataModule, ModuleHandle, spawn_module};
use crate::modules::{ConsumptionModule, RelativeModule, StandingsModule};
use racing_overlay_telemetry::TelemetrySource;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Owns the output hub and the module loops of one overlay session.
pub struct OverlayService {
    config: OverlayConfig,
    source: Arc<dyn TelemetrySource>,
    hub: Arc<OutputHub>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<ModuleHandle>,
}

impl OverlayService {
    pub fn new(config: OverlayConfig, source: Arc<dyn TelemetrySource>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            source,
            hub: Arc::new(OutputHub::new()),
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    pub fn outputs(&self) -> OverlayOutputs {
        self.hub.subscribe()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Names of the running modules.
    pub fn running_modules(&self) -> Vec<&'static str> {
        self.handles.iter().map(ModuleHandle::name).collect()
    }

    /// Spawns one loop per enabled module. Must run inside a Tokio runtime.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            warn!("Overlay service already started");
            return;
        }

        let minimum = self.config.minimum_interval_ms();
        let data_dir = self.config.storage.data_dir.clone();
        let mut modules: Vec<(Box<dyn DataModule>, PollIntervals)> = Vec::new();

        if self.config.fuel.enable {
            modules.push((
                Box::new(ConsumptionModule::fuel(&data_dir, Arc::clone(&self.hub))),
                self.config.fuel.intervals(minimum),
            ));
        }
        if self.config.energy.enable {
            modules.push((
                Box::new(ConsumptionModule::energy(&data_dir, Arc::clone(&self.hub))),
                self.config.energy.intervals(minimum),
            ));
        }
        if self.config.relative.module.enable {
            modules.push((
                Box::new(RelativeModule::new(
                    &self.config.relative.layout,
                    Arc::clone(&self.hub),
                )),
                self.config.relative.module.intervals(minimum),
            ));
        }
        if self.config.standings.module.enable {
            modules.push((
                Box::new(StandingsModule::new(
                    self.config.standings.layout.clone(),
                    Arc::clone(&self.hub),
                )),
                self.config.standings.module.intervals(minimum),
            ));
        }

        for (module, intervals) in modules {
            let handle = spawn_module(
                module,
                Arc::clone(&self.source),
                intervals,
                self.shutdown_tx.subscribe(),
            );
            self.handles.push(handle);
        }
        info!(modules = ?self.running_modules(), data_dir = ?data_dir, "Overlay service started");
    }

    /// Signals every loop to stop and waits for pending saves to finish.
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send_modify(|stop| *stop = true);
        for handle in self.handles.drain(..) {
            let name = handle.name();
            match handle.join().await {
                Ok(ticks) => info!(module = name, ticks, "Module joined"),
                Err(e) => warn!(module = name, error = %e, "Module task failed"),
            }
        }
        info!("Overlay service stopped");
    }
}
