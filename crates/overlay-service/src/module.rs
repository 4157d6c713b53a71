//! Polling loop shared by every data module.
//!
//! A loop samples the telemetry source, feeds active ticks to its module and
//! then sleeps for the active or idle interval. The sleep is the only wait,
//! and it ends early when shutdown is signalled.

use crate::config::PollIntervals;
use async_trait::async_trait;
use racing_overlay_telemetry::{ActivityTracker, ActivityTransition, TelemetrySource};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One periodically polled estimator.
///
/// All module state stays inside the implementing struct and is only touched
/// from its own loop.
#[async_trait]
pub trait DataModule: Send {
    fn name(&self) -> &'static str;

    /// Called on the idle to active edge, before the first active tick.
    async fn on_activate(&mut self, _source: &dyn TelemetrySource) {}

    /// Called on the active to idle edge and once more at shutdown if active.
    async fn on_deactivate(&mut self) {}

    /// Processes one active tick.
    fn tick(&mut self, source: &dyn TelemetrySource);

    /// Waits for any background work the module started.
    async fn finish(&mut self) {}
}

/// Handle to a running module loop.
#[derive(Debug)]
pub struct ModuleHandle {
    name: &'static str,
    task: JoinHandle<u64>,
}

impl ModuleHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Waits for the loop to exit and returns the number of active ticks it ran.
    pub async fn join(self) -> Result<u64, tokio::task::JoinError> {
        self.task.await
    }
}

/// Spawns the polling loop of `module` on the current runtime.
pub fn spawn_module(
    module: Box<dyn DataModule>,
    source: Arc<dyn TelemetrySource>,
    intervals: PollIntervals,
    shutdown: watch::Receiver<bool>,
) -> ModuleHandle {
    let name = module.name();
    let task = tokio::spawn(run_module(module, source, intervals, shutdown));
    ModuleHandle { name, task }
}

/// Runs a module until shutdown is signalled or the shutdown sender drops.
pub async fn run_module(
    mut module: Box<dyn DataModule>,
    source: Arc<dyn TelemetrySource>,
    intervals: PollIntervals,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let name = module.name();
    info!(
        module = name,
        active_ms = intervals.active.as_millis(),
        idle_ms = intervals.idle.as_millis(),
        "Module started"
    );

    let mut activity = ActivityTracker::new();
    let mut ticks = 0_u64;

    while !*shutdown.borrow() {
        let active = source.is_active();
        match activity.update(active) {
            Some(ActivityTransition::Activated) => {
                debug!(module = name, "Module active");
                module.on_activate(source.as_ref()).await;
            }
            Some(ActivityTransition::Deactivated) => {
                debug!(module = name, "Module idle");
                module.on_deactivate().await;
            }
            None => {}
        }

        let wait = if active {
            module.tick(source.as_ref());
            ticks = ticks.saturating_add(1);
            intervals.active
        } else {
            intervals.idle
        };

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    if activity.state().is_active() {
        module.on_deactivate().await;
    }
    module.finish().await;
    info!(module = name, ticks, "Module stopped");
    ticks
}
