//! Published outputs of every module.
//!
//! Each output lives in its own `watch` channel. A module loop is the only
//! writer of its channels and always publishes a complete replacement value,
//! so readers see either the previous or the new value and never a partial
//! update.

use racing_overlay_fuel::{ConsumptionHistoryEntry, ConsumptionOutput};
use racing_overlay_standings::{RelativeOutput, StandingsOutput};
use std::sync::Arc;
use tokio::sync::watch;

pub type HistoryList = Arc<Vec<ConsumptionHistoryEntry>>;

#[derive(Debug)]
pub struct OutputHub {
    fuel: watch::Sender<Option<ConsumptionOutput>>,
    energy: watch::Sender<Option<ConsumptionOutput>>,
    hybrid_ratio: watch::Sender<f64>,
    history: watch::Sender<HistoryList>,
    relative: watch::Sender<Arc<RelativeOutput>>,
    standings: watch::Sender<Arc<StandingsOutput>>,
}

impl Default for OutputHub {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputHub {
    pub fn new() -> Self {
        Self {
            fuel: watch::Sender::new(None),
            energy: watch::Sender::new(None),
            hybrid_ratio: watch::Sender::new(0.0),
            history: watch::Sender::new(Arc::new(Vec::new())),
            relative: watch::Sender::new(Arc::new(RelativeOutput::default())),
            standings: watch::Sender::new(Arc::new(StandingsOutput::default())),
        }
    }

    /// Read handles for the rendering layer.
    pub fn subscribe(&self) -> OverlayOutputs {
        OverlayOutputs {
            fuel: self.fuel.subscribe(),
            energy: self.energy.subscribe(),
            hybrid_ratio: self.hybrid_ratio.subscribe(),
            history: self.history.subscribe(),
            relative: self.relative.subscribe(),
            standings: self.standings.subscribe(),
        }
    }

    pub fn publish_fuel(&self, output: Option<ConsumptionOutput>) {
        self.fuel.send_modify(|current| *current = output);
    }

    pub fn publish_energy(&self, output: Option<ConsumptionOutput>) {
        self.energy.send_modify(|current| *current = output);
    }

    pub fn publish_hybrid_ratio(&self, ratio: f64) {
        self.hybrid_ratio.send_modify(|current| *current = ratio);
    }

    /// Replaces the history list. Entries are newest first.
    pub fn publish_history(&self, entries: Vec<ConsumptionHistoryEntry>) {
        let entries = Arc::new(entries);
        self.history.send_modify(|current| *current = entries);
    }

    pub fn publish_relative(&self, output: RelativeOutput) {
        let output = Arc::new(output);
        self.relative.send_modify(|current| *current = output);
    }

    pub fn publish_standings(&self, output: StandingsOutput) {
        let output = Arc::new(output);
        self.standings.send_modify(|current| *current = output);
    }

    /// Last published fuel output, read back by the energy and history
    /// writers.
    pub fn latest_fuel(&self) -> Option<ConsumptionOutput> {
        *self.fuel.borrow()
    }

    pub fn latest_energy(&self) -> Option<ConsumptionOutput> {
        *self.energy.borrow()
    }
}

/// Reader side of the hub. Cloning is cheap and every clone sees the same values.
#[derive(Debug, Clone)]
pub struct OverlayOutputs {
    fuel: watch::Receiver<Option<ConsumptionOutput>>,
    energy: watch::Receiver<Option<ConsumptionOutput>>,
    hybrid_ratio: watch::Receiver<f64>,
    history: watch::Receiver<HistoryList>,
    relative: watch::Receiver<Arc<RelativeOutput>>,
    standings: watch::Receiver<Arc<StandingsOutput>>,
}

impl OverlayOutputs {
    pub fn fuel(&self) -> Option<ConsumptionOutput> {
        *self.fuel.borrow()
    }

    pub fn energy(&self) -> Option<ConsumptionOutput> {
        *self.energy.borrow()
    }

    pub fn hybrid_ratio(&self) -> f64 {
        *self.hybrid_ratio.borrow()
    }

    pub fn history(&self) -> HistoryList {
        Arc::clone(&self.history.borrow())
    }

    pub fn relative(&self) -> Arc<RelativeOutput> {
        Arc::clone(&self.relative.borrow())
    }

    pub fn standings(&self) -> Arc<StandingsOutput> {
        Arc::clone(&self.standings.borrow())
    }

    /// Waits for the next standings publication.
    pub async fn standings_changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.standings.changed().await
    }

    /// Waits for the next relative publication.
    pub async fn relative_changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.relative.changed().await
    }

    pub async fn fuel_changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.fuel.changed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_see_latest_value() {
        let hub = OutputHub::new();
        let outputs = hub.subscribe();
        assert!(outputs.fuel().is_none());
        assert!(outputs.history().is_empty());

        hub.publish_fuel(Some(ConsumptionOutput {
            capacity: 100.0,
            ..ConsumptionOutput::default()
        }));
        hub.publish_hybrid_ratio(1.5);

        assert!(outputs.fuel().is_some_and(|o| (o.capacity - 100.0).abs() < 1e-9));
        assert!((outputs.hybrid_ratio() - 1.5).abs() < 1e-9);
        assert!(hub.latest_fuel().is_some());
    }

    #[test]
    fn test_old_snapshot_survives_replacement() {
        let hub = OutputHub::new();
        let outputs = hub.subscribe();
        hub.publish_relative(RelativeOutput {
            sorted: Vec::new(),
            indices: vec![Some(1), None],
        });
        let before = outputs.relative();
        hub.publish_relative(RelativeOutput::default());

        assert_eq!(before.indices, vec![Some(1), None]);
        assert!(outputs.relative().indices.is_empty());
    }

    #[tokio::test]
    async fn test_change_notification() -> Result<(), watch::error::RecvError> {
        let hub = OutputHub::new();
        let mut outputs = hub.subscribe();
        hub.publish_standings(StandingsOutput {
            multi_class: true,
            ..StandingsOutput::default()
        });
        outputs.standings_changed().await?;
        assert!(outputs.standings().multi_class);
        Ok(())
    }
}
