use crate::hub::OutputHub;
use crate::module::DataModule;
use async_trait::async_trait;
use racing_overlay_standings::{StandingsBuilder, StandingsConfig};
use racing_overlay_telemetry::TelemetrySource;
use std::sync::Arc;

/// Publishes class positions and the windowed standings every active tick.
pub struct StandingsModule {
    builder: StandingsBuilder,
    hub: Arc<OutputHub>,
}

impl StandingsModule {
    pub fn new(config: StandingsConfig, hub: Arc<OutputHub>) -> Self {
        Self {
            builder: StandingsBuilder::new(config),
            hub,
        }
    }
}

#[async_trait]
impl DataModule for StandingsModule {
    fn name(&self) -> &'static str {
        "standings"
    }

    fn tick(&mut self, source: &dyn TelemetrySource) {
        let field = source.field();
        self.hub.publish_standings(self.builder.build(&field));
    }
}
