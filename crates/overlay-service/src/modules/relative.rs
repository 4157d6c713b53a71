use crate::hub::OutputHub;
use crate::module::DataModule;
use async_trait::async_trait;
use racing_overlay_standings::{RelativeConfig, RelativeOrderBuilder};
use racing_overlay_telemetry::TelemetrySource;
use std::sync::Arc;

/// Publishes the relative window every active tick.
pub struct RelativeModule {
    builder: RelativeOrderBuilder,
    hub: Arc<OutputHub>,
}

impl RelativeModule {
    pub fn new(config: &RelativeConfig, hub: Arc<OutputHub>) -> Self {
        Self {
            builder: RelativeOrderBuilder::new(config),
            hub,
        }
    }
}

#[async_trait]
impl DataModule for RelativeModule {
    fn name(&self) -> &'static str {
        "relative"
    }

    fn tick(&mut self, source: &dyn TelemetrySource) {
        let field = source.field();
        self.hub.publish_relative(self.builder.build(&field));
    }
}
