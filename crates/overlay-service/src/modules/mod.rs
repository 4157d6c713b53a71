//! Concrete data modules driven by the polling loop.

pub mod consumption;
pub mod relative;
pub mod standings;

pub use consumption::ConsumptionModule;
pub use relative::RelativeModule;
pub use standings::StandingsModule;
