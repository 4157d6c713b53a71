//! Polling service for the racing overlay core.
//!
//! Each enabled module runs its own loop against a shared telemetry source,
//! sleeping for the configured active or idle interval between ticks, and
//! publishes complete replacement values through the [`OutputHub`].
//!
//! ## Modules
//! - `config` - YAML/JSON configuration with per-module intervals
//! - `hub` - Single-writer output channels and reader handles
//! - `module` - `DataModule` trait and the shared polling loop
//! - `modules` - Fuel, energy, relative and standings modules
//! - `service` - Starts and stops the configured loops

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod hub;
pub mod module;
pub mod modules;
pub mod service;

pub use config::{ConfigError, ModuleConfig, OverlayConfig, PollIntervals};
pub use hub::{OutputHub, OverlayOutputs};
pub use module::{DataModule, ModuleHandle, run_module, spawn_module};
pub use service::OverlayService;
