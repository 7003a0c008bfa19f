//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (configuration
//! endpoint, serial console, tests) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::IrrigationConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Start a manual watering run for the configured duration.
    WaterNow,

    /// Abort the current watering run, if any.
    StopWatering,

    /// Start a sensor acquisition cycle ahead of schedule.
    RefreshSensors,

    /// Switch an arbitrary relay channel (manual override).
    SetRelay { index: u8, on: bool },

    /// Hot-reload configuration (e.g. from the provisioning endpoint).
    UpdateConfig(IrrigationConfig),

    /// Explicitly persist the current config immediately.
    SaveConfig,
}
