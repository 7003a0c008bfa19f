//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, feed a future
//! telemetry uplink, or capture them in tests.

use crate::sensors::Readings;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// A sensor acquisition cycle completed.
    ReadingsUpdated(Readings),

    /// A pump run began.
    WateringStarted { manual: bool, duration_secs: u16 },

    /// The pump run ended.
    WateringStopped(StopReason),

    /// A relay changed logical state on external request.
    RelayChanged { index: u8, on: bool },

    /// The configuration hotspot came up.
    HotspotStarted,

    /// The configuration hotspot went down.
    HotspotStopped(SessionEnd),
}

/// Why a watering run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    DurationElapsed,
    Manual,
}

/// Why a hotspot session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    InactivityTimeout,
    Manual,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone)]
pub struct TelemetryData {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub heat_index_c: f32,
    pub soil_raw: u16,
    pub soil_percent: f32,
    pub watering_active: bool,
    pub watering_remaining_secs: u32,
    pub relays: [bool; 4],
    pub hotspot_active: bool,
}
