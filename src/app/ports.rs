//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, relays, radio, clock, storage) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the domain core never touches hardware directly.

use crate::config::IrrigationConfig;
use crate::scheduler::LocalTime;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one raw sample per call, no averaging, no retries.
/// A failed read returns NaN and is filtered by the sampling layer.
pub trait SensorPort {
    /// Soil probe ADC counts.  The probe must be powered first.
    fn read_soil_raw(&mut self) -> f32;

    fn read_temperature_c(&mut self) -> f32;
    fn read_humidity_pct(&mut self) -> f32;
    fn read_pressure_hpa(&mut self) -> f32;

    /// Raw touch pad level; drops below threshold on contact.
    fn read_touch_level(&mut self) -> u16;

    /// Switch the soil probe supply.  Powered only during acquisition.
    fn power_soil_probe(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain commands the relay bank through this.
/// Out-of-range indices are no-ops that read back as off.
pub trait ActuatorPort {
    fn set_relay(&mut self, index: u8, on: bool);

    fn relay_state(&self, index: u8) -> bool;

    /// De-energise every channel — safe shutdown.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain → radio / sockets)
// ───────────────────────────────────────────────────────────────

/// Access-point and captive-DNS control.  Implementations log their own
/// failures; the domain only needs the boolean outcome.
pub trait NetworkPort {
    /// Bring the soft-AP up.  Returns false when the radio refuses
    /// (invalid credentials, driver error); safe to retry later.
    fn start_access_point(&mut self, ssid: &str, password: &str) -> bool;

    fn stop_access_point(&mut self);

    /// Address clients reach the device at while the AP is up.
    fn ap_ip(&self) -> [u8; 4];

    /// Start the catch-all name resolver answering every query with `ip`.
    fn start_dns_responder(&mut self, ip: [u8; 4]);

    fn stop_dns_responder(&mut self);

    /// Service pending name queries.  Bounded work per call.
    fn process_dns(&mut self);

    /// Tear the whole stack down to a known-idle state.
    fn reset(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: RTC / system time → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock and monotonic time.
pub trait ClockPort {
    /// Current local time, or `None` when the clock has never been set.
    /// Callers must treat `None` as "do not make time-based decisions".
    fn now(&self) -> Option<LocalTime>;

    /// Monotonic milliseconds since boot.  Never goes backwards.
    fn uptime_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// future MQTT uplink, test capture buffers).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the irrigation configuration.
///
/// Implementations MUST validate before persisting: invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] on a blank device.
    fn load(&self) -> Result<IrrigationConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &IrrigationConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
