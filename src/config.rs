//! System configuration parameters.
//!
//! All tunable parameters for the SoilWarden controller.  Values are
//! persisted to NVS and can be overridden from the captive-portal setup UI.
//!
//! ## Legacy records
//!
//! The previous firmware generation stored a JSON document with hour-only
//! window fields (`wateringTimeStart` / `wateringTimeEnd`) and a
//! `waterAtPercent` threshold.  [`IrrigationConfig::from_legacy_json`]
//! migrates such a record into the current layout exactly once, at load
//! time — no per-read fallback logic anywhere else.

use serde::{Deserialize, Serialize};

/// Default access-point identity used when the device name is empty.
pub const DEFAULT_DEVICE_NAME: &str = "SoilWarden";
/// Default access-point password for the setup hotspot.
pub const DEFAULT_AP_PASSWORD: &str = "gardening123";

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationConfig {
    // --- Identity ---
    /// Device name; doubles as the hotspot SSID.
    pub device_name: heapless::String<32>,
    /// WPA2 password for the setup hotspot.
    pub ap_password: heapless::String<64>,
    /// True until the first successful setup flow completes.
    pub first_run: bool,

    // --- Watering ---
    /// Master enable for autonomous watering.
    pub watering_enabled: bool,
    /// Watering window start (hour 0-23, minute 0-59).
    pub start_hour: u8,
    pub start_minute: u8,
    /// Watering window end, inclusive.
    pub end_hour: u8,
    pub end_minute: u8,
    /// Pump run time per watering cycle (seconds).
    pub watering_duration_secs: u16,
    /// Water when averaged soil moisture is at or below this percentage.
    pub moisture_threshold_pct: f32,
    /// Weekly rest day (0 = Sunday); never water on this day.
    pub rest_weekday: u8,
    /// Relay index driving the pump.
    pub pump_relay: u8,

    // --- Soil calibration ---
    /// Raw ADC reading in bone-dry soil (maps to 0 %).
    pub soil_dry_raw: u16,
    /// Raw ADC reading in saturated soil (maps to 100 %).
    pub soil_wet_raw: u16,

    // --- Sampling ---
    /// Samples averaged per channel per acquisition cycle.
    pub sample_count: u8,
    /// Inter-sample spacing (milliseconds).
    pub sample_interval_ms: u32,
    /// Full acquisition cycle cadence (seconds).
    pub sensor_refresh_secs: u32,

    // --- Hotspot ---
    /// Hotspot inactivity timeout (seconds).
    pub hotspot_timeout_secs: u32,
    /// Touch pad trigger threshold (reading below = touched).
    pub touch_threshold: u16,

    // --- Timing ---
    /// Control loop interval (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Telemetry report interval (seconds).
    pub telemetry_interval_secs: u32,
}

impl Default for IrrigationConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        device_name.push_str(DEFAULT_DEVICE_NAME).ok();
        let mut ap_password = heapless::String::new();
        ap_password.push_str(DEFAULT_AP_PASSWORD).ok();

        Self {
            device_name,
            ap_password,
            first_run: true,

            watering_enabled: true,
            start_hour: 8,
            start_minute: 0,
            end_hour: 9,
            end_minute: 0,
            watering_duration_secs: 60,
            moisture_threshold_pct: 50.0,
            rest_weekday: 0, // Sunday
            pump_relay: crate::pins::RELAY_PUMP,

            soil_dry_raw: 2350,
            soil_wet_raw: 815,

            sample_count: 5,
            sample_interval_ms: 100,
            sensor_refresh_secs: 60,

            hotspot_timeout_secs: 900, // 15 min
            touch_threshold: 40,

            control_loop_interval_ms: 10,
            telemetry_interval_secs: 60,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Legacy JSON migration
// ───────────────────────────────────────────────────────────────

/// On-disk shape of the previous firmware generation's JSON record.
/// Every field is optional; absent fields keep the current defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyRecord {
    #[serde(rename = "isFirstRun")]
    is_first_run: Option<bool>,
    #[serde(rename = "deviceName")]
    device_name: Option<std::string::String>,
    #[serde(rename = "apPassword")]
    ap_password: Option<std::string::String>,
    #[serde(rename = "wateringEnabled")]
    watering_enabled: Option<bool>,

    // Hour-only window fields (oldest format).
    #[serde(rename = "wateringTimeStart")]
    watering_time_start: Option<u8>,
    #[serde(rename = "wateringTimeEnd")]
    watering_time_end: Option<u8>,

    // Hour+minute window fields (newer format).
    #[serde(rename = "wateringStartHour")]
    watering_start_hour: Option<u8>,
    #[serde(rename = "wateringStartMinute")]
    watering_start_minute: Option<u8>,
    #[serde(rename = "wateringEndHour")]
    watering_end_hour: Option<u8>,
    #[serde(rename = "wateringEndMinute")]
    watering_end_minute: Option<u8>,

    #[serde(rename = "wateringDuration")]
    watering_duration: Option<u16>,

    // Threshold: oldest records used "waterAtPercent".
    #[serde(rename = "waterAtPercent")]
    water_at_percent: Option<f32>,
    #[serde(rename = "soilMoistureThreshold")]
    soil_moisture_threshold: Option<f32>,

    #[serde(rename = "soilMoistureDry")]
    soil_moisture_dry: Option<u16>,
    #[serde(rename = "soilMoistureWet")]
    soil_moisture_wet: Option<u16>,
    #[serde(rename = "touchSensorThreshold")]
    touch_sensor_threshold: Option<u16>,
}

/// Why a legacy record could not be migrated.
#[derive(Debug)]
pub enum MigrationError {
    /// The record is not valid JSON.
    Malformed,
}

impl core::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "legacy config record is not valid JSON"),
        }
    }
}

impl IrrigationConfig {
    /// Migrate a legacy JSON record into the current layout.
    ///
    /// Hour-only window fields map to hour+minute pairs with minutes
    /// zeroed.  Newer hour+minute fields win over hour-only ones when
    /// both are present.  Unknown fields are ignored.
    pub fn from_legacy_json(json: &str) -> Result<Self, MigrationError> {
        let rec: LegacyRecord =
            serde_json::from_str(json).map_err(|_| MigrationError::Malformed)?;
        let mut cfg = Self::default();

        if let Some(v) = rec.is_first_run {
            cfg.first_run = v;
        }
        if let Some(name) = rec.device_name {
            cfg.device_name.clear();
            for ch in name.chars() {
                if cfg.device_name.push(ch).is_err() {
                    break;
                }
            }
        }
        if let Some(pw) = rec.ap_password {
            cfg.ap_password.clear();
            for ch in pw.chars() {
                if cfg.ap_password.push(ch).is_err() {
                    break;
                }
            }
        }
        if let Some(v) = rec.watering_enabled {
            cfg.watering_enabled = v;
        }

        // Oldest format first, then let the split fields override.
        if let Some(h) = rec.watering_time_start {
            cfg.start_hour = h;
            cfg.start_minute = 0;
        }
        if let Some(h) = rec.watering_time_end {
            cfg.end_hour = h;
            cfg.end_minute = 0;
        }
        if let Some(h) = rec.watering_start_hour {
            cfg.start_hour = h;
        }
        if let Some(m) = rec.watering_start_minute {
            cfg.start_minute = m;
        }
        if let Some(h) = rec.watering_end_hour {
            cfg.end_hour = h;
        }
        if let Some(m) = rec.watering_end_minute {
            cfg.end_minute = m;
        }

        if let Some(d) = rec.watering_duration {
            cfg.watering_duration_secs = d;
        }
        if let Some(t) = rec.water_at_percent {
            cfg.moisture_threshold_pct = t;
        }
        if let Some(t) = rec.soil_moisture_threshold {
            cfg.moisture_threshold_pct = t;
        }
        if let Some(v) = rec.soil_moisture_dry {
            cfg.soil_dry_raw = v;
        }
        if let Some(v) = rec.soil_moisture_wet {
            cfg.soil_wet_raw = v;
        }
        if let Some(v) = rec.touch_sensor_threshold {
            cfg.touch_threshold = v;
        }

        Ok(cfg)
    }
}
