//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future MQTT or web-push adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | T={:.1}\u{00b0}C RH={:.1}% P={:.1}hPa HI={:.1}\u{00b0}C | \
                     soil={:.1}% (raw={}) | watering={} remaining={}s | \
                     relays=[{} {} {} {}] | hotspot={}",
                    t.temperature_c,
                    t.humidity_pct,
                    t.pressure_hpa,
                    t.heat_index_c,
                    t.soil_percent,
                    t.soil_raw,
                    t.watering_active,
                    t.watering_remaining_secs,
                    u8::from(t.relays[0]),
                    u8::from(t.relays[1]),
                    u8::from(t.relays[2]),
                    u8::from(t.relays[3]),
                    t.hotspot_active,
                );
            }
            AppEvent::ReadingsUpdated(r) => {
                info!(
                    "SENSE | soil={:.1}% (raw={}, {} valid) T={:.1}\u{00b0}C RH={:.1}%",
                    r.soil_percent, r.soil_raw, r.soil_valid_samples, r.temperature_c, r.humidity_pct,
                );
            }
            AppEvent::WateringStarted {
                manual,
                duration_secs,
            } => {
                info!(
                    "WATER | started ({}) for {}s",
                    if *manual { "manual" } else { "scheduled" },
                    duration_secs,
                );
            }
            AppEvent::WateringStopped(reason) => {
                info!("WATER | stopped ({:?})", reason);
            }
            AppEvent::RelayChanged { index, on } => {
                info!("RELAY | #{} -> {}", index, if *on { "ON" } else { "OFF" });
            }
            AppEvent::HotspotStarted => {
                info!("HOTSPOT | session up");
            }
            AppEvent::HotspotStopped(end) => {
                info!("HOTSPOT | session down ({:?})", end);
            }
            AppEvent::Started => {
                info!("START | service running");
            }
        }
    }
}
