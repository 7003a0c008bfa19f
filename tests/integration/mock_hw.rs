//! Mock adapters for integration tests.
//!
//! Record every port call so tests can assert on the full command
//! history without touching real GPIO, radios, or the RTC.

use soilwarden::app::events::AppEvent;
use soilwarden::app::ports::{ActuatorPort, ClockPort, EventSink, NetworkPort, SensorPort};
use soilwarden::scheduler::LocalTime;

// ── Mock hardware (sensors + relays) ──────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    Set { index: u8, on: bool },
    AllOff,
}

pub struct MockHardware {
    pub soil_raw: f32,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub touch_level: u16,
    pub probe_powered: bool,
    pub relays: [bool; 4],
    pub relay_calls: Vec<RelayCall>,
    pub soil_reads: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            soil_raw: 1582.0, // roughly 50 % with default calibration
            temperature_c: 22.0,
            humidity_pct: 55.0,
            pressure_hpa: 1012.0,
            touch_level: 100, // idle, well above the default threshold
            probe_powered: false,
            relays: [false; 4],
            relay_calls: Vec::new(),
            soil_reads: 0,
        }
    }

    pub fn pump_on(&self) -> bool {
        self.relays[usize::from(soilwarden::pins::RELAY_PUMP)]
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_soil_raw(&mut self) -> f32 {
        self.soil_reads += 1;
        self.soil_raw
    }

    fn read_temperature_c(&mut self) -> f32 {
        self.temperature_c
    }

    fn read_humidity_pct(&mut self) -> f32 {
        self.humidity_pct
    }

    fn read_pressure_hpa(&mut self) -> f32 {
        self.pressure_hpa
    }

    fn read_touch_level(&mut self) -> u16 {
        self.touch_level
    }

    fn power_soil_probe(&mut self, on: bool) {
        self.probe_powered = on;
    }
}

impl ActuatorPort for MockHardware {
    fn set_relay(&mut self, index: u8, on: bool) {
        self.relay_calls.push(RelayCall::Set { index, on });
        if let Some(state) = self.relays.get_mut(usize::from(index)) {
            *state = on;
        }
    }

    fn relay_state(&self, index: u8) -> bool {
        self.relays.get(usize::from(index)).copied().unwrap_or(false)
    }

    fn all_off(&mut self) {
        self.relay_calls.push(RelayCall::AllOff);
        self.relays = [false; 4];
    }
}

// ── Mock network ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockNetwork {
    pub ap_active: bool,
    pub dns_active: bool,
    pub fail_ap_start: bool,
    pub ap_starts: u32,
    pub resets: u32,
    pub dns_ticks: u32,
    pub last_ssid: String,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NetworkPort for MockNetwork {
    fn start_access_point(&mut self, ssid: &str, _password: &str) -> bool {
        self.ap_starts += 1;
        if self.fail_ap_start {
            return false;
        }
        self.ap_active = true;
        self.last_ssid = ssid.to_string();
        true
    }

    fn stop_access_point(&mut self) {
        self.ap_active = false;
    }

    fn ap_ip(&self) -> [u8; 4] {
        [192, 168, 4, 1]
    }

    fn start_dns_responder(&mut self, _ip: [u8; 4]) {
        self.dns_active = true;
    }

    fn stop_dns_responder(&mut self) {
        self.dns_active = false;
    }

    fn process_dns(&mut self) {
        self.dns_ticks += 1;
    }

    fn reset(&mut self) {
        self.ap_active = false;
        self.dns_active = false;
        self.resets += 1;
    }
}

// ── Mock clock ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClock {
    pub now: Option<LocalTime>,
    pub uptime_ms: u64,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monday 2026-06-15 at the given time; weekday 1.
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            now: Some(LocalTime {
                year: 2026,
                month: 6,
                day: 15,
                weekday: 1,
                hour,
                minute,
                second: 0,
            }),
            uptime_ms: 0,
        }
    }
}

impl ClockPort for MockClock {
    fn now(&self) -> Option<LocalTime> {
        self.now
    }

    fn uptime_ms(&self) -> u64 {
        self.uptime_ms
    }
}

// ── Capturing event sink ──────────────────────────────────────

#[derive(Default)]
pub struct CaptureSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_watering_started(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::WateringStarted { .. }))
            .count()
    }

    pub fn has_hotspot_started(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, AppEvent::HotspotStarted))
    }
}

impl EventSink for CaptureSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
