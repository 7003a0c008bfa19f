//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the watering scheduler, the hotspot session, the
//! in-flight sensor acquisition, and the live configuration.  It exposes
//! a clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!    ClockPort ──▶ │         AppService          │
//! ActuatorPort ◀── │ acquisition·watering·hotspot│
//!  NetworkPort ◀── └─────────────────────────────┘
//! ```
//!
//! ## Tick order
//!
//! Each [`tick`](AppService::tick) services, in order: name resolution,
//! sensor acquisition, watering deadline, the autonomous watering
//! decision, the touch pad, the hotspot timeout, and telemetry.  Every
//! step is bounded; multi-sample acquisition spreads across ticks.

use log::{info, warn};

use crate::config::IrrigationConfig;
use crate::drivers::touch::TouchTrigger;
use crate::hotspot::HotspotSession;
use crate::scheduler::WateringScheduler;
use crate::sensors::{AcquisitionCycle, Readings};

use super::commands::AppCommand;
use super::events::{AppEvent, SessionEnd, StopReason, TelemetryData};
use super::ports::{ActuatorPort, ClockPort, ConfigPort, EventSink, NetworkPort, SensorPort};

/// Delay between a config change and its automatic persistence.
/// Batches rapid edits from the provisioning endpoint into one write.
const AUTO_SAVE_DELAY_MS: u64 = 5000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: IrrigationConfig,
    scheduler: WateringScheduler,
    hotspot: HotspotSession,
    touch: TouchTrigger,
    readings: Readings,
    /// False until the first acquisition completes; autonomous watering
    /// never fires on the zeroed boot-time snapshot.
    have_readings: bool,
    acquisition: Option<AcquisitionCycle>,
    next_refresh_ms: u64,
    next_telemetry_ms: u64,
    tick_count: u64,
    config_dirty: bool,
    dirty_since_ms: u64,
}

impl AppService {
    /// Construct the service from configuration.
    pub fn new(config: IrrigationConfig) -> Self {
        let hotspot = HotspotSession::new(config.hotspot_timeout_secs);
        let touch = TouchTrigger::new(config.touch_threshold);
        let next_telemetry_ms = u64::from(config.telemetry_interval_secs) * 1000;

        Self {
            config,
            scheduler: WateringScheduler::new(),
            hotspot,
            touch,
            readings: Readings::default(),
            have_readings: false,
            acquisition: None,
            // First acquisition runs on the first tick after start.
            next_refresh_ms: 0,
            next_telemetry_ms,
            tick_count: 0,
            config_dirty: false,
            dirty_since_ms: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!("AppService started");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        net: &mut impl NetworkPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Name resolution while the hotspot is up.
        self.hotspot.process_dns(net);

        // 2. Sensor acquisition: advance the in-flight cycle, or start a
        //    fresh one when the refresh interval has elapsed.
        self.service_acquisition(now_ms, hw, sink);

        // 3. Watering deadline.
        if self.scheduler.check_elapsed(now_ms) {
            hw.set_relay(self.config.pump_relay, false);
            sink.emit(&AppEvent::WateringStopped(StopReason::DurationElapsed));
            info!("watering: duration elapsed, pump off");
        }

        // 4. Autonomous watering decision.  Requires a plausible clock;
        //    an unset RTC must never start the pump on its own.
        if !self.scheduler.is_active() && self.have_readings {
            if let Some(t) = clock.now().filter(|t| t.is_plausible()) {
                if self
                    .scheduler
                    .should_water(&t, self.readings.soil_percent, &self.config)
                {
                    self.begin_watering(Some(t.day), now_ms, false, hw, sink);
                }
            }
        }

        // 5. Touch pad: wake the configuration hotspot.
        let level = hw.read_touch_level();
        if self.touch.tick(level, now_ms) {
            info!("touch: contact detected (level={level})");
            self.start_hotspot(net, now_ms, sink);
            self.hotspot.note_activity(now_ms);
        }

        // 6. Hotspot inactivity timeout.
        if self.hotspot.check_timeout(net, now_ms) {
            sink.emit(&AppEvent::HotspotStopped(SessionEnd::InactivityTimeout));
        }

        // 7. Periodic telemetry.
        if now_ms >= self.next_telemetry_ms {
            let snapshot = self.build_telemetry(hw, now_ms);
            sink.emit(&AppEvent::Telemetry(snapshot));
            self.next_telemetry_ms =
                now_ms + u64::from(self.config.telemetry_interval_secs) * 1000;
        }
    }

    fn service_acquisition(
        &mut self,
        now_ms: u64,
        hw: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) {
        if let Some(cycle) = self.acquisition.as_mut() {
            if let Some(readings) = cycle.poll(now_ms, hw) {
                self.readings = readings;
                self.have_readings = true;
                self.acquisition = None;
                self.next_refresh_ms =
                    now_ms + u64::from(self.config.sensor_refresh_secs) * 1000;
                if readings.soil_valid_samples == 0 {
                    warn!("sensors: soil probe returned no valid samples");
                }
                sink.emit(&AppEvent::ReadingsUpdated(readings));
            }
        } else if now_ms >= self.next_refresh_ms {
            self.acquisition = Some(AcquisitionCycle::begin(&self.config, hw, now_ms));
        }
    }

    /// Start a pump run.  The day latch is written before the relay is
    /// energised; `day` is `None` when the clock is invalid.
    fn begin_watering(
        &mut self,
        day: Option<u8>,
        now_ms: u64,
        manual: bool,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        if !self
            .scheduler
            .start(day, now_ms, self.config.watering_duration_secs)
        {
            return;
        }
        hw.set_relay(self.config.pump_relay, true);
        sink.emit(&AppEvent::WateringStarted {
            manual,
            duration_secs: self.config.watering_duration_secs,
        });
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (provisioning endpoint, serial, tests).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        let now_ms = clock.uptime_ms();
        match cmd {
            AppCommand::WaterNow => {
                let day = clock.now().filter(|t| t.is_plausible()).map(|t| t.day);
                self.begin_watering(day, now_ms, true, hw, sink);
            }
            AppCommand::StopWatering => {
                if self.scheduler.stop() {
                    hw.set_relay(self.config.pump_relay, false);
                    sink.emit(&AppEvent::WateringStopped(StopReason::Manual));
                }
            }
            AppCommand::RefreshSensors => {
                // Picked up by the next tick; a cycle already in flight
                // simply runs to completion first.
                self.next_refresh_ms = now_ms;
            }
            AppCommand::SetRelay { index, on } => {
                hw.set_relay(index, on);
                sink.emit(&AppEvent::RelayChanged {
                    index,
                    on: hw.relay_state(index),
                });
            }
            AppCommand::UpdateConfig(new_config) => {
                self.touch.set_threshold(new_config.touch_threshold);
                self.hotspot
                    .set_timeout_secs(new_config.hotspot_timeout_secs);
                self.config = new_config;
                self.mark_config_dirty(now_ms);
                info!("configuration updated at runtime");
            }
            AppCommand::SaveConfig => {
                self.mark_config_dirty(now_ms);
                self.dirty_since_ms = 0;
                info!("explicit config save requested (flushes on next auto-save check)");
            }
        }
    }

    // ── Hotspot control ───────────────────────────────────────

    /// Bring the configuration hotspot up.  Emits only on the transition.
    pub fn start_hotspot(
        &mut self,
        net: &mut impl NetworkPort,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> bool {
        let was_active = self.hotspot.is_active();
        let up = self.hotspot.start_session(
            net,
            self.config.device_name.as_str(),
            self.config.ap_password.as_str(),
            now_ms,
        );
        if up && !was_active {
            sink.emit(&AppEvent::HotspotStarted);
        }
        up
    }

    /// Tear the hotspot down on explicit request.
    pub fn stop_hotspot(&mut self, net: &mut impl NetworkPort, sink: &mut impl EventSink) {
        if !self.hotspot.is_active() {
            return;
        }
        self.hotspot.stop_session(net);
        sink.emit(&AppEvent::HotspotStopped(SessionEnd::Manual));
    }

    /// Record client activity on the hotspot, deferring its timeout.
    pub fn note_activity(&mut self, now_ms: u64) {
        self.hotspot.note_activity(now_ms);
    }

    /// Enter or leave setup mode.  Entering resets the network stack and
    /// suppresses the hotspot timeout until provisioning completes.
    pub fn set_setup_mode(&mut self, net: &mut impl NetworkPort, enabled: bool) {
        self.hotspot.set_setup_mode(net, enabled);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_watering_active(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn remaining_watering_secs(&self, now_ms: u64) -> u32 {
        self.scheduler.remaining_secs(now_ms)
    }

    pub fn latest_readings(&self) -> Readings {
        self.readings
    }

    pub fn is_hotspot_active(&self) -> bool {
        self.hotspot.is_active()
    }

    pub fn last_watered_day(&self) -> Option<u8> {
        self.scheduler.last_watered_day()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clone of the live configuration (for endpoint read-back).
    pub fn current_config(&self) -> IrrigationConfig {
        self.config.clone()
    }

    /// Build a telemetry snapshot from current state.
    pub fn build_telemetry(&self, hw: &impl ActuatorPort, now_ms: u64) -> TelemetryData {
        let r = &self.readings;
        TelemetryData {
            temperature_c: r.temperature_c,
            humidity_pct: r.humidity_pct,
            pressure_hpa: r.pressure_hpa,
            heat_index_c: r.heat_index_c,
            soil_raw: r.soil_raw,
            soil_percent: r.soil_percent,
            watering_active: self.scheduler.is_active(),
            watering_remaining_secs: self.scheduler.remaining_secs(now_ms),
            relays: [
                hw.relay_state(0),
                hw.relay_state(1),
                hw.relay_state(2),
                hw.relay_state(3),
            ],
            hotspot_active: self.hotspot.is_active(),
        }
    }

    // ── Config dirty-flag management ──────────────────────────

    fn mark_config_dirty(&mut self, now_ms: u64) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_ms = now_ms;
        }
    }

    /// Persist the config once it has been dirty for the debounce delay.
    /// Returns `true` if a save happened.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        if now_ms.saturating_sub(self.dirty_since_ms) < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("config auto-saved");
                true
            }
            Err(e) => {
                warn!("config auto-save failed: {e}");
                false
            }
        }
    }

    /// Flush a dirty config immediately (shutdown path).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                true
            }
            Err(e) => {
                warn!("config save failed: {e}");
                false
            }
        }
    }
}
