//! SoilWarden firmware — main entry point.
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  HardwareAdapter   SoftApAdapter   NvsAdapter            │
//! │  (Sensor+Actuator) (NetworkPort)   (ConfigPort)          │
//! │  SystemClockAdapter  LogEventSink                        │
//! │  (ClockPort)         (EventSink)                         │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ──────────────      │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │           AppService (pure logic)              │      │
//! │  │  acquisition · watering · hotspot · telemetry  │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use soilwarden::adapters::hardware::HardwareAdapter;
use soilwarden::adapters::log_sink::LogEventSink;
use soilwarden::adapters::network::SoftApAdapter;
use soilwarden::adapters::nvs::NvsAdapter;
use soilwarden::adapters::time::SystemClockAdapter;
use soilwarden::app::ports::{ClockPort, ConfigPort};
use soilwarden::app::service::AppService;
use soilwarden::config::IrrigationConfig;
use soilwarden::drivers;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SoilWarden v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the TWDT
        // reboots the device after its timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = drivers::watchdog::Watchdog::new();

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            IrrigationConfig::default()
        }
    };
    let first_run = config.first_run;

    // ── 4. Construct adapters ─────────────────────────────────
    let peripherals = esp_idf_svc::hal::peripherals::Peripherals::take()?;
    let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;
    let wifi = esp_idf_svc::wifi::EspWifi::new(peripherals.modem, sysloop, None)?;
    let mut net = SoftApAdapter::new(wifi);

    let mut hw = HardwareAdapter::new(true);
    if !hw.init_sensors() {
        warn!("BME280 unavailable, environmental readings degrade to fallback");
    }
    let clock = SystemClockAdapter::new();
    let mut sink = LogEventSink::new();

    // ── 5. Application service ────────────────────────────────
    let mut app = AppService::new(config.clone());
    app.start(&mut sink);

    if first_run {
        // Fresh device: hold the provisioning hotspot open until the
        // operator completes setup.
        info!("first run: entering setup mode");
        app.set_setup_mode(&mut net, true);
        app.start_hotspot(&mut net, clock.uptime_ms(), &mut sink);
    }

    info!("system ready, entering control loop");

    // ── 6. Control loop ───────────────────────────────────────
    let tick_ms = u64::from(config.control_loop_interval_ms);
    loop {
        std::thread::sleep(std::time::Duration::from_millis(tick_ms));

        let now_ms = clock.uptime_ms();
        app.tick(now_ms, &mut hw, &mut net, &clock, &mut sink);
        app.auto_save_if_needed(now_ms, &nvs);
        watchdog.feed();
    }
}
