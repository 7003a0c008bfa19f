//! End-to-end control-loop tests for [`AppService`].
//!
//! Each test drives `tick()` with mock ports and asserts on relay
//! actuation and emitted events.  Time is fully synthetic: one tick per
//! simulated control-loop interval.

use soilwarden::app::commands::AppCommand;
use soilwarden::app::events::{AppEvent, StopReason};
use soilwarden::app::service::AppService;
use soilwarden::config::IrrigationConfig;
use soilwarden::pins::RELAY_PUMP;

use crate::mock_hw::{CaptureSink, MockClock, MockHardware, MockNetwork, RelayCall};

const TICK_MS: u64 = 100;

/// Default calibration (dry 2350, wet 815) ADC value reading ~40 %.
const RAW_40_PCT: f32 = 1736.0;
/// Default calibration ADC value reading ~80 %.
const RAW_80_PCT: f32 = 1122.0;

fn service() -> AppService {
    AppService::new(IrrigationConfig::default())
}

/// Drive ticks over `[from_ms, to_ms]` inclusive, stepping by `TICK_MS`.
fn run(
    app: &mut AppService,
    hw: &mut MockHardware,
    net: &mut MockNetwork,
    clock: &MockClock,
    sink: &mut CaptureSink,
    from_ms: u64,
    to_ms: u64,
) {
    let mut t = from_ms;
    while t <= to_ms {
        app.tick(t, hw, net, clock, sink);
        t += TICK_MS;
    }
}

// ── Acquisition ───────────────────────────────────────────────

#[test]
fn acquisition_powers_probe_and_reports_readings() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let clock = MockClock::new(); // no wall clock
    let mut sink = CaptureSink::new();

    // First tick begins the cycle and powers the probe.
    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    assert!(hw.probe_powered);
    assert_eq!(hw.soil_reads, 0, "settling delay must gate the first sample");

    // 5 samples spaced 100 ms starting after the 500 ms settle: the
    // cycle completes by t=900.
    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 100, 1000);
    assert!(!hw.probe_powered, "probe powered down after the cycle");

    let readings = app.latest_readings();
    assert!((readings.soil_percent - 40.0).abs() < 0.5, "{readings:?}");
    assert_eq!(readings.soil_valid_samples, 5);
    assert!((readings.temperature_c - 22.0).abs() < 0.001);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::ReadingsUpdated(_))),
        "completion must be announced"
    );
}

#[test]
fn failed_probe_degrades_to_dry_fallback() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = 0.0; // disconnected probe reads 0 counts
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 1000);

    let readings = app.latest_readings();
    assert_eq!(readings.soil_valid_samples, 0);
    // Raw falls back to the dry bound so a dead probe reads as "needs
    // water"; the percent channel clamps 0 counts to 100 % per sample.
    assert_eq!(readings.soil_raw, 2350);
}

// ── Autonomous watering ───────────────────────────────────────

#[test]
fn waters_inside_window_when_dry() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT; // below the 50 % threshold
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 2000);

    assert!(app.is_watering_active());
    assert!(hw.pump_on());
    assert_eq!(sink.count_watering_started(), 1);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::WateringStarted {
            manual: false,
            duration_secs: 60
        }
    )));
    assert_eq!(app.last_watered_day(), Some(15));
}

#[test]
fn day_latch_is_written_before_the_pump_goes_on() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 2000);

    // The pump-on call happened, and by then the latch was already set;
    // a reset between the two can only lose a watering, never repeat it.
    assert!(hw
        .relay_calls
        .contains(&RelayCall::Set { index: RELAY_PUMP, on: true }));
    assert_eq!(app.last_watered_day(), Some(15));
}

#[test]
fn waters_at_most_once_per_day() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    // Run well past the 60 s watering duration, still inside the window.
    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 120_000);

    assert!(!app.is_watering_active());
    assert!(!hw.pump_on());
    assert_eq!(sink.count_watering_started(), 1);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::WateringStopped(StopReason::DurationElapsed))));
}

#[test]
fn moist_soil_blocks_watering() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_80_PCT;
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 5000);

    assert!(!app.is_watering_active());
    assert_eq!(sink.count_watering_started(), 0);
}

#[test]
fn unset_clock_never_waters_autonomously() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let clock = MockClock::new(); // now() is None
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 10_000);

    assert!(!app.is_watering_active());
    assert_eq!(sink.count_watering_started(), 0);
}

#[test]
fn implausible_clock_year_never_waters() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let mut clock = MockClock::at(8, 30);
    if let Some(t) = clock.now.as_mut() {
        t.year = 1970; // unsynced RTC
    }
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 5000);

    assert!(!app.is_watering_active());
}

#[test]
fn rest_day_blocks_watering() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let mut clock = MockClock::at(8, 30);
    if let Some(t) = clock.now.as_mut() {
        t.weekday = 0; // default rest day
    }
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 5000);

    assert!(!app.is_watering_active());
}

#[test]
fn dead_probe_degrades_without_crashing() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = 0.0;
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 5000);

    // Percent clamps to 100 for 0-count reads, which blocks watering;
    // the raw fallback alone does not force it.  Verify the system made
    // a decision from the fallback snapshot without crashing.
    assert_eq!(app.latest_readings().soil_valid_samples, 0);
}

// ── Manual commands ───────────────────────────────────────────

#[test]
fn manual_watering_starts_and_stops() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let clock = MockClock::new(); // manual watering needs no wall clock
    let mut sink = CaptureSink::new();

    app.handle_command(AppCommand::WaterNow, &mut hw, &clock, &mut sink);
    assert!(app.is_watering_active());
    assert!(hw.pump_on());
    assert_eq!(app.last_watered_day(), None, "no clock, no day latch");

    // Second WaterNow while active is a no-op.
    app.handle_command(AppCommand::WaterNow, &mut hw, &clock, &mut sink);
    assert_eq!(sink.count_watering_started(), 1);

    app.handle_command(AppCommand::StopWatering, &mut hw, &clock, &mut sink);
    assert!(!app.is_watering_active());
    assert!(!hw.pump_on());
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::WateringStopped(StopReason::Manual))));
}

#[test]
fn manual_watering_with_clock_latches_day() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::at(14, 0);
    let mut sink = CaptureSink::new();

    app.handle_command(AppCommand::WaterNow, &mut hw, &clock, &mut sink);
    assert_eq!(app.last_watered_day(), Some(15));

    // The latch also blocks the scheduled run later the same day.
    let mut hw2 = MockHardware::new();
    hw2.soil_raw = RAW_40_PCT;
    let in_window = MockClock::at(8, 30);
    app.handle_command(AppCommand::StopWatering, &mut hw, &clock, &mut sink);
    run(&mut app, &mut hw2, &mut net, &in_window, &mut sink, 0, 5000);
    assert_eq!(sink.count_watering_started(), 1);
}

#[test]
fn refresh_command_schedules_an_early_cycle() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_40_PCT;
    let mut net = MockNetwork::new();
    let mut clock = MockClock::new();
    let mut sink = CaptureSink::new();

    // Complete the boot-time cycle.
    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 1000);
    let first_reads = hw.soil_reads;
    assert!(first_reads > 0);

    // Next scheduled refresh would be at ~61 s; request one now.
    clock.uptime_ms = 2000;
    app.handle_command(AppCommand::RefreshSensors, &mut hw, &clock, &mut sink);
    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 2000, 3000);
    assert!(hw.soil_reads > first_reads);
}

#[test]
fn set_relay_command_switches_and_reports() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    app.handle_command(
        AppCommand::SetRelay { index: 3, on: true },
        &mut hw,
        &clock,
        &mut sink,
    );
    assert!(hw.relays[3]);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::RelayChanged { index: 3, on: true })));
}

#[test]
fn telemetry_reflects_watering_and_relays() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    app.handle_command(AppCommand::WaterNow, &mut hw, &clock, &mut sink);
    let t = app.build_telemetry(&hw, 0);
    assert!(t.watering_active);
    assert_eq!(t.watering_remaining_secs, 60);
    assert!(t.relays[usize::from(RELAY_PUMP)]);
    assert!(!t.hotspot_active);
}

#[test]
fn telemetry_is_emitted_periodically() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    // Default interval is 60 s; run 130 s of ticks at 1 s steps.
    let mut t = 0;
    while t <= 130_000 {
        app.tick(t, &mut hw, &mut net, &clock, &mut sink);
        t += 1000;
    }
    let telemetry_count = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Telemetry(_)))
        .count();
    assert_eq!(telemetry_count, 2);
}

// ── Config updates ────────────────────────────────────────────

#[test]
fn runtime_config_update_applies_new_threshold() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = RAW_80_PCT; // 80 % moisture
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 0, 2000);
    assert!(!app.is_watering_active(), "80 % > default 50 % threshold");

    let mut cfg = app.current_config();
    cfg.moisture_threshold_pct = 90.0;
    app.handle_command(AppCommand::UpdateConfig(cfg), &mut hw, &clock, &mut sink);

    run(&mut app, &mut hw, &mut net, &clock, &mut sink, 2100, 4000);
    assert!(app.is_watering_active(), "80 % <= new 90 % threshold");
}
