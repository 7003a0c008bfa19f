//! Hotspot session flow through the full control loop: touch wake,
//! client activity, inactivity timeout, and setup mode.

use soilwarden::app::events::{AppEvent, SessionEnd};
use soilwarden::app::service::AppService;
use soilwarden::config::IrrigationConfig;

use crate::mock_hw::{CaptureSink, MockClock, MockHardware, MockNetwork};

const TIMEOUT_MS: u64 = 900_000; // default 15 min

fn service() -> AppService {
    AppService::new(IrrigationConfig::default())
}

#[test]
fn touch_brings_the_hotspot_up() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    assert!(!app.is_hotspot_active(), "idle pad must not start a session");

    hw.touch_level = 10; // below the default threshold of 40
    app.tick(100, &mut hw, &mut net, &clock, &mut sink);

    assert!(app.is_hotspot_active());
    assert!(net.ap_active);
    assert!(net.dns_active);
    assert!(sink.has_hotspot_started());
    assert_eq!(net.last_ssid, "SoilWarden");
}

#[test]
fn held_pad_does_not_restart_the_session() {
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.touch_level = 10;
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    // Pad held for two seconds of ticks; debounce fires every 500 ms
    // but the session start stays idempotent.
    let mut t = 0;
    while t <= 2000 {
        app.tick(t, &mut hw, &mut net, &clock, &mut sink);
        t += 100;
    }
    assert_eq!(net.ap_starts, 1);
    assert_eq!(
        sink.events
            .iter()
            .filter(|e| matches!(e, AppEvent::HotspotStarted))
            .count(),
        1
    );
}

#[test]
fn session_times_out_after_inactivity() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    hw.touch_level = 10;
    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    assert!(app.is_hotspot_active());
    hw.touch_level = 100; // release

    // Exactly the timeout is still within the session window.
    app.tick(TIMEOUT_MS, &mut hw, &mut net, &clock, &mut sink);
    assert!(app.is_hotspot_active());

    app.tick(TIMEOUT_MS + 1, &mut hw, &mut net, &clock, &mut sink);
    assert!(!app.is_hotspot_active());
    assert!(!net.ap_active);
    assert!(!net.dns_active);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::HotspotStopped(SessionEnd::InactivityTimeout))));
}

#[test]
fn client_activity_defers_the_timeout() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    hw.touch_level = 10;
    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    hw.touch_level = 100;

    // A configuration client polls halfway through the window.
    app.note_activity(TIMEOUT_MS / 2);

    app.tick(TIMEOUT_MS, &mut hw, &mut net, &clock, &mut sink);
    assert!(app.is_hotspot_active());

    app.tick(TIMEOUT_MS / 2 + TIMEOUT_MS + 1, &mut hw, &mut net, &clock, &mut sink);
    assert!(!app.is_hotspot_active());
}

#[test]
fn setup_mode_pins_the_session_open() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    app.set_setup_mode(&mut net, true);
    assert_eq!(net.resets, 1, "entering setup must reset the stack first");
    assert!(app.start_hotspot(&mut net, 0, &mut sink));

    // Days of inactivity: the session stays up.
    app.tick(86_400_000, &mut hw, &mut net, &clock, &mut sink);
    assert!(app.is_hotspot_active());

    // Leaving setup mode re-arms the timeout.
    app.set_setup_mode(&mut net, false);
    app.tick(86_400_000 + TIMEOUT_MS, &mut hw, &mut net, &clock, &mut sink);
    assert!(!app.is_hotspot_active());
}

#[test]
fn failed_ap_start_is_retried_on_next_touch() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    net.fail_ap_start = true;
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    hw.touch_level = 10;
    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    assert!(!app.is_hotspot_active());
    assert!(!sink.has_hotspot_started());

    // Radio recovers; debounced re-touch succeeds.
    net.fail_ap_start = false;
    app.tick(600, &mut hw, &mut net, &clock, &mut sink);
    assert!(app.is_hotspot_active());
    assert!(sink.has_hotspot_started());
}

#[test]
fn dns_is_serviced_only_while_the_session_is_up() {
    let mut app = service();
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::new();
    let clock = MockClock::new();
    let mut sink = CaptureSink::new();

    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    assert_eq!(net.dns_ticks, 0);

    hw.touch_level = 10;
    app.tick(100, &mut hw, &mut net, &clock, &mut sink);
    hw.touch_level = 100;
    let after_start = net.dns_ticks;

    app.tick(200, &mut hw, &mut net, &clock, &mut sink);
    app.tick(300, &mut hw, &mut net, &clock, &mut sink);
    assert_eq!(net.dns_ticks, after_start + 2);

    // Stop the session; no further servicing.
    app.stop_hotspot(&mut net, &mut sink);
    app.tick(400, &mut hw, &mut net, &clock, &mut sink);
    assert_eq!(net.dns_ticks, after_start + 2);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::HotspotStopped(SessionEnd::Manual))));
}

#[test]
fn watering_continues_while_hotspot_is_up() {
    // The single loop must service both subsystems in the same ticks.
    let mut app = service();
    let mut hw = MockHardware::new();
    hw.soil_raw = 1736.0; // ~40 %
    let mut net = MockNetwork::new();
    let clock = MockClock::at(8, 30);
    let mut sink = CaptureSink::new();

    hw.touch_level = 10;
    app.tick(0, &mut hw, &mut net, &clock, &mut sink);
    hw.touch_level = 100;

    let mut t = 100;
    while t <= 2000 {
        app.tick(t, &mut hw, &mut net, &clock, &mut sink);
        t += 100;
    }

    assert!(app.is_hotspot_active());
    assert!(app.is_watering_active());
    assert!(hw.pump_on());
}
