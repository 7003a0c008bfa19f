//! Access-point session lifecycle.
//!
//! The device is headless: a touch on the wake pad raises a Wi-Fi hotspot
//! plus a catch-all name resolver so a phone can find the configuration
//! endpoint.  The session shuts itself down after a period with no client
//! activity, unless setup mode pins it open (first boot, or an operator
//! explicitly re-entering provisioning).
//!
//! All transitions are idempotent; the control loop may call them every
//! tick without bouncing the radio.

use log::{info, warn};

use crate::app::ports::NetworkPort;
use crate::config::DEFAULT_DEVICE_NAME;

/// Tracks whether the hotspot is up and when it was last used.
#[derive(Debug)]
pub struct HotspotSession {
    active: bool,
    /// While set, the inactivity timeout is suppressed entirely.
    setup_mode: bool,
    last_activity_ms: u64,
    timeout_ms: u64,
}

impl HotspotSession {
    pub fn new(timeout_secs: u32) -> Self {
        Self {
            active: false,
            setup_mode: false,
            last_activity_ms: 0,
            timeout_ms: u64::from(timeout_secs) * 1000,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn in_setup_mode(&self) -> bool {
        self.setup_mode
    }

    pub fn set_timeout_secs(&mut self, timeout_secs: u32) {
        self.timeout_ms = u64::from(timeout_secs) * 1000;
    }

    /// Bring the access point and name resolver up.  No-op while already
    /// active.  Returns whether the session is up afterwards.
    pub fn start_session(
        &mut self,
        net: &mut impl NetworkPort,
        ssid: &str,
        password: &str,
        now_ms: u64,
    ) -> bool {
        if self.active {
            return true;
        }

        let ssid = if ssid.is_empty() {
            DEFAULT_DEVICE_NAME
        } else {
            ssid
        };
        if !net.start_access_point(ssid, password) {
            warn!("hotspot: access point failed to start");
            return false;
        }

        let ip = net.ap_ip();
        net.start_dns_responder(ip);
        self.active = true;
        self.last_activity_ms = now_ms;
        info!(
            "hotspot: session up, ssid={ssid} ip={}.{}.{}.{}",
            ip[0], ip[1], ip[2], ip[3]
        );
        true
    }

    /// Tear the session down.  No-op while inactive.
    pub fn stop_session(&mut self, net: &mut impl NetworkPort) {
        if !self.active {
            return;
        }
        net.stop_dns_responder();
        net.stop_access_point();
        self.active = false;
        info!("hotspot: session down");
    }

    /// Record client activity, deferring the inactivity timeout.
    pub fn note_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    /// Stop the session if it has been idle past the timeout.  Returns
    /// true on the tick the timeout fires.  Setup mode never times out.
    pub fn check_timeout(&mut self, net: &mut impl NetworkPort, now_ms: u64) -> bool {
        if !self.active || self.setup_mode {
            return false;
        }
        if now_ms.saturating_sub(self.last_activity_ms) <= self.timeout_ms {
            return false;
        }
        info!("hotspot: inactivity timeout");
        self.stop_session(net);
        true
    }

    /// Enter or leave setup mode.  Entering resets the network stack
    /// first so a half-configured radio cannot wedge provisioning; the
    /// caller is expected to start a fresh session afterwards.
    pub fn set_setup_mode(&mut self, net: &mut impl NetworkPort, enabled: bool) {
        if enabled && !self.setup_mode {
            net.reset();
            self.active = false;
        }
        self.setup_mode = enabled;
    }

    /// Service the name resolver.  Only meaningful while the session is up.
    pub fn process_dns(&mut self, net: &mut impl NetworkPort) {
        if self.active {
            net.process_dns();
        }
    }
}
