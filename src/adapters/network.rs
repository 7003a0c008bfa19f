//! Soft-AP network adapter.
//!
//! Implements [`NetworkPort`] — the hexagonal boundary for the
//! configuration hotspot.  Two halves:
//!
//! - **Access point**: ESP-IDF WiFi in AP mode via `esp_idf_svc::wifi`
//!   on device; a state-tracking stub on host targets.
//! - **Name resolver**: a catch-all DNS responder on UDP/53 answering
//!   every A query with the AP address, so any hostname a phone tries
//!   lands on the configuration endpoint.  Plain `std::net::UdpSocket`,
//!   identical on both targets.

use core::fmt;

use log::{error, info, warn};
use std::net::UdpSocket;

use crate::app::ports::NetworkPort;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    InvalidSsid,
    InvalidPassword,
    DriverFailed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::DriverFailed => write!(f, "WiFi driver call failed"),
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(()); // open network
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Catch-all DNS responder
// ───────────────────────────────────────────────────────────────

/// Queries serviced per `process()` call, bounding per-tick work.
const DNS_BATCH: usize = 4;
const DNS_TTL_SECS: u32 = 60;

/// Build a response answering the first question with a single A record.
/// Returns `None` for packets that are not plain queries.
pub fn build_dns_response(query: &[u8], ip: [u8; 4]) -> Option<Vec<u8>> {
    if query.len() < 12 {
        return None;
    }
    // QR bit must be 0 (query) and QDCOUNT at least 1.
    if query[2] & 0x80 != 0 {
        return None;
    }
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if qdcount == 0 {
        return None;
    }

    // Walk the first question's labels to find its end.
    let mut pos = 12;
    loop {
        let len = *query.get(pos)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        // Compressed names cannot appear in a question we echo back.
        if len & 0xC0 != 0 {
            return None;
        }
        pos += 1 + len;
    }
    let question_end = pos.checked_add(4)?; // QTYPE + QCLASS
    if question_end > query.len() {
        return None;
    }

    let mut resp = Vec::with_capacity(question_end + 16);
    resp.extend_from_slice(&query[0..2]); // transaction id
    resp.extend_from_slice(&[0x81, 0x80]); // standard response, no error
    resp.extend_from_slice(&[0x00, 0x01]); // QDCOUNT = 1
    resp.extend_from_slice(&[0x00, 0x01]); // ANCOUNT = 1
    resp.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // NSCOUNT, ARCOUNT
    resp.extend_from_slice(&query[12..question_end]); // echoed question

    resp.extend_from_slice(&[0xC0, 0x0C]); // pointer to question name
    resp.extend_from_slice(&[0x00, 0x01]); // TYPE A
    resp.extend_from_slice(&[0x00, 0x01]); // CLASS IN
    resp.extend_from_slice(&DNS_TTL_SECS.to_be_bytes());
    resp.extend_from_slice(&[0x00, 0x04]); // RDLENGTH
    resp.extend_from_slice(&ip);
    Some(resp)
}

struct DnsResponder {
    socket: Option<UdpSocket>,
    ip: [u8; 4],
}

impl DnsResponder {
    fn new() -> Self {
        Self {
            socket: None,
            ip: [0, 0, 0, 0],
        }
    }

    fn start(&mut self, ip: [u8; 4]) {
        if self.socket.is_some() {
            return;
        }
        self.ip = ip;
        match UdpSocket::bind("0.0.0.0:53") {
            Ok(socket) => {
                if let Err(e) = socket.set_nonblocking(true) {
                    warn!("dns: set_nonblocking failed: {e}");
                    return;
                }
                info!(
                    "dns: catch-all responder on :53 -> {}.{}.{}.{}",
                    ip[0], ip[1], ip[2], ip[3]
                );
                self.socket = Some(socket);
            }
            Err(e) => warn!("dns: bind failed: {e}"),
        }
    }

    fn stop(&mut self) {
        if self.socket.take().is_some() {
            info!("dns: responder stopped");
        }
    }

    fn process(&mut self) {
        let Some(socket) = self.socket.as_ref() else {
            return;
        };
        let mut buf = [0u8; 512];
        for _ in 0..DNS_BATCH {
            match socket.recv_from(&mut buf) {
                Ok((len, peer)) => {
                    if let Some(resp) = build_dns_response(&buf[..len], self.ip) {
                        if let Err(e) = socket.send_to(&resp, peer) {
                            warn!("dns: send failed: {e}");
                        }
                    }
                }
                // WouldBlock means the queue is drained; anything else is
                // transient and retried next tick.
                Err(_) => break,
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Soft-AP adapter
// ───────────────────────────────────────────────────────────────

/// Default address of the ESP-IDF soft-AP netif.
const AP_IP: [u8; 4] = [192, 168, 4, 1];

pub struct SoftApAdapter {
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    ap_active: bool,
    dns: DnsResponder,
}

impl SoftApAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: esp_idf_svc::wifi::EspWifi<'static>) -> Self {
        Self {
            wifi,
            ap_active: false,
            dns: DnsResponder::new(),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ap_active: false,
            dns: DnsResponder::new(),
        }
    }

    pub fn is_ap_active(&self) -> bool {
        self.ap_active
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start_ap(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, Configuration};

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        // Lengths were validated; conversion into the fixed buffers
        // cannot fail here.
        let cfg = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| NetworkError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| NetworkError::InvalidPassword)?,
            auth_method,
            channel: 1,
            max_connections: 4,
            ..Default::default()
        };

        self.wifi
            .set_configuration(&Configuration::AccessPoint(cfg))
            .map_err(|e| {
                error!("wifi: AP configuration rejected: {e}");
                NetworkError::DriverFailed
            })?;
        self.wifi.start().map_err(|e| {
            error!("wifi: AP start failed: {e}");
            NetworkError::DriverFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_ap(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        info!("wifi(sim): AP '{ssid}' up");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop_ap(&mut self) {
        if let Err(e) = self.wifi.stop() {
            warn!("wifi: AP stop failed: {e}");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop_ap(&mut self) {
        info!("wifi(sim): AP down");
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SoftApAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPort for SoftApAdapter {
    fn start_access_point(&mut self, ssid: &str, password: &str) -> bool {
        if self.ap_active {
            return true;
        }
        if let Err(e) = validate_ssid(ssid) {
            error!("wifi: {e}");
            return false;
        }
        if let Err(e) = validate_password(password) {
            error!("wifi: {e}");
            return false;
        }
        match self.platform_start_ap(ssid, password) {
            Ok(()) => {
                self.ap_active = true;
                info!("wifi: access point '{ssid}' started");
                true
            }
            Err(e) => {
                error!("wifi: {e}");
                false
            }
        }
    }

    fn stop_access_point(&mut self) {
        if !self.ap_active {
            return;
        }
        self.platform_stop_ap();
        self.ap_active = false;
        info!("wifi: access point stopped");
    }

    fn ap_ip(&self) -> [u8; 4] {
        AP_IP
    }

    fn start_dns_responder(&mut self, ip: [u8; 4]) {
        self.dns.start(ip);
    }

    fn stop_dns_responder(&mut self) {
        self.dns.stop();
    }

    fn process_dns(&mut self) {
        self.dns.process();
    }

    fn reset(&mut self) {
        self.dns.stop();
        if self.ap_active {
            self.platform_stop_ap();
            self.ap_active = false;
        }
        info!("wifi: network stack reset");
    }
}
