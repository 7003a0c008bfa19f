//! Capacitive touch wake pad.
//!
//! The ESP32 touch peripheral reports a count that *drops* when the pad
//! is touched, so a reading below the configured threshold means contact.
//! [`TouchTrigger`] turns the raw level into debounced edge events for
//! the control loop.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

/// Untouched pads idle well above any sane threshold.
#[cfg(not(target_os = "espidf"))]
static SIM_TOUCH_LEVEL: AtomicU16 = AtomicU16::new(100);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_touch_level(level: u16) {
    SIM_TOUCH_LEVEL.store(level, Ordering::Relaxed);
}

/// Minimum spacing between two trigger events.
pub const DEBOUNCE_MS: u64 = 500;

pub struct TouchSensor {
    _channel: u32,
}

impl TouchSensor {
    pub fn new(channel: u32) -> Self {
        Self { _channel: channel }
    }

    #[cfg(target_os = "espidf")]
    pub fn read_level(&mut self) -> u16 {
        crate::drivers::hw_init::touch_read(self._channel)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_level(&mut self) -> u16 {
        SIM_TOUCH_LEVEL.load(Ordering::Relaxed)
    }
}

/// Debounced touch detection over raw pad levels.
#[derive(Debug)]
pub struct TouchTrigger {
    threshold: u16,
    last_fire_ms: Option<u64>,
}

impl TouchTrigger {
    pub fn new(threshold: u16) -> Self {
        Self {
            threshold,
            last_fire_ms: None,
        }
    }

    pub fn set_threshold(&mut self, threshold: u16) {
        self.threshold = threshold;
    }

    /// Evaluate one reading.  Returns true when the pad is touched and
    /// the debounce interval since the previous event has passed.
    pub fn tick(&mut self, level: u16, now_ms: u64) -> bool {
        if level >= self.threshold {
            return false;
        }
        if let Some(last) = self.last_fire_ms {
            if now_ms.saturating_sub(last) < DEBOUNCE_MS {
                return false;
            }
        }
        self.last_fire_ms = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_below_threshold() {
        let mut t = TouchTrigger::new(40);
        assert!(!t.tick(40, 0));
        assert!(!t.tick(100, 0));
        assert!(t.tick(39, 0));
    }

    #[test]
    fn debounces_repeated_contact() {
        let mut t = TouchTrigger::new(40);
        assert!(t.tick(10, 1000));
        // Pad still held: no new event until the debounce expires.
        assert!(!t.tick(10, 1200));
        assert!(!t.tick(10, 1499));
        assert!(t.tick(10, 1500));
    }

    #[test]
    fn release_does_not_reset_debounce() {
        let mut t = TouchTrigger::new(40);
        assert!(t.tick(10, 0));
        assert!(!t.tick(100, 200));
        assert!(!t.tick(10, 400));
        assert!(t.tick(10, 600));
    }

    #[test]
    fn zero_reading_counts_as_touch() {
        // A failed pad read comes back as 0 and must still debounce.
        let mut t = TouchTrigger::new(40);
        assert!(t.tick(0, 0));
        assert!(!t.tick(0, 100));
    }
}
