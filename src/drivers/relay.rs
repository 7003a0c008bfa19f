//! Single relay channel driver.
//!
//! Owns one GPIO output and the polarity mapping from logical on/off to
//! the electrical level.  Safety contract: construction and every
//! reconfiguration (pin change, polarity change) immediately force the
//! pin to a known level, so a relay can never float energised through a
//! config edit.  A negative pin number is a valid no-op sink: state
//! tracking works but nothing is driven.

use log::info;

use crate::drivers::hw_init;

pub struct Relay {
    pin: i32,
    name: &'static str,
    on: bool,
    active_high: bool,
    /// Last electrical level written, for host-side assertions.
    last_level: Option<bool>,
}

impl Relay {
    /// Configure the pin as an output and force it to the inactive level.
    pub fn new(pin: i32, name: &'static str, active_high: bool) -> Self {
        let mut relay = Self {
            pin,
            name,
            on: false,
            active_high,
            last_level: None,
        };
        if pin >= 0 {
            if let Err(e) = hw_init::gpio_configure_output(pin) {
                log::warn!("relay {name}: pin {pin} config failed: {e}");
            }
        }
        relay.write_level();
        relay
    }

    /// Move the channel to another pin.  The old pin is left at its last
    /// level; the new pin starts forced inactive.
    pub fn set_pin(&mut self, pin: i32) {
        if pin == self.pin {
            return;
        }
        self.pin = pin;
        self.on = false;
        self.last_level = None;
        if pin >= 0 {
            if let Err(e) = hw_init::gpio_configure_output(pin) {
                log::warn!("relay {}: pin {pin} config failed: {e}", self.name);
            }
        }
        self.write_level();
    }

    /// Flip the electrical polarity, re-asserting the current logical
    /// state so the load does not glitch through the change.
    pub fn set_active_high(&mut self, active_high: bool) {
        if active_high == self.active_high {
            return;
        }
        self.active_high = active_high;
        self.write_level();
    }

    pub fn turn_on(&mut self) {
        // The no-op sink never changes logical state either.
        if self.pin < 0 || self.on {
            return;
        }
        self.on = true;
        self.write_level();
        info!("relay {}: ON", self.name);
    }

    pub fn turn_off(&mut self) {
        if self.pin < 0 || !self.on {
            return;
        }
        self.on = false;
        self.write_level();
        info!("relay {}: OFF", self.name);
    }

    pub fn set(&mut self, on: bool) {
        if on {
            self.turn_on();
        } else {
            self.turn_off();
        }
    }

    pub fn toggle(&mut self) {
        self.set(!self.on);
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last level written to the pin; `None` for the no-op sink.
    pub fn last_level(&self) -> Option<bool> {
        self.last_level
    }

    fn write_level(&mut self) {
        if self.pin < 0 {
            return;
        }
        let level = self.on == self.active_high;
        hw_init::gpio_write(self.pin, level);
        self.last_level = Some(level);
    }
}
