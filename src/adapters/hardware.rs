//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the relay bank, the soil probe, the BME280, and the touch pad,
//! exposing them through [`SensorPort`] and [`ActuatorPort`].  This is
//! the only module besides `hw_init` that touches actual hardware.  On
//! non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs.

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::hw_init;
use crate::drivers::relay::Relay;
use crate::drivers::touch::TouchSensor;
use crate::pins;
use crate::sensors::bme280::Bme280;
use crate::sensors::soil::SoilMoistureSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    relays: [Relay; 4],
    soil: SoilMoistureSensor,
    bme: Bme280,
    touch: TouchSensor,
}

impl HardwareAdapter {
    /// Build every driver on its board pin.  Relays come up forced off.
    pub fn new(relay_active_high: bool) -> Self {
        let relays = core::array::from_fn(|i| {
            Relay::new(pins::RELAY_GPIOS[i], pins::RELAY_NAMES[i], relay_active_high)
        });
        Self {
            relays,
            soil: SoilMoistureSensor::new(pins::SOIL_ADC_GPIO),
            bme: Bme280::new(pins::BME280_I2C_ADDR),
            touch: TouchSensor::new(pins::TOUCH_CHANNEL),
        }
    }

    /// Probe the environmental sensor.  A missing BME280 degrades to
    /// invalid readings, not a boot failure.
    pub fn init_sensors(&mut self) -> bool {
        self.bme.init()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_soil_raw(&mut self) -> f32 {
        self.soil.read_raw()
    }

    fn read_temperature_c(&mut self) -> f32 {
        self.bme.read().temperature_c
    }

    fn read_humidity_pct(&mut self) -> f32 {
        self.bme.read().humidity_pct
    }

    fn read_pressure_hpa(&mut self) -> f32 {
        self.bme.read().pressure_hpa
    }

    fn read_touch_level(&mut self) -> u16 {
        self.touch.read_level()
    }

    fn power_soil_probe(&mut self, on: bool) {
        hw_init::gpio_write(pins::SOIL_POWER_GPIO, on);
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_relay(&mut self, index: u8, on: bool) {
        if let Some(relay) = self.relays.get_mut(usize::from(index)) {
            relay.set(on);
        }
    }

    fn relay_state(&self, index: u8) -> bool {
        self.relays
            .get(usize::from(index))
            .is_some_and(Relay::is_on)
    }

    fn all_off(&mut self) {
        for relay in &mut self.relays {
            relay.turn_off();
        }
    }
}
