//! Resistive soil moisture probe.
//!
//! Reads the probe voltage through an ESP32 ADC1 channel and maps it to a
//! moisture percentage via a two-point linear calibration.  Drier soil
//! reads a *higher* ADC value, so the mapping inverts: the wet bound maps
//! to 100 % and the dry bound to 0 %.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH0 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(not(target_os = "espidf"))]
static SIM_SOIL_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_soil_adc(raw: u16) {
    SIM_SOIL_ADC.store(raw, Ordering::Relaxed);
}

/// Two-point linear calibration for the soil probe.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationCurve {
    /// ADC reading in bone-dry soil (0 %).
    pub dry_raw: u16,
    /// ADC reading in saturated soil (100 %).
    pub wet_raw: u16,
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        Self {
            dry_raw: 2350,
            wet_raw: 815,
        }
    }
}

impl CalibrationCurve {
    /// Map a raw ADC value to a moisture percentage, clamped to [0, 100].
    pub fn percent(&self, raw: f32) -> f32 {
        let dry = f32::from(self.dry_raw);
        let wet = f32::from(self.wet_raw);
        let span = dry - wet;
        if span <= 0.0 {
            return 0.0;
        }
        (100.0 * (dry - raw) / span).clamp(0.0, 100.0)
    }
}

/// Adjust a moisture percentage for probe temperature drift.
/// The probe is calibrated at 25 °C; resistance shifts roughly 0.3 %/°C.
pub fn temperature_compensation(percent: f32, temperature_c: f32) -> f32 {
    const FACTOR_PCT_PER_C: f32 = 0.3;
    const REFERENCE_C: f32 = 25.0;
    (percent + (temperature_c - REFERENCE_C) * FACTOR_PCT_PER_C).clamp(0.0, 100.0)
}

pub struct SoilMoistureSensor {
    _adc_gpio: i32,
}

impl SoilMoistureSensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self {
            _adc_gpio: adc_gpio,
        }
    }

    /// One raw ADC sample.  The probe must already be powered.
    #[cfg(target_os = "espidf")]
    pub fn read_raw(&mut self) -> f32 {
        f32::from(crate::drivers::hw_init::adc1_read(
            crate::pins::ADC1_CH_SOIL,
        ))
    }

    /// One raw ADC sample.  The probe must already be powered.
    #[cfg(not(target_os = "espidf"))]
    pub fn read_raw(&mut self) -> f32 {
        f32::from(SIM_SOIL_ADC.load(Ordering::Relaxed))
    }
}
