//! Sensor acquisition layer.
//!
//! Five channels are sampled per refresh cycle:
//!
//! | Channel        | Source           | Valid range      | Fallback      |
//! |----------------|------------------|------------------|---------------|
//! | soil raw       | ADC1 probe       | 1 .. 4095 counts | dry bound     |
//! | soil percent   | calibration map  | 0 .. 100 %       | 0 %           |
//! | temperature    | BME280           | -40 .. 85 °C     | 0 °C          |
//! | humidity       | BME280           | 0 .. 100 %RH     | 0 %           |
//! | pressure       | BME280           | 300 .. 1100 hPa  | 0 hPa         |
//!
//! [`AcquisitionCycle`] drives all five through the step-machine
//! [`Sampler`](crate::sampling::Sampler), so a full multi-sample refresh
//! spreads across control-loop ticks instead of blocking inside one.
//! The soil probe is powered only for the duration of a cycle, with a
//! settling delay before its first sample.

pub mod bme280;
pub mod soil;

use crate::app::ports::SensorPort;
use crate::config::IrrigationConfig;
use crate::sampling::{SampleSpec, Sampler};

use soil::CalibrationCurve;

// ── Validity ranges ───────────────────────────────────────────

/// ADC counts outside this range mean a disconnected or shorted probe.
pub const SOIL_RAW_MIN: f32 = 1.0;
pub const SOIL_RAW_MAX: f32 = 4095.0;

/// BME280 operating envelope per the datasheet.
pub const TEMPERATURE_MIN_C: f32 = -40.0;
pub const TEMPERATURE_MAX_C: f32 = 85.0;
pub const HUMIDITY_MIN_PCT: f32 = 0.0;
pub const HUMIDITY_MAX_PCT: f32 = 100.0;
pub const PRESSURE_MIN_HPA: f32 = 300.0;
pub const PRESSURE_MAX_HPA: f32 = 1100.0;

/// Soil probe power-up settling time before the first ADC sample.
pub const SOIL_SETTLE_MS: u64 = 500;

/// Snapshot of the most recent completed acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub heat_index_c: f32,
    pub soil_raw: u16,
    pub soil_percent: f32,
    /// Valid soil samples in the last cycle; 0 means the probe is suspect.
    pub soil_valid_samples: u8,
}

/// Apparent temperature from air temperature (°C) and relative humidity.
///
/// Below 26.7 °C the heat index is defined as the temperature itself.
/// Above that, the NOAA simplified equation applies, upgraded to the full
/// Rothfusz regression once humidity exceeds 40 % at 27 °C or more.
pub fn heat_index(temperature_c: f32, humidity_pct: f32) -> f32 {
    let t = temperature_c;
    let h = humidity_pct;

    if t < 26.7 {
        return t;
    }

    let mut hi = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (h * 0.094));

    if h > 40.0 && t >= 27.0 {
        hi = -42.379 + 2.04901523 * t + 10.14333127 * h
            - 0.22475541 * t * h
            - 0.00683783 * t * t
            - 0.05481717 * h * h
            + 0.00122874 * t * t * h
            + 0.00085282 * t * h * h
            - 0.00000199 * t * t * h * h;
    }

    hi
}

// ── Acquisition cycle ─────────────────────────────────────────

/// One in-flight sensor refresh: five lock-step samplers plus the soil
/// probe power lifecycle.  Create with [`begin`](Self::begin), then call
/// [`poll`](Self::poll) every control-loop tick until it yields.
pub struct AcquisitionCycle {
    calibration: CalibrationCurve,
    soil_raw: Sampler,
    soil_pct: Sampler,
    temperature: Sampler,
    humidity: Sampler,
    pressure: Sampler,
    done: bool,
}

impl AcquisitionCycle {
    /// Start a refresh: powers the soil probe and schedules the soil
    /// channels after the settling delay.  Environmental channels start
    /// immediately.
    pub fn begin(cfg: &IrrigationConfig, hw: &mut impl SensorPort, now_ms: u64) -> Self {
        hw.power_soil_probe(true);

        let calibration = CalibrationCurve {
            dry_raw: cfg.soil_dry_raw,
            wet_raw: cfg.soil_wet_raw,
        };
        let base = |min: f32, max: f32, fallback: f32| SampleSpec {
            count: cfg.sample_count.max(1),
            interval_ms: cfg.sample_interval_ms,
            valid_min: min,
            valid_max: max,
            fallback,
        };
        let soil_ready = now_ms + SOIL_SETTLE_MS;

        Self {
            calibration,
            soil_raw: Sampler::delayed(
                base(SOIL_RAW_MIN, SOIL_RAW_MAX, f32::from(cfg.soil_dry_raw)),
                soil_ready,
            ),
            soil_pct: Sampler::delayed(base(0.0, 100.0, 0.0), soil_ready),
            temperature: Sampler::new(base(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C, 0.0)),
            humidity: Sampler::new(base(HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT, 0.0)),
            pressure: Sampler::new(base(PRESSURE_MIN_HPA, PRESSURE_MAX_HPA, 0.0)),
            done: false,
        }
    }

    /// Advance every channel by at most one sample.  Returns the full
    /// snapshot on the tick the last channel completes, and powers the
    /// soil probe back down.  Returns `None` on every other tick.
    pub fn poll(&mut self, now_ms: u64, hw: &mut impl SensorPort) -> Option<Readings> {
        if self.done {
            return None;
        }

        let cal = self.calibration;
        self.soil_raw.poll(now_ms, || hw.read_soil_raw());
        self.soil_pct.poll(now_ms, || cal.percent(hw.read_soil_raw()));
        self.temperature.poll(now_ms, || hw.read_temperature_c());
        self.humidity.poll(now_ms, || hw.read_humidity_pct());
        self.pressure.poll(now_ms, || hw.read_pressure_hpa());

        let (Some(raw), Some(pct), Some(temp), Some(hum), Some(press)) = (
            self.soil_raw.result(),
            self.soil_pct.result(),
            self.temperature.result(),
            self.humidity.result(),
            self.pressure.result(),
        ) else {
            return None;
        };

        self.done = true;
        hw.power_soil_probe(false);

        Some(Readings {
            temperature_c: temp.mean,
            humidity_pct: hum.mean,
            pressure_hpa: press.mean,
            heat_index_c: heat_index(temp.mean, hum.mean),
            soil_raw: raw.mean.clamp(0.0, 4095.0) as u16,
            soil_percent: pct.mean,
            // Clamping makes percent samples nearly always in range; the
            // raw channel carries the real probe-health signal.
            soil_valid_samples: raw.valid_count,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_index_is_identity_when_cool() {
        assert_eq!(heat_index(20.0, 90.0), 20.0);
        assert_eq!(heat_index(26.69, 50.0), 26.69);
    }

    #[test]
    fn heat_index_simplified_branch() {
        // 28 °C at 30 % humidity: below the regression's humidity gate.
        let t: f32 = 28.0;
        let h: f32 = 30.0;
        let expected = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (h * 0.094));
        assert!((heat_index(t, h) - expected).abs() < 0.001);
    }

    #[test]
    fn heat_index_regression_branch() {
        let t: f32 = 30.0;
        let h: f32 = 50.0;
        let expected = -42.379 + 2.04901523 * t + 10.14333127 * h
            - 0.22475541 * t * h
            - 0.00683783 * t * t
            - 0.05481717 * h * h
            + 0.00122874 * t * t * h
            + 0.00085282 * t * h * h
            - 0.00000199 * t * t * h * h;
        assert!((heat_index(t, h) - expected).abs() < 0.001);
    }

    #[test]
    fn regression_gate_requires_both_conditions() {
        // 26.8 °C at 90 % humidity: warm enough for the simplified formula
        // but below the 27 °C regression gate.
        let t: f32 = 26.8;
        let h: f32 = 90.0;
        let expected = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (h * 0.094));
        assert!((heat_index(t, h) - expected).abs() < 0.001);
    }
}
