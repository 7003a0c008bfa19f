//! BME280 combined temperature / humidity / pressure sensor (I²C).
//!
//! Implements the Bosch datasheet register map and integer compensation
//! directly on top of the raw I²C shims in `hw_init` — no vendor library.
//! Runs the sensor in normal mode with 1× oversampling on every channel,
//! which is plenty for a 60-second acquisition cadence.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: real I²C transactions against the sensor at 0x76.
//! On host/test: readings come from atomic injection points; failures are
//! simulated by injecting NaN, which the sampling layer filters out.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use log::warn;
use log::info;

#[cfg(not(target_os = "espidf"))]
static SIM_TEMPERATURE: AtomicU32 = AtomicU32::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY: AtomicU32 = AtomicU32::new(0);
#[cfg(not(target_os = "espidf"))]
static SIM_PRESSURE: AtomicU32 = AtomicU32::new(0);

/// Inject environmental readings for host-side tests and simulation.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_environment(temperature_c: f32, humidity_pct: f32, pressure_hpa: f32) {
    SIM_TEMPERATURE.store(temperature_c.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY.store(humidity_pct.to_bits(), Ordering::Relaxed);
    SIM_PRESSURE.store(pressure_hpa.to_bits(), Ordering::Relaxed);
}

/// One full measurement.
#[derive(Debug, Clone, Copy)]
pub struct Bme280Sample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

impl Bme280Sample {
    /// Sample representing a failed read; filtered out by range checks.
    pub fn invalid() -> Self {
        Self {
            temperature_c: f32::NAN,
            humidity_pct: f32::NAN,
            pressure_hpa: f32::NAN,
        }
    }
}

// ── Register map ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod regs {
    pub const CHIP_ID: u8 = 0xD0;
    pub const CHIP_ID_VALUE: u8 = 0x60;
    pub const RESET: u8 = 0xE0;
    pub const RESET_VALUE: u8 = 0xB6;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const CALIB_TP: u8 = 0x88; // 26 bytes: T1..T3, P1..P9, H1
    pub const CALIB_H: u8 = 0xE1; // 7 bytes: H2..H6
    pub const DATA: u8 = 0xF7; // 8 bytes: press, temp, hum
}

/// Factory calibration coefficients (datasheet section 4.2.2).
#[cfg(target_os = "espidf")]
#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

pub struct Bme280 {
    addr: u8,
    ready: bool,
    #[cfg(target_os = "espidf")]
    calib: Calibration,
}

impl Bme280 {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            ready: false,
            #[cfg(target_os = "espidf")]
            calib: Calibration::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Probe, reset, and configure the sensor.  Returns false when the
    /// chip does not answer; reads then yield invalid samples.
    #[cfg(target_os = "espidf")]
    pub fn init(&mut self) -> bool {
        use crate::drivers::hw_init;

        let mut id = [0u8; 1];
        if hw_init::i2c_read_regs(self.addr, regs::CHIP_ID, &mut id).is_err()
            || id[0] != regs::CHIP_ID_VALUE
        {
            warn!("BME280: no chip at 0x{:02X} (id={:#04X})", self.addr, id[0]);
            return false;
        }

        if hw_init::i2c_write_reg(self.addr, regs::RESET, regs::RESET_VALUE).is_err() {
            warn!("BME280: reset failed");
            return false;
        }
        // Reset completes within 2 ms (datasheet t_startup).
        std::thread::sleep(std::time::Duration::from_millis(5));

        let mut tp = [0u8; 26];
        let mut h = [0u8; 7];
        if hw_init::i2c_read_regs(self.addr, regs::CALIB_TP, &mut tp).is_err()
            || hw_init::i2c_read_regs(self.addr, regs::CALIB_H, &mut h).is_err()
        {
            warn!("BME280: calibration readout failed");
            return false;
        }
        self.calib = Self::parse_calibration(&tp, &h);

        // Humidity 1x; temp 1x, pressure 1x, normal mode; 500 ms standby.
        let ok = hw_init::i2c_write_reg(self.addr, regs::CTRL_HUM, 0x01).is_ok()
            && hw_init::i2c_write_reg(self.addr, regs::CTRL_MEAS, 0b001_001_11).is_ok()
            && hw_init::i2c_write_reg(self.addr, regs::CONFIG, 0b100_000_00).is_ok();
        if !ok {
            warn!("BME280: mode configuration failed");
            return false;
        }

        self.ready = true;
        info!("BME280: initialised at 0x{:02X}", self.addr);
        true
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn init(&mut self) -> bool {
        info!("BME280(sim): initialised at 0x{:02X}", self.addr);
        self.ready = true;
        true
    }

    /// One compensated measurement.  Invalid (NaN) when the sensor is not
    /// ready or the bus transaction fails.
    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> Bme280Sample {
        use crate::drivers::hw_init;

        if !self.ready {
            return Bme280Sample::invalid();
        }

        let mut data = [0u8; 8];
        if hw_init::i2c_read_regs(self.addr, regs::DATA, &mut data).is_err() {
            return Bme280Sample::invalid();
        }

        let raw_press =
            (u32::from(data[0]) << 12) | (u32::from(data[1]) << 4) | (u32::from(data[2]) >> 4);
        let raw_temp =
            (u32::from(data[3]) << 12) | (u32::from(data[4]) << 4) | (u32::from(data[5]) >> 4);
        let raw_hum = (u32::from(data[6]) << 8) | u32::from(data[7]);

        let (t_c, t_fine) = self.compensate_temperature(raw_temp as i32);
        Bme280Sample {
            temperature_c: t_c,
            humidity_pct: self.compensate_humidity(raw_hum as i32, t_fine),
            pressure_hpa: self.compensate_pressure(raw_press as i32, t_fine),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> Bme280Sample {
        if !self.ready {
            return Bme280Sample::invalid();
        }
        Bme280Sample {
            temperature_c: f32::from_bits(SIM_TEMPERATURE.load(Ordering::Relaxed)),
            humidity_pct: f32::from_bits(SIM_HUMIDITY.load(Ordering::Relaxed)),
            pressure_hpa: f32::from_bits(SIM_PRESSURE.load(Ordering::Relaxed)),
        }
    }

    // ── Compensation (datasheet section 4.2.3, integer variant) ──

    #[cfg(target_os = "espidf")]
    fn parse_calibration(tp: &[u8; 26], h: &[u8; 7]) -> Calibration {
        let u16le = |b: &[u8], i: usize| u16::from_le_bytes([b[i], b[i + 1]]);
        let i16le = |b: &[u8], i: usize| i16::from_le_bytes([b[i], b[i + 1]]);

        Calibration {
            t1: u16le(tp, 0),
            t2: i16le(tp, 2),
            t3: i16le(tp, 4),
            p1: u16le(tp, 6),
            p2: i16le(tp, 8),
            p3: i16le(tp, 10),
            p4: i16le(tp, 12),
            p5: i16le(tp, 14),
            p6: i16le(tp, 16),
            p7: i16le(tp, 18),
            p8: i16le(tp, 20),
            p9: i16le(tp, 22),
            h1: tp[25],
            // H4/H5 share a nibble-packed register pair.
            h2: i16le(h, 0),
            h3: h[2],
            h4: (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F),
            h5: (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4),
            h6: h[6] as i8,
        }
    }

    #[cfg(target_os = "espidf")]
    fn compensate_temperature(&self, raw: i32) -> (f32, i32) {
        let c = &self.calib;
        let var1 = ((raw >> 3) - (i32::from(c.t1) << 1)) * i32::from(c.t2) >> 11;
        let var2 = (((raw >> 4) - i32::from(c.t1)) * ((raw >> 4) - i32::from(c.t1)) >> 12)
            * i32::from(c.t3)
            >> 14;
        let t_fine = var1 + var2;
        let t = (t_fine * 5 + 128) >> 8; // centi-degrees
        (t as f32 / 100.0, t_fine)
    }

    #[cfg(target_os = "espidf")]
    fn compensate_pressure(&self, raw: i32, t_fine: i32) -> f32 {
        let c = &self.calib;
        let mut var1 = i64::from(t_fine) - 128_000;
        let mut var2 = var1 * var1 * i64::from(c.p6);
        var2 += (var1 * i64::from(c.p5)) << 17;
        var2 += i64::from(c.p4) << 35;
        var1 = ((var1 * var1 * i64::from(c.p3)) >> 8) + ((var1 * i64::from(c.p2)) << 12);
        var1 = ((1_i64 << 47) + var1) * i64::from(c.p1) >> 33;
        if var1 == 0 {
            return f32::NAN; // division by zero guard from the datasheet
        }
        let mut p: i64 = 1_048_576 - i64::from(raw);
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = (i64::from(c.p9) * (p >> 13) * (p >> 13)) >> 25;
        var2 = (i64::from(c.p8) * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (i64::from(c.p7) << 4);
        // p is in Pa with 8 fractional bits; report hPa.
        (p as f32) / 256.0 / 100.0
    }

    #[cfg(target_os = "espidf")]
    fn compensate_humidity(&self, raw: i32, t_fine: i32) -> f32 {
        let c = &self.calib;
        let mut v: i32 = t_fine - 76_800;
        v = ((((raw << 14) - (i32::from(c.h4) << 20) - i32::from(c.h5) * v) + 16_384) >> 15)
            * (((((((v * i32::from(c.h6)) >> 10)
                * (((v * i32::from(c.h3)) >> 11) + 32_768))
                >> 10)
                + 2_097_152)
                * i32::from(c.h2)
                + 8192)
                >> 14);
        v -= ((((v >> 15) * (v >> 15)) >> 7) * i32::from(c.h1)) >> 4;
        let v = v.clamp(0, 419_430_400);
        // Q22.10 → %RH
        ((v >> 12) as f32) / 1024.0
    }
}
