//! GPIO / peripheral pin assignments for the SoilWarden main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Soil moisture probe (resistive, ADC1)
// ---------------------------------------------------------------------------

/// Analog input for the soil moisture probe (ADC1 channel 0, GPIO 36).
pub const SOIL_ADC_GPIO: i32 = 36;
/// ADC1 channel number matching [`SOIL_ADC_GPIO`].
pub const ADC1_CH_SOIL: u32 = 0;
/// Digital output powering the soil probe.  Driven HIGH only while a
/// sampling cycle runs — continuous power corrodes the electrodes.
pub const SOIL_POWER_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Capacitive touch input (hotspot wake)
// ---------------------------------------------------------------------------

/// Touch pad input (TOUCH0 on GPIO 4).  Reading drops below the threshold
/// when touched.
pub const TOUCH_GPIO: i32 = 4;
/// Touch pad channel matching [`TOUCH_GPIO`].
pub const TOUCH_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// I²C bus (BME280 environmental sensor)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// BME280 I²C address (SDO low).
pub const BME280_I2C_ADDR: u8 = 0x76;

// ---------------------------------------------------------------------------
// Relay bank (active-high driver board)
// ---------------------------------------------------------------------------

/// Relay output pins, indexed 0–3.
pub const RELAY_GPIOS: [i32; 4] = [25, 26, 32, 33];

/// Human-readable relay labels, same indexing as [`RELAY_GPIOS`].
pub const RELAY_NAMES: [&str; 4] = ["Aux", "Pump 1", "Pump 2", "Sensor"];

/// Relay index driving the irrigation pump.
pub const RELAY_PUMP: u8 = 1;
