//! One-shot hardware peripheral initialization.
//!
//! Configures the soil ADC channel, relay and probe-power GPIO outputs,
//! the touch pad, and the I²C master bus using raw ESP-IDF sys calls.
//! Called once from `main()` before the control loop starts.  The thin
//! read/write shims below are the only peripheral access the rest of the
//! firmware performs.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    TouchInitFailed(i32),
    I2cInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::TouchInitFailed(rc) => write!(f, "touch pad init failed (rc={})", rc),
            Self::I2cInitFailed(rc) => write!(f, "I2C master init failed (rc={})", rc),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
        init_touch()?;
        init_i2c()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// main-loop ADC read path.  No concurrent access is possible because
/// `init_adc()` completes before the control loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::ADC1_CH_SOIL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH0=soil probe)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract — single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    0
}

// ── GPIO outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let mut mask: u64 = 1 << pins::SOIL_POWER_GPIO;
    for pin in pins::RELAY_GPIOS {
        mask |= 1 << pin;
    }
    let cfg = gpio_config_t {
        pin_bit_mask: mask,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: one-shot boot configuration of output-only pins.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // Everything de-energised until a driver claims the pin.
    for pin in pins::RELAY_GPIOS {
        gpio_write(pin, false);
    }
    gpio_write(pins::SOIL_POWER_GPIO, false);

    info!("hw_init: GPIO outputs configured (relays + probe power, all low)");
    Ok(())
}

/// Reconfigure a single pin as an output at runtime (relay pin changes).
#[cfg(target_os = "espidf")]
pub fn gpio_configure_output(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: reconfigures a pin the caller owns exclusively.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_configure_output(_pin: i32) -> Result<(), HwInitError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output during init.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Touch pad ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_touch() -> Result<(), HwInitError> {
    // SAFETY: legacy ESP32 touch driver, initialised once at boot.
    unsafe {
        let ret = touch_pad_init();
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TouchInitFailed(ret));
        }
        let ret = touch_pad_config(pins::TOUCH_CHANNEL, 0);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TouchInitFailed(ret));
        }
    }
    info!("hw_init: touch pad configured (TOUCH0)");
    Ok(())
}

/// Raw touch pad counter.  Drops when the pad is touched; 0 on read error
/// (which also reads as "touched" and is debounced upstream).
#[cfg(target_os = "espidf")]
pub fn touch_read(channel: u32) -> u16 {
    let mut value: u16 = 0;
    // SAFETY: touch pad configured during init; single-threaded reads.
    let ret = unsafe { touch_pad_read(channel, &mut value) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    value
}

// ── I²C master ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const I2C_PORT: i2c_port_t = 0;
#[cfg(target_os = "espidf")]
const I2C_TIMEOUT_TICKS: u32 = 100;

#[cfg(target_os = "espidf")]
unsafe fn init_i2c() -> Result<(), HwInitError> {
    let mut cfg = i2c_config_t {
        mode: i2c_mode_t_I2C_MODE_MASTER,
        sda_io_num: pins::I2C_SDA_GPIO,
        scl_io_num: pins::I2C_SCL_GPIO,
        sda_pullup_en: true,
        scl_pullup_en: true,
        ..Default::default()
    };
    cfg.__bindgen_anon_1.master.clk_speed = 100_000;

    // SAFETY: one-shot boot configuration of the I2C0 controller.
    unsafe {
        let ret = i2c_param_config(I2C_PORT, &cfg);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::I2cInitFailed(ret));
        }
        let ret = i2c_driver_install(I2C_PORT, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::I2cInitFailed(ret));
        }
    }
    info!("hw_init: I2C0 master configured (100 kHz)");
    Ok(())
}

/// Register read: write the register index, then read `buf.len()` bytes.
#[cfg(target_os = "espidf")]
pub fn i2c_read_regs(addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), i32> {
    // SAFETY: driver installed during init; buffers live across the call.
    let ret = unsafe {
        i2c_master_write_read_device(
            I2C_PORT,
            addr,
            &reg,
            1,
            buf.as_mut_ptr(),
            buf.len(),
            I2C_TIMEOUT_TICKS,
        )
    };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

/// Single register write.
#[cfg(target_os = "espidf")]
pub fn i2c_write_reg(addr: u8, reg: u8, value: u8) -> Result<(), i32> {
    let frame = [reg, value];
    // SAFETY: driver installed during init; frame lives across the call.
    let ret = unsafe {
        i2c_master_write_to_device(I2C_PORT, addr, frame.as_ptr(), frame.len(), I2C_TIMEOUT_TICKS)
    };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}
