//! NVS (Non-Volatile Storage) configuration adapter.
//!
//! Implements [`ConfigPort`] over an ESP-IDF NVS blob (postcard encoded)
//! with an in-memory map on host targets.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Legacy migration: devices upgraded from the Arduino firmware carry
//!   their old JSON config under a separate key; it is consumed once on
//!   the first load after the upgrade.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::IrrigationConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "soilwarden";
const CONFIG_KEY: &str = "irrcfg";
/// JSON blob imported from the pre-rewrite firmware's filesystem.
const LEGACY_KEY: &str = "legacy";

#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create the adapter and initialise NVS flash.
    ///
    /// On first boot or after a partition version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    /// Preload a raw blob, e.g. a legacy JSON config, for tests.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_insert(&self, key: &str, bytes: Vec<u8>) {
        self.store.borrow_mut().insert(key.to_string(), bytes);
    }

    fn read_blob(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .get(key)
                .cloned()
                .ok_or(ConfigError::NotFound)
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let len = kb.len().min(15);
                key_buf[..len].copy_from_slice(&kb[..len]);

                let mut size: usize = 0;
                // First call sizes the blob.
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });
            match result {
                Ok(bytes) => Ok(bytes),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(ConfigError::NotFound),
                Err(_) => Err(ConfigError::IoError),
            }
        }
    }

    fn write_blob(&self, key: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(key.to_string(), bytes.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let mut key_buf = [0u8; 16];
                let kb = key.as_bytes();
                let len = kb.len().min(15);
                key_buf[..len].copy_from_slice(&kb[..len]);

                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsAdapter: NVS write error {}", e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    ConfigError::StorageFull
                } else {
                    ConfigError::IoError
                }
            })
        }
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

pub fn validate_config(cfg: &IrrigationConfig) -> Result<(), ConfigError> {
    if cfg.start_hour > 23 || cfg.end_hour > 23 {
        return Err(ConfigError::ValidationFailed("window hours must be 0-23"));
    }
    if cfg.start_minute > 59 || cfg.end_minute > 59 {
        return Err(ConfigError::ValidationFailed("window minutes must be 0-59"));
    }
    if !(0.0..=100.0).contains(&cfg.moisture_threshold_pct) {
        return Err(ConfigError::ValidationFailed(
            "moisture_threshold_pct must be 0-100",
        ));
    }
    if cfg.soil_dry_raw <= cfg.soil_wet_raw {
        return Err(ConfigError::ValidationFailed(
            "soil_dry_raw must exceed soil_wet_raw",
        ));
    }
    if cfg.soil_dry_raw > 4095 {
        return Err(ConfigError::ValidationFailed("soil_dry_raw must be <= 4095"));
    }
    if !(1..=50).contains(&cfg.sample_count) {
        return Err(ConfigError::ValidationFailed("sample_count must be 1-50"));
    }
    if !(10..=10_000).contains(&cfg.sample_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "sample_interval_ms must be 10-10000",
        ));
    }
    if !(5..=86_400).contains(&cfg.sensor_refresh_secs) {
        return Err(ConfigError::ValidationFailed(
            "sensor_refresh_secs must be 5-86400",
        ));
    }
    if cfg.watering_duration_secs > 3600 {
        return Err(ConfigError::ValidationFailed(
            "watering_duration_secs must be <= 3600",
        ));
    }
    if cfg.rest_weekday > 6 {
        return Err(ConfigError::ValidationFailed("rest_weekday must be 0-6"));
    }
    if cfg.pump_relay > 3 {
        return Err(ConfigError::ValidationFailed("pump_relay must be 0-3"));
    }
    if !(1..=1000).contains(&cfg.control_loop_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_loop_interval_ms must be 1-1000",
        ));
    }
    if !(30..=86_400).contains(&cfg.hotspot_timeout_secs) {
        return Err(ConfigError::ValidationFailed(
            "hotspot_timeout_secs must be 30-86400",
        ));
    }
    if !(5..=3600).contains(&cfg.telemetry_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_secs must be 5-3600",
        ));
    }
    if cfg.touch_threshold == 0 {
        return Err(ConfigError::ValidationFailed(
            "touch_threshold must be nonzero",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<IrrigationConfig, ConfigError> {
        match self.read_blob(CONFIG_KEY) {
            Ok(bytes) => {
                let cfg: IrrigationConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Err(ConfigError::NotFound) => {
                // One-time migration from the previous firmware's JSON.
                let legacy = self.read_blob(LEGACY_KEY)?;
                let text =
                    core::str::from_utf8(&legacy).map_err(|_| ConfigError::Corrupted)?;
                let cfg = IrrigationConfig::from_legacy_json(text)
                    .map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: migrated legacy JSON config");
                Ok(cfg)
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, config: &IrrigationConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.write_blob(CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
