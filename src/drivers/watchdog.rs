//! Task Watchdog Timer (TWDT) wrapper.
//!
//! A wedged control loop must not leave the pump energised indefinitely;
//! the TWDT panics (and so reboots) the device if the loop stalls for
//! more than the timeout.  The loop calls `feed()` once per tick.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the current task.
    pub fn new() -> Self {
        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms: 10_000,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("TWDT reconfigure returned {ret} (may already be configured)");
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    log::info!("watchdog: subscribed (10s timeout, panic on trigger)");
                } else {
                    log::warn!("watchdog: failed to subscribe ({ret})");
                }

                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("watchdog(sim): no-op");
            Self {}
        }
    }

    /// Must be called at least every 10 seconds.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
