//! System clock adapter.
//!
//! Implements [`ClockPort`] over the ESP-IDF time APIs:
//!
//! - **`target_os = "espidf"`** — wall clock from `gettimeofday` +
//!   `localtime_r` (set externally, e.g. by the provisioning endpoint),
//!   monotonic uptime from `esp_timer_get_time()`.
//! - **all other targets** — uptime from `std::time::Instant`; wall
//!   clock injectable for tests, `None` by default (unset RTC).

use crate::app::ports::ClockPort;
use crate::scheduler::LocalTime;

pub struct SystemClockAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    sim_now: std::cell::Cell<Option<LocalTime>>,
}

impl Default for SystemClockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClockAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            sim_now: std::cell::Cell::new(None),
        }
    }

    /// Inject a wall-clock time for host-side tests.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_now(&self, now: Option<LocalTime>) {
        self.sim_now.set(now);
    }
}

impl ClockPort for SystemClockAdapter {
    #[cfg(target_os = "espidf")]
    fn now(&self) -> Option<LocalTime> {
        use esp_idf_svc::sys::{gettimeofday, localtime_r, time_t, timeval, tm};

        let mut tv = timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: plain POSIX call writing into a stack-local timeval.
        if unsafe { gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (before 2023-01-01).
        const EPOCH_2023: i64 = 1_672_531_200;
        if i64::from(tv.tv_sec) < EPOCH_2023 {
            return None;
        }

        let secs = tv.tv_sec as time_t;
        // SAFETY: localtime_r writes into a stack-local tm, no globals.
        let mut broken: tm = unsafe { core::mem::zeroed() };
        if unsafe { localtime_r(&secs, &mut broken) }.is_null() {
            return None;
        }

        Some(LocalTime {
            year: (broken.tm_year + 1900).clamp(0, i32::from(u16::MAX)) as u16,
            month: (broken.tm_mon + 1) as u8,
            day: broken.tm_mday as u8,
            weekday: broken.tm_wday as u8,
            hour: broken.tm_hour as u8,
            minute: broken.tm_min as u8,
            second: broken.tm_sec as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn now(&self) -> Option<LocalTime> {
        self.sim_now.get()
    }

    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn unset_clock_reports_none() {
        let clock = SystemClockAdapter::new();
        assert!(clock.now().is_none());
    }

    #[test]
    fn injected_time_reads_back() {
        let clock = SystemClockAdapter::new();
        let t = LocalTime {
            year: 2026,
            month: 8,
            day: 30,
            weekday: 0,
            hour: 8,
            minute: 15,
            second: 0,
        };
        clock.sim_set_now(Some(t));
        assert_eq!(clock.now(), Some(t));
    }

    #[test]
    fn uptime_is_monotonic() {
        let clock = SystemClockAdapter::new();
        let a = clock.uptime_ms();
        let b = clock.uptime_ms();
        assert!(b >= a);
    }
}
