//! Watering decision logic and run-time tracking.
//!
//! [`WateringScheduler`] owns two pieces of state: whether the pump run is
//! active (with its deadline) and which day of the month last got water.
//! It decides, it does not actuate — callers switch the pump relay after
//! asking, so the decision layer stays testable without hardware.
//!
//! ## Decision gates
//!
//! [`should_water`](WateringScheduler::should_water) evaluates these in
//! order, short-circuiting on the first refusal:
//!
//! 1. automatic watering enabled
//! 2. not already watered this day of the month
//! 3. not the configured rest weekday
//! 4. not in the night blackout (22:00 .. 06:59)
//! 5. inside the configured daily window (inclusive on both ends)
//! 6. soil moisture at or below the threshold

use log::info;

use crate::config::IrrigationConfig;

/// Wall-clock time as reported by the system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub year: u16,
    pub month: u8,
    /// Day of month, 1..=31.
    pub day: u8,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LocalTime {
    pub fn minute_of_day(&self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    /// An unsynchronised RTC reports an epoch-era year; treat it as no time.
    pub fn is_plausible(&self) -> bool {
        self.year >= 2023
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WateringState {
    Idle,
    Active { started_ms: u64, duration_ms: u64 },
}

/// Decides when to water and tracks the active pump run.
#[derive(Debug)]
pub struct WateringScheduler {
    state: WateringState,
    /// Day of month last watered; clears only by rolling to a new day.
    last_watered_day: Option<u8>,
}

impl Default for WateringScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl WateringScheduler {
    pub fn new() -> Self {
        Self {
            state: WateringState::Idle,
            last_watered_day: None,
        }
    }

    /// Whether an automatic run should begin now.  Pure, no state change.
    pub fn should_water(
        &self,
        now: &LocalTime,
        moisture_percent: f32,
        cfg: &IrrigationConfig,
    ) -> bool {
        if !cfg.watering_enabled {
            return false;
        }
        if self.last_watered_day == Some(now.day) {
            return false;
        }
        if now.weekday == cfg.rest_weekday {
            return false;
        }
        if now.hour >= 22 || now.hour < 7 {
            return false;
        }

        let start = u16::from(cfg.start_hour) * 60 + u16::from(cfg.start_minute);
        let end = u16::from(cfg.end_hour) * 60 + u16::from(cfg.end_minute);
        let now_m = now.minute_of_day();
        // An inverted window (end before start) never matches.
        if !(start <= now_m && now_m <= end) {
            return false;
        }

        if moisture_percent > cfg.moisture_threshold_pct {
            return false;
        }

        true
    }

    /// Begin a run.  Records the watered day *before* the caller actuates
    /// the pump, so a crash mid-start cannot double-water the same day.
    /// `day_of_month` is `None` when the clock is invalid; the day latch
    /// is then left untouched.  Returns false if already active.
    pub fn start(&mut self, day_of_month: Option<u8>, now_ms: u64, duration_secs: u16) -> bool {
        if matches!(self.state, WateringState::Active { .. }) {
            return false;
        }
        if let Some(day) = day_of_month {
            self.last_watered_day = Some(day);
        }
        self.state = WateringState::Active {
            started_ms: now_ms,
            duration_ms: u64::from(duration_secs) * 1000,
        };
        info!("watering: run started ({duration_secs}s)");
        true
    }

    /// End the run early.  Returns false if nothing was active.
    pub fn stop(&mut self) -> bool {
        if self.state == WateringState::Idle {
            return false;
        }
        self.state = WateringState::Idle;
        info!("watering: run stopped");
        true
    }

    /// Transition to idle once the run duration has elapsed.  Returns true
    /// on the tick the deadline passes; the caller must drop the pump.
    pub fn check_elapsed(&mut self, now_ms: u64) -> bool {
        if let WateringState::Active {
            started_ms,
            duration_ms,
        } = self.state
        {
            if now_ms.saturating_sub(started_ms) >= duration_ms {
                self.state = WateringState::Idle;
                return true;
            }
        }
        false
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, WateringState::Active { .. })
    }

    /// Seconds left in the current run, rounded up.  Zero when idle.
    pub fn remaining_secs(&self, now_ms: u64) -> u32 {
        match self.state {
            WateringState::Idle => 0,
            WateringState::Active {
                started_ms,
                duration_ms,
            } => {
                let left = duration_ms.saturating_sub(now_ms.saturating_sub(started_ms));
                (left.div_ceil(1000)) as u32
            }
        }
    }

    pub fn last_watered_day(&self) -> Option<u8> {
        self.last_watered_day
    }
}
