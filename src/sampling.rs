//! Generic averaged sampler.
//!
//! One [`Sampler`] instance acquires a fixed number of readings from a
//! single channel, spaced by a minimum interval, filters them against an
//! inclusive validity range, and reports their arithmetic mean.
//!
//! The sampler is a step machine: [`Sampler::poll`] takes at most one
//! sample per call and returns immediately, so a multi-sample acquisition
//! never blocks the control loop.  Inter-sample waits happen simply by the
//! loop coming back on later ticks.

/// Per-channel acquisition parameters.
#[derive(Debug, Clone, Copy)]
pub struct SampleSpec {
    /// Number of samples to attempt (>= 1).
    pub count: u8,
    /// Minimum spacing between consecutive samples.
    pub interval_ms: u32,
    /// Inclusive lower validity bound.
    pub valid_min: f32,
    /// Inclusive upper validity bound.
    pub valid_max: f32,
    /// Mean reported when no sample is valid.
    pub fallback: f32,
}

impl SampleSpec {
    /// Whether a single reading counts toward the mean.
    /// NaN and infinite readings never do.
    pub fn is_valid(&self, value: f32) -> bool {
        value.is_finite() && value >= self.valid_min && value <= self.valid_max
    }
}

/// Result of a completed acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragedReading {
    /// Mean of the valid samples, or the spec fallback when none were valid.
    pub mean: f32,
    /// How many samples passed the validity filter.
    pub valid_count: u8,
    /// How many samples were attempted.
    pub requested: u8,
}

/// Cooperative multi-sample acquisition for one channel.
#[derive(Debug)]
pub struct Sampler {
    spec: SampleSpec,
    sum: f32,
    valid: u8,
    taken: u8,
    next_due_ms: u64,
    result: Option<AveragedReading>,
}

impl Sampler {
    /// Sampler whose first sample is due immediately.
    pub fn new(spec: SampleSpec) -> Self {
        Self::delayed(spec, 0)
    }

    /// Sampler whose first sample is due at `ready_at_ms` (models sensor
    /// power-up settling).
    pub fn delayed(spec: SampleSpec, ready_at_ms: u64) -> Self {
        Self {
            spec,
            sum: 0.0,
            valid: 0,
            taken: 0,
            next_due_ms: ready_at_ms,
            result: None,
        }
    }

    /// Advance the acquisition by at most one sample.
    ///
    /// Returns `Some` exactly once, on the call that takes the final
    /// sample.  Use [`result`](Self::result) afterwards to re-read it.
    pub fn poll(&mut self, now_ms: u64, mut read: impl FnMut() -> f32) -> Option<AveragedReading> {
        if self.result.is_some() || now_ms < self.next_due_ms {
            return None;
        }

        let value = read();
        self.taken += 1;
        if self.spec.is_valid(value) {
            self.sum += value;
            self.valid += 1;
        }

        if self.taken >= self.spec.count {
            let mean = if self.valid > 0 {
                self.sum / f32::from(self.valid)
            } else {
                self.spec.fallback
            };
            let reading = AveragedReading {
                mean,
                valid_count: self.valid,
                requested: self.taken,
            };
            self.result = Some(reading);
            return Some(reading);
        }

        self.next_due_ms = now_ms + u64::from(self.spec.interval_ms);
        None
    }

    /// Completed result, if the final sample has been taken.
    pub fn result(&self) -> Option<AveragedReading> {
        self.result
    }

    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}
