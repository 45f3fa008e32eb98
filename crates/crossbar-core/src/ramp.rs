//! Linear ramps for click-free gain changes.
//!
//! Toggling a connection by jumping its gain from 0 to 1 produces an audible
//! click. A [`Ramp`] instead interpolates linearly from wherever it currently
//! is toward a new target over a fixed number of samples, then holds the
//! target until it is retargeted again.
//!
//! ## Usage
//!
//! ```rust
//! use crossbar_core::Ramp;
//!
//! let mut gain = Ramp::new(0.0);
//! gain.ramp(1.0, 4);
//!
//! let mut block = [0.0; 6];
//! gain.process(&mut block);
//! assert_eq!(block, [0.25, 0.5, 0.75, 1.0, 1.0, 1.0]);
//! ```
//!
//! Retargeting is interruptible: calling [`Ramp::ramp`] mid-transition starts
//! the new segment from the current value, so there is never a discontinuity.

/// A linear interpolation generator from a current value to a target.
///
/// The same primitive drives every parameter that needs smooth transitions;
/// the mixing engine keeps one per `(input, output)` pair.
#[derive(Debug, Clone)]
pub struct Ramp {
    /// Last emitted value
    current: f32,
    /// Value at the start of the running segment
    start: f32,
    /// Value the ramp settles on
    target: f32,
    /// Samples left in the running segment
    remaining: u32,
    /// Length of the running segment in samples
    total: u32,
}

impl Ramp {
    /// Create a settled ramp holding `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            start: initial,
            target: initial,
            remaining: 0,
            total: 0,
        }
    }

    /// Start a new segment toward `target` lasting `duration_samples`.
    ///
    /// The segment starts from the current value, whatever state the previous
    /// segment was in. A duration of 0 jumps to `target` immediately, so the
    /// next emitted sample is already `target`.
    pub fn ramp(&mut self, target: f32, duration_samples: u32) {
        self.target = target;
        if duration_samples == 0 {
            self.set_immediate(target);
            return;
        }
        self.start = self.current;
        self.remaining = duration_samples;
        self.total = duration_samples;
    }

    /// Jump to `value` and hold it.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.start = value;
        self.target = value;
        self.remaining = 0;
        self.total = 0;
    }

    /// Produce the next interpolated value (advances by one sample).
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                // Land exactly on the target regardless of rounding.
                self.current = self.target;
            } else {
                let progress = (self.total - self.remaining) as f32 / self.total as f32;
                let value = self.start + (self.target - self.start) * progress;
                // stay inside the segment so the final snap never reverses direction
                let (lo, hi) = if self.start <= self.target {
                    (self.start, self.target)
                } else {
                    (self.target, self.start)
                };
                self.current = value.clamp(lo, hi);
            }
        }
        self.current
    }

    /// Fill `out` with the next `out.len()` interpolated values.
    pub fn process(&mut self, out: &mut [f32]) {
        if self.remaining == 0 {
            out.fill(self.current);
            return;
        }
        for sample in out.iter_mut() {
            *sample = self.advance();
        }
    }

    /// Current value without advancing.
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Samples left before the target is reached.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// True once the running segment has finished.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }

    /// True when settled at exactly zero, i.e. the ramp contributes nothing.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.remaining == 0 && self.current == 0.0
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new(0.0)
    }
}
