//! Audio mixing engine: ramped N×M gain matrix.
//!
//! Every output channel is the sum of every input channel weighted by the
//! gain of the `(input, output)` connection. Gains only ever move toward 0 or
//! 1, each through its own [`Ramp`], with separate fade-in and fade-out times.
//!
//! # Block processing
//!
//! 1. zero one accumulation buffer per output;
//! 2. for every `(input, output)` pair, advance the ramp by the block length
//!    and accumulate `input * gain` into the output's accumulation buffer;
//! 3. copy the accumulation buffers into the host's output buffers.
//!
//! Step 3 only happens after every input has been read. Hosts that reuse
//! buffer slots may hand the same memory in as an input and an output, and
//! writing an output early would corrupt the other mixes that still need that
//! input. [`MixEngine::process_slots`] relies on this ordering.
//!
//! # Real-time safety
//!
//! Accumulation buffers are allocated up front for the configured maximum
//! block size; [`process`](MixEngine::process) never allocates. Blocks longer
//! than the maximum are mixed in consecutive sub-blocks.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::buffer::BufferPool;
use crate::ramp::Ramp;

/// Fade time used until the host configures one, in milliseconds.
///
/// A fresh engine already fades every toggle. Hosts that want gains to jump
/// set a fade of 0.
pub const DEFAULT_FADE_MS: f32 = 10.0;

/// Converts a duration in milliseconds to a whole number of samples.
///
/// Negative and non-finite durations map to 0 samples. Fractional samples are
/// truncated.
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> u32 {
    if !ms.is_finite() || !sample_rate.is_finite() || ms <= 0.0 || sample_rate <= 0.0 {
        return 0;
    }
    libm::floorf(ms * sample_rate / 1000.0) as u32
}

/// Ramped-gain mixing matrix with `inputs × outputs` connections.
///
/// # Example
///
/// ```rust
/// use crossbar_core::MixEngine;
///
/// let mut engine = MixEngine::new(2, 1, 48000.0, 64);
/// engine.set_fade_ms(0.0);
/// engine.set_connection_gain(0, 0, true);
/// engine.set_connection_gain(1, 0, true);
///
/// let a = [0.25; 64];
/// let b = [0.5; 64];
/// let mut out = [0.0; 64];
/// engine.process(&[&a, &b], &mut [&mut out]);
/// assert!(out.iter().all(|&s| s == 0.75));
/// ```
#[derive(Debug, Clone)]
pub struct MixEngine {
    inputs: usize,
    outputs: usize,
    /// One ramp per connection, grouped by output: `output * inputs + input`.
    ramps: Vec<Ramp>,
    /// Per-output accumulation buffers, `max_block` samples each.
    accum: Vec<Vec<f32>>,
    /// Ramp output for the connection being mixed.
    gains: Vec<f32>,
    max_block: usize,
    sample_rate: f32,
    fade_in_ms: f32,
    fade_out_ms: f32,
    fade_in_samples: u32,
    fade_out_samples: u32,
}

impl MixEngine {
    /// Creates an engine with every connection silent.
    ///
    /// # Arguments
    /// * `inputs` - Number of input ports
    /// * `outputs` - Number of output ports
    /// * `sample_rate` - Sample rate in Hz, used to convert fade times
    /// * `max_block` - Largest block mixed in one pass (at least 1)
    pub fn new(inputs: usize, outputs: usize, sample_rate: f32, max_block: usize) -> Self {
        let max_block = max_block.max(1);
        let mut engine = Self {
            inputs,
            outputs,
            ramps: vec![Ramp::default(); inputs * outputs],
            accum: vec![vec![0.0; max_block]; outputs],
            gains: vec![0.0; max_block],
            max_block,
            sample_rate,
            fade_in_ms: DEFAULT_FADE_MS,
            fade_out_ms: DEFAULT_FADE_MS,
            fade_in_samples: 0,
            fade_out_samples: 0,
        };
        engine.update_fade_samples();
        engine
    }

    /// Number of input ports.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of output ports.
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Largest block mixed in a single pass.
    pub fn max_block_size(&self) -> usize {
        self.max_block
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Fade-in time in milliseconds.
    pub fn fade_in_ms(&self) -> f32 {
        self.fade_in_ms
    }

    /// Fade-out time in milliseconds.
    pub fn fade_out_ms(&self) -> f32 {
        self.fade_out_ms
    }

    /// Fade-in time in samples at the current sample rate.
    pub fn fade_in_samples(&self) -> u32 {
        self.fade_in_samples
    }

    /// Fade-out time in samples at the current sample rate.
    pub fn fade_out_samples(&self) -> u32 {
        self.fade_out_samples
    }

    /// Fades connection `(input, output)` in or out.
    ///
    /// Out-of-range ports are ignored. A connection that is mid-fade starts
    /// the new fade from its current gain.
    pub fn set_connection_gain(&mut self, input: usize, output: usize, active: bool) {
        let Some(idx) = self.ramp_index(input, output) else {
            return;
        };
        if active {
            self.ramps[idx].ramp(1.0, self.fade_in_samples);
        } else {
            self.ramps[idx].ramp(0.0, self.fade_out_samples);
        }
    }

    /// Current gain of `(input, output)`, or `None` if out of range.
    pub fn gain(&self, input: usize, output: usize) -> Option<f32> {
        self.ramp_index(input, output).map(|idx| self.ramps[idx].value())
    }

    /// Target gain of `(input, output)`, or `None` if out of range.
    pub fn target_gain(&self, input: usize, output: usize) -> Option<f32> {
        self.ramp_index(input, output)
            .map(|idx| self.ramps[idx].target())
    }

    /// True once no connection is mid-fade.
    pub fn is_settled(&self) -> bool {
        self.ramps.iter().all(Ramp::is_settled)
    }

    /// Sets the fade-in time. Running fades keep their length.
    pub fn set_fade_in_ms(&mut self, ms: f32) {
        self.fade_in_ms = sanitize_ms(ms);
        self.update_fade_samples();
    }

    /// Sets the fade-out time. Running fades keep their length.
    pub fn set_fade_out_ms(&mut self, ms: f32) {
        self.fade_out_ms = sanitize_ms(ms);
        self.update_fade_samples();
    }

    /// Sets both fade times.
    pub fn set_fade_ms(&mut self, ms: f32) {
        self.fade_in_ms = sanitize_ms(ms);
        self.fade_out_ms = self.fade_in_ms;
        self.update_fade_samples();
    }

    /// Updates the sample rate used to convert fade times.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_fade_samples();
    }

    /// Re-sizes the accumulation buffers for a new maximum block size.
    ///
    /// Allocates; call between blocks, never from the audio callback.
    pub fn set_max_block_size(&mut self, max_block: usize) {
        let max_block = max_block.max(1);
        for buf in &mut self.accum {
            buf.resize(max_block, 0.0);
        }
        self.gains.resize(max_block, 0.0);
        self.max_block = max_block;
    }

    /// Silences every connection immediately, without fading.
    pub fn reset(&mut self) {
        for ramp in &mut self.ramps {
            ramp.set_immediate(0.0);
        }
    }

    /// Mixes one block from borrowed input slices into output slices.
    ///
    /// The block length is the shortest output slice. Missing inputs, and
    /// samples past the end of a short input, count as silence. Outputs
    /// beyond the engine's port count are left untouched.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let frames = outputs.iter().map(|o| o.len()).min().unwrap_or(0);

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(self.max_block);
            self.accumulate(len, |i| {
                inputs.get(i).map(|s| s.get(offset..).unwrap_or(&[]))
            });
            for (acc, out) in self.accum.iter().zip(outputs.iter_mut()) {
                out[offset..offset + len].copy_from_slice(&acc[..len]);
            }
            offset += len;
        }
    }

    /// Mixes one block between slots of a host buffer pool.
    ///
    /// `input_slots[i]` names the slot read for input `i`, `output_slots[o]`
    /// the slot written for output `o`. The same slot may appear on both
    /// sides. Unknown slots read as silence and are skipped on write. At most
    /// `pool.block_size()` frames are processed.
    pub fn process_slots(
        &mut self,
        pool: &mut BufferPool,
        input_slots: &[usize],
        output_slots: &[usize],
        frames: usize,
    ) {
        let frames = frames.min(pool.block_size());

        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(self.max_block);
            {
                let pool: &BufferPool = pool;
                self.accumulate(len, |i| {
                    input_slots
                        .get(i)
                        .and_then(|&slot| pool.slot(slot))
                        .map(|s| &s[offset..])
                });
            }
            for (acc, &slot) in self.accum.iter().zip(output_slots) {
                if let Some(out) = pool.slot_mut(slot) {
                    out[offset..offset + len].copy_from_slice(&acc[..len]);
                }
            }
            offset += len;
        }
    }

    /// Steps 1 and 2 for `len <= max_block` frames. Every ramp advances by
    /// exactly `len` samples whether or not its input is present.
    fn accumulate<'a, F>(&mut self, len: usize, input: F)
    where
        F: Fn(usize) -> Option<&'a [f32]>,
    {
        let inputs = self.inputs;
        let gains = &mut self.gains[..len];

        for (o, acc) in self.accum.iter_mut().enumerate() {
            let acc = &mut acc[..len];
            acc.fill(0.0);

            let ramps = &mut self.ramps[o * inputs..(o + 1) * inputs];
            for (i, ramp) in ramps.iter_mut().enumerate() {
                if ramp.is_silent() {
                    continue;
                }
                ramp.process(gains);

                let Some(src) = input(i) else {
                    continue;
                };
                for ((dst, &x), &g) in acc.iter_mut().zip(src.iter()).zip(gains.iter()) {
                    *dst += x * g;
                }
            }
        }
    }

    #[inline]
    fn ramp_index(&self, input: usize, output: usize) -> Option<usize> {
        (input < self.inputs && output < self.outputs).then(|| output * self.inputs + input)
    }

    fn update_fade_samples(&mut self) {
        self.fade_in_samples = ms_to_samples(self.fade_in_ms, self.sample_rate);
        self.fade_out_samples = ms_to_samples(self.fade_out_ms, self.sample_rate);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "mix_fades: in {} samples, out {} samples at {} Hz",
            self.fade_in_samples,
            self.fade_out_samples,
            self.sample_rate
        );
    }
}

fn sanitize_ms(ms: f32) -> f32 {
    if ms.is_finite() { ms.max(0.0) } else { 0.0 }
}
