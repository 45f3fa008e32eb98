//! Offline rendering of a multichannel WAV file through the matrix.
//!
//! Channel `i` of the input file feeds external input `i`; channel `o` of the
//! output file is external output `o`. Relays are modelled as delay lines of
//! one block: whatever the matrix sends to relay column `r` at frame `t` is
//! what relay row `r` plays into the matrix at frame `t + block_size`.
//!
//! A pass is one block, cut short wherever a timestamped script event falls,
//! so events apply at their exact sample. The relay delay lines hold exactly
//! one block of samples, so the delay stays fixed however passes are cut.

use anyhow::Context;
use clap::Args;
use crossbar_core::{BufferPool, Router, Topology};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::PathBuf;

use super::common::RouterSource;
use crate::script::{ScriptEvent, parse_script};
use crate::wav::{read_channels, write_channels};

#[derive(Args)]
pub struct RenderArgs {
    /// Input WAV file, one channel per external input
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file, one channel per external output
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    source: RouterSource,

    /// Event script with optional `@<seconds>` timestamps
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Extra seconds rendered after the input ends
    #[arg(long, default_value = "0")]
    tail: f64,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

/// Slot layout of the render pool: relay returns, relay sends, inputs, then
/// outputs.
struct SlotMap {
    input_slots: Vec<usize>,
    output_slots: Vec<usize>,
    first_send: usize,
    first_input: usize,
    first_output: usize,
    count: usize,
}

impl SlotMap {
    fn new(topology: Topology) -> Self {
        let first_send = topology.relays;
        let first_input = first_send + topology.relays;
        let first_output = first_input + topology.inputs;
        let count = first_output + topology.outputs;
        Self {
            input_slots: (0..first_send).chain(first_input..first_output).collect(),
            output_slots: (first_send..first_input).chain(first_output..count).collect(),
            first_send,
            first_input,
            first_output,
            count,
        }
    }
}

/// Fixed-length delay line carrying one relay's signal between passes.
struct RelayLine {
    samples: VecDeque<f32>,
}

impl RelayLine {
    fn new(delay: usize) -> Self {
        Self {
            samples: std::iter::repeat_n(0.0, delay).collect(),
        }
    }

    /// Moves the oldest `out.len()` samples into `out`.
    fn pop_into(&mut self, out: &mut [f32]) {
        let n = out.len();
        for (dst, src) in out.iter_mut().zip(self.samples.drain(..n)) {
            *dst = src;
        }
    }

    fn push(&mut self, block: &[f32]) {
        self.samples.extend(block);
    }
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        matches!(args.bit_depth, 16 | 24 | 32),
        "unsupported bit depth {} (expected 16, 24, or 32)",
        args.bit_depth
    );
    let (config, mut router) = args.source.build()?;
    let topology = router.topology();

    let (input, sample_rate) = read_channels(&args.input)?;
    if sample_rate != config.audio.sample_rate {
        tracing::info!(
            file = sample_rate,
            config = config.audio.sample_rate,
            "using the input file's sample rate"
        );
    }
    anyhow::ensure!(
        topology.outputs > 0,
        "{topology} has no outputs to render"
    );
    router.set_sample_rate(sample_rate as f32);
    if input.len() != topology.inputs {
        tracing::warn!(
            channels = input.len(),
            inputs = topology.inputs,
            "channel count differs from input count; missing inputs are silent"
        );
    }

    let events = match &args.script {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_script(&text)
        }
        None => Vec::new(),
    };

    let input_frames = input.first().map_or(0, Vec::len);
    let tail = (args.tail.max(0.0) * f64::from(sample_rate)) as usize;
    let total = input_frames + tail;
    println!(
        "Rendering {} frames at {} Hz through {}",
        total, sample_rate, topology
    );

    let output = render(&mut router, &input, &events, total, sample_rate, config.audio.block_size)?;

    write_channels(&args.output, &output, sample_rate, args.bit_depth)?;
    println!("Wrote {} channel(s) to {}", output.len(), args.output.display());
    Ok(())
}

/// Mixes `total` frames, applying events at their scheduled samples.
fn render(
    router: &mut Router,
    input: &[Vec<f32>],
    events: &[ScriptEvent],
    total: usize,
    sample_rate: u32,
    block_size: usize,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let topology = router.topology();
    let slots = SlotMap::new(topology);
    let block_size = block_size.max(1);
    let mut pool = BufferPool::new(slots.count, block_size);
    let mut output = vec![vec![0.0f32; total]; topology.outputs];
    let mut relay_lines: Vec<RelayLine> =
        (0..topology.relays).map(|_| RelayLine::new(block_size)).collect();

    let mut pending = events
        .iter()
        .map(|e| (to_frame(e.at.unwrap_or(0.0), sample_rate), e))
        .peekable();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut pos = 0;
    while pos < total {
        while let Some((_, e)) = pending.next_if(|(frame, _)| *frame <= pos) {
            router.handle(&e.event, &mut |r| {
                tracing::debug!(line = e.line, "{r}");
            });
        }

        let next_event = pending.peek().map_or(total, |(frame, _)| *frame);
        let len = block_size.min(total - pos).min(next_event - pos);

        for (k, slot) in (slots.first_input..slots.first_output).enumerate() {
            let dst = pool.slot_mut(slot).context("input slot")?;
            let src = input.get(k).map_or(&[][..], |ch| ch.get(pos..).unwrap_or(&[]));
            let n = src.len().min(len);
            dst[..n].copy_from_slice(&src[..n]);
            dst[n..len].fill(0.0);
        }

        for (relay, line) in relay_lines.iter_mut().enumerate() {
            line.pop_into(&mut pool.slot_mut(relay).context("relay slot")?[..len]);
        }

        router.process_slots(&mut pool, &slots.input_slots, &slots.output_slots, len);

        for (relay, line) in relay_lines.iter_mut().enumerate() {
            line.push(&pool.slot(slots.first_send + relay).context("relay slot")?[..len]);
        }

        for (o, ch) in output.iter_mut().enumerate() {
            let src = pool.slot(slots.first_output + o).context("output slot")?;
            ch[pos..pos + len].copy_from_slice(&src[..len]);
        }

        pos += len;
        pb.set_position(pos as u64);
    }

    // Events scheduled at or past the end still change the final state
    for (_, e) in pending {
        router.handle(&e.event, &mut |_| {});
    }

    pb.finish_and_clear();
    Ok(output)
}

fn to_frame(seconds: f64, sample_rate: u32) -> usize {
    (seconds * f64::from(sample_rate)).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(relays: usize, inputs: usize, outputs: usize) -> Router {
        let mut router = Router::new(Topology::new(relays, inputs, outputs), 1000.0, 16);
        router.set_fade_ms(0.0);
        router
    }

    #[test]
    fn slot_layout() {
        let map = SlotMap::new(Topology::new(2, 1, 3));
        assert_eq!(map.input_slots, vec![0, 1, 4]);
        assert_eq!(map.output_slots, vec![2, 3, 5, 6, 7]);
        assert_eq!(map.count, 8);
    }

    #[test]
    fn events_apply_at_their_sample() {
        let mut r = router(0, 1, 1);
        let events = parse_script("@0.005 0 0 1\n@0.010 0 0 0\n");
        let out = render(&mut r, &[vec![1.0; 20]], &events, 20, 1000, 16).unwrap();
        let expected: Vec<f32> = (0..20)
            .map(|n| if (5..10).contains(&n) { 1.0 } else { 0.0 })
            .collect();
        assert_eq!(out[0], expected);
    }

    #[test]
    fn relay_adds_one_block_of_delay() {
        // input → relay 0 → output
        let mut r = router(1, 1, 1);
        let events = parse_script("1 0 1\n0 1 1\n");
        let mut input = vec![0.0; 12];
        input[0] = 1.0;
        let out = render(&mut r, &[input], &events, 12, 1000, 4).unwrap();
        assert_eq!(out[0][4], 1.0);
        assert_eq!(out[0].iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn relay_delay_survives_short_passes() {
        // the fade event cuts the second pass down to one frame
        let mut r = router(1, 1, 1);
        let events = parse_script("1 0 1\n0 1 1\n@0.005 fade 0\n");
        let mut input = vec![0.0; 16];
        input[3] = 1.0;
        let out = render(&mut r, &[input], &events, 16, 1000, 4).unwrap();
        assert_eq!(out[0][7], 1.0, "out = {:?}", out[0]);
        assert_eq!(out[0].iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn relay_chain_delays_once_per_relay() {
        // input → relay 0 → relay 1 → output
        let mut r = router(2, 1, 1);
        let events = parse_script("2 0 1\n0 1 1\n1 2 1\n");
        let mut input = vec![0.0; 12];
        input[1] = 1.0;
        let out = render(&mut r, &[input], &events, 12, 1000, 3).unwrap();
        assert_eq!(out[0][7], 1.0, "out = {:?}", out[0]);
        assert_eq!(out[0].iter().filter(|&&s| s != 0.0).count(), 1);
    }

    #[test]
    fn tail_past_input_is_silence_in() {
        let mut r = router(0, 1, 1);
        let events = parse_script("0 0 1");
        let out = render(&mut r, &[vec![0.5; 3]], &events, 8, 1000, 4).unwrap();
        assert_eq!(out[0], vec![0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
