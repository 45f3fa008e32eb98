//! Multichannel WAV file I/O using hound.
//!
//! The router addresses every channel separately, so channels are kept apart
//! instead of being mixed down: reads return one buffer per channel and
//! writes interleave one buffer per channel.

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// Reads a WAV file into one `f32` buffer per channel, plus its sample rate.
pub fn read_channels(path: &Path) -> anyhow::Result<(Vec<Vec<f32>>, u32)> {
    let reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let frames = interleaved.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (ch, &sample) in out.iter_mut().zip(frame) {
            ch.push(sample);
        }
    }
    Ok((out, spec.sample_rate))
}

/// Writes one buffer per channel as an interleaved WAV file.
///
/// `bits_per_sample` of 32 writes IEEE float; 16 and 24 write integer PCM
/// with clamping. Channels shorter than the longest one are padded with
/// silence.
pub fn write_channels(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
    bits_per_sample: u16,
) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: u16::try_from(channels.len()).context("too many output channels")?,
        sample_rate,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;

    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let max_val = (1i64 << (bits_per_sample - 1)) as f32;
    for n in 0..frames {
        for ch in channels {
            let sample = ch.get(n).copied().unwrap_or(0.0);
            if bits_per_sample == 32 {
                writer.write_sample(sample)?;
            } else {
                let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}
