//! WAV file input/output for the CLI

use std::path::Path;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use voxring_core::Sample;

/// Mono audio loaded from disk
pub struct MonoClip {
    pub samples: Vec<Sample>,
    pub sample_rate: u32,
}

impl MonoClip {
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate.max(1))
    }
}

/// Read a WAV file, downmixing to mono f32
pub fn read_mono(path: &Path) -> Result<MonoClip> {
    let reader =
        WavReader::open(path).with_context(|| format!("Failed to open WAV file {:?}", path))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        bail!("WAV file {:?} has no channels", path);
    }

    let interleaved: Vec<Sample> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("Failed to decode {:?}", path))?,
        SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .with_context(|| format!("Failed to decode {:?}", path))?
        }
    };

    let channels = usize::from(spec.channels);
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<Sample>() / channels as Sample)
            .collect()
    };

    log::debug!(
        "Loaded {:?}: {} Hz, {} channel(s), {} mono samples",
        path,
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(MonoClip {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Write mono f32 samples as a 32-bit float WAV
pub fn write_mono(path: &Path, samples: &[Sample], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {:?}", path))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {:?}", path))?;
    Ok(())
}
