use std::path::Path;

use anyhow::Context;
use hound::WavReader;

use crate::Result;

/// WAV ingestion for the offline file mode: decode, downmix to mono and
/// resample to the pipeline rate, yielding float samples in [-1, 1].
pub struct WavLoader {
    target_sample_rate: u32,
}

impl WavLoader {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Vec<f32>> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path)
            .with_context(|| format!("failed to open wav {}", path.display()))?;
        let spec = reader.spec();

        let audio = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .context("failed to read float samples")?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|sample| sample as f32 / scale))
                    .collect::<std::result::Result<Vec<f32>, _>>()
                    .context("failed to read int samples")?
            }
        };

        let mut processed = audio;
        if spec.channels > 1 {
            processed = downmix(&processed, spec.channels as usize);
        }
        if spec.sample_rate != self.target_sample_rate {
            processed = resample_linear(&processed, spec.sample_rate, self.target_sample_rate);
        }
        Ok(processed)
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn resample_linear(audio: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f32 / from_rate as f32;
    let new_length = (audio.len() as f32 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_length);

    for i in 0..new_length {
        let src_index = i as f32 / ratio;
        let lo = src_index.floor() as usize;
        let hi = (lo + 1).min(audio.len().saturating_sub(1));
        let fraction = src_index - lo as f32;

        let sample = if lo < audio.len() {
            audio[lo] * (1.0 - fraction) + audio[hi] * fraction
        } else {
            0.0
        };
        resampled.push(sample);
    }

    resampled
}
