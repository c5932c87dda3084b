use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use log::{error, info, warn};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

use crate::error::CaptureError;

// Ring buffer retention between cycle reads, in seconds of audio.
const RING_SECONDS: usize = 8;

/// Pull-based capture boundary: the pipeline drains whatever the device
/// buffered since the previous cycle. Implementations own the device
/// handle and release it on drop.
pub trait CaptureSource {
    fn read(&mut self) -> Result<Vec<i16>, CaptureError>;
}

/// Microphone capture via cpal, downmixed to mono 16-bit at the pipeline
/// sample rate. The device callback pushes into a ring buffer; `read`
/// drains the consumer side once per cycle.
pub struct MicCapture {
    _stream: Stream,
    consumer: HeapConsumer<i16>,
    failed: Arc<AtomicBool>,
}

impl MicCapture {
    pub fn new(target_sample_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        info!(
            "using input device: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        let sample_format = config.sample_format();
        let config: StreamConfig = config.into();

        let ring = HeapRb::<i16>::new(target_sample_rate as usize * RING_SECONDS);
        let (producer, consumer) = ring.split();
        let producer = Arc::new(Mutex::new(producer));
        let failed = Arc::new(AtomicBool::new(false));

        let stream = Self::build_input_stream(
            &device,
            &config,
            sample_format,
            target_sample_rate,
            producer,
            failed.clone(),
        )?;
        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        info!("started audio capture stream");

        Ok(Self {
            _stream: stream,
            consumer,
            failed,
        })
    }

    fn build_input_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        target_sample_rate: u32,
        producer: Arc<Mutex<HeapProducer<i16>>>,
        failed: Arc<AtomicBool>,
    ) -> Result<Stream, CaptureError> {
        let channels = config.channels as usize;
        let source_rate = config.sample_rate.0;
        let err_flag = failed.clone();
        let err_fn = move |err| {
            error!("audio stream error: {}", err);
            err_flag.store(true, Ordering::Relaxed);
        };

        let stream = match sample_format {
            SampleFormat::F32 => device
                .build_input_stream(
                    config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        Self::ingest(data, channels, source_rate, target_sample_rate, &producer);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| CaptureError::Stream(e.to_string()))?,
            SampleFormat::I16 => device
                .build_input_stream(
                    config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let floats: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        Self::ingest(&floats, channels, source_rate, target_sample_rate, &producer);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| CaptureError::Stream(e.to_string()))?,
            SampleFormat::U16 => device
                .build_input_stream(
                    config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        let floats: Vec<f32> = data
                            .iter()
                            .map(|&s| (s as f32 - 32768.0) / 32768.0)
                            .collect();
                        Self::ingest(&floats, channels, source_rate, target_sample_rate, &producer);
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| CaptureError::Stream(e.to_string()))?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        };

        Ok(stream)
    }

    // Device callback path: downmix to mono, resample to the pipeline
    // rate, convert to i16 and push. A full ring drops the remainder.
    fn ingest(
        data: &[f32],
        channels: usize,
        source_rate: u32,
        target_rate: u32,
        producer: &Arc<Mutex<HeapProducer<i16>>>,
    ) {
        let mono: Vec<f32> = if channels == 1 {
            data.to_vec()
        } else {
            data.chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        let resampled = if source_rate != target_rate {
            resample_nearest(&mono, source_rate, target_rate)
        } else {
            mono
        };

        if let Ok(mut producer) = producer.lock() {
            for &sample in &resampled {
                let quantized = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                if producer.push(quantized).is_err() {
                    warn!("capture ring buffer full, dropping samples");
                    break;
                }
            }
        }
    }
}

impl CaptureSource for MicCapture {
    fn read(&mut self) -> Result<Vec<i16>, CaptureError> {
        if self.failed.load(Ordering::Relaxed) {
            return Err(CaptureError::Disconnected);
        }
        let mut samples = Vec::with_capacity(self.consumer.len());
        while let Some(sample) = self.consumer.pop() {
            samples.push(sample);
        }
        Ok(samples)
    }
}

fn resample_nearest(data: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f32 / from_rate as f32;
    let new_length = (data.len() as f32 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_length);

    for i in 0..new_length {
        let src_index = (i as f32 / ratio).floor() as usize;
        if src_index < data.len() {
            resampled.push(data[src_index]);
        }
    }

    resampled
}
