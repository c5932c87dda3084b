pub mod aggregator;
pub mod audio_file;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod error;
pub mod labels;
pub mod loudness;
pub mod pipeline;
pub mod sample_buffer;
pub mod scorer;
pub mod telemetry;
pub mod window_scheduler;

pub use aggregator::RankedLabel;
pub use capture::{CaptureSource, MicCapture};
pub use classifier::SoundClassifier;
pub use config::PipelineConfig;
pub use decision::DecisionEngine;
pub use labels::LabelTable;
pub use pipeline::Pipeline;
pub use sample_buffer::SampleBuffer;
pub use scorer::{Acceleration, OnnxScorer, Scorer};
pub use telemetry::{LogTelemetry, TelemetrySink, TimingSample};
pub use window_scheduler::{Window, WindowScheduler};

use std::time::SystemTime;

// Pipeline constants - window geometry must match the model's expected input
pub const SAMPLE_RATE: u32 = 16000;
pub const WINDOW_SIZE: usize = 15600; // 0.975s at 16kHz
pub const STRIDE: usize = 7800; // 50% overlap
pub const TOP_K: usize = 3;
pub const MINIMUM_DISPLAY_THRESHOLD: f32 = 0.03;
pub const LABEL_TRIGGER_THRESHOLD: f32 = 0.3;
pub const LOUDNESS_THRESHOLD_DB: f64 = 10.0;
pub const CLASSIFICATION_INTERVAL_MS: u64 = 500;
pub const LOUDNESS_PROBE_SAMPLES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Siren,
    Horn,
    Loud,
    None,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Siren => "siren",
            AlertKind::Horn => "horn",
            AlertKind::Loud => "loud",
            AlertKind::None => "none",
        }
    }
}

/// One decision-cycle outcome. At most one is produced per cycle and it is
/// handed to the alert callback immediately, never queued.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub label: Option<String>,
    pub score: Option<f32>,
    pub timestamp: SystemTime,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, label: Option<String>, score: Option<f32>) -> Self {
        Self {
            kind,
            label,
            score,
            timestamp: SystemTime::now(),
        }
    }

    pub fn none() -> Self {
        Self::new(AlertKind::None, None, None)
    }

    pub fn is_alert(&self) -> bool {
        self.kind != AlertKind::None
    }
}

pub type Result<T> = anyhow::Result<T>;
