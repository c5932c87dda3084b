use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::decision::DecisionEngine;
use crate::scorer::Acceleration;
use crate::{
    CLASSIFICATION_INTERVAL_MS, LABEL_TRIGGER_THRESHOLD, LOUDNESS_THRESHOLD_DB,
    MINIMUM_DISPLAY_THRESHOLD, STRIDE, TOP_K, WINDOW_SIZE,
};

/// Pipeline tuning knobs. Defaults match the model's expected window
/// geometry; override via a JSON file when experimenting.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub stride: usize,
    pub top_k: usize,
    pub minimum_display_threshold: f32,
    pub label_trigger_threshold: f32,
    pub loudness_threshold_db: f64,
    pub classification_interval_ms: u64,
    pub acceleration: Acceleration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            stride: STRIDE,
            top_k: TOP_K,
            minimum_display_threshold: MINIMUM_DISPLAY_THRESHOLD,
            label_trigger_threshold: LABEL_TRIGGER_THRESHOLD,
            loudness_threshold_db: LOUDNESS_THRESHOLD_DB,
            classification_interval_ms: CLASSIFICATION_INTERVAL_MS,
            acceleration: Acceleration::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.classification_interval_ms)
    }

    pub fn decision_engine(&self) -> DecisionEngine {
        DecisionEngine {
            loudness_threshold_db: self.loudness_threshold_db,
            minimum_display_threshold: self.minimum_display_threshold,
            label_trigger_threshold: self.label_trigger_threshold,
        }
    }
}
