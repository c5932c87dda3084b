use std::time::Instant;

use log::debug;

use crate::aggregator::{self, RankedLabel};
use crate::error::{ConfigError, ScoreError};
use crate::labels::LabelTable;
use crate::scorer::Scorer;
use crate::telemetry::TimingSample;
use crate::window_scheduler::Window;

/// Windowed-inference front end over an opaque scorer.
///
/// Construction validates the model/label contract; after that every score
/// vector is index-aligned with the label table by invariant.
pub struct SoundClassifier {
    scorer: Box<dyn Scorer>,
    labels: LabelTable,
    window_size: usize,
    stride: usize,
    top_k: usize,
    timing: TimingSample,
}

impl SoundClassifier {
    pub fn new(
        scorer: Box<dyn Scorer>,
        labels: LabelTable,
        window_size: usize,
        stride: usize,
        top_k: usize,
    ) -> Result<Self, ConfigError> {
        if scorer.vocabulary_size() != labels.len() {
            return Err(ConfigError::VocabularyMismatch {
                vocabulary: scorer.vocabulary_size(),
                labels: labels.len(),
            });
        }
        Ok(Self {
            scorer,
            labels,
            window_size,
            stride,
            top_k,
            timing: TimingSample::default(),
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Phase durations of the most recent classification.
    pub fn timing(&self) -> TimingSample {
        self.timing
    }

    /// Normalize and score one window, passing the raw score vector through.
    pub fn score_window(&mut self, samples: &[f32]) -> Result<Vec<f32>, ScoreError> {
        let prep_start = Instant::now();
        // Attenuate-only normalization: divide by the peak only when it
        // exceeds unity. Quiet audio is never amplified.
        let peak = samples.iter().fold(0.0f32, |max, &s| max.max(s.abs()));
        let normalized: Option<Vec<f32>> = if peak > 1.0 {
            Some(samples.iter().map(|&s| s / peak).collect())
        } else {
            None
        };
        self.timing.preprocessing_nanos += prep_start.elapsed().as_nanos();

        let infer_start = Instant::now();
        let scores = self
            .scorer
            .score(normalized.as_deref().unwrap_or(samples))?;
        self.timing.inference_nanos += infer_start.elapsed().as_nanos();

        Ok(scores)
    }

    /// Single-window mode: score one window and rank it directly.
    pub fn classify_window(&mut self, samples: &[f32]) -> Result<Vec<RankedLabel>, ScoreError> {
        self.timing = TimingSample::default();
        let scores = self.score_window(samples)?;
        Ok(self.rank(&scores))
    }

    /// Multi-window mode: score every window of one cycle, average the
    /// score vectors element-wise and rank the mean. An empty cycle yields
    /// an empty ranking, not an error.
    pub fn classify_windows(&mut self, windows: &[Window]) -> Result<Vec<RankedLabel>, ScoreError> {
        self.timing = TimingSample::default();

        let mut vectors = Vec::with_capacity(windows.len());
        for window in windows {
            vectors.push(self.score_window(&window.samples)?);
        }

        let ranked = match aggregator::mean_scores(&vectors) {
            Some(mean) => self.rank(&mean),
            None => Vec::new(),
        };
        debug!("classified {} windows -> {:?}", windows.len(), ranked);
        Ok(ranked)
    }

    /// Sliding-window inference over a whole in-memory recording, as the
    /// file mode uses. Reproduces the streaming scheduler's windowing.
    pub fn classify_slice(&mut self, audio: &[f32]) -> Result<Vec<RankedLabel>, ScoreError> {
        let mut windows = Vec::new();
        let mut start = 0;
        while start + self.window_size <= audio.len() {
            windows.push(Window {
                start,
                samples: audio[start..start + self.window_size].to_vec(),
            });
            start += self.stride;
        }
        self.classify_windows(&windows)
    }

    // Map top-K indices to labels, timing the mapping step.
    fn rank(&mut self, scores: &[f32]) -> Vec<RankedLabel> {
        let post_start = Instant::now();
        let ranked = aggregator::top_k_indices(scores, self.top_k)
            .into_iter()
            .map(|idx| RankedLabel {
                label: self
                    .labels
                    .get(idx)
                    .expect("top-k index within vocabulary")
                    .to_string(),
                score: scores[idx],
            })
            .collect();
        self.timing.postprocessing_nanos += post_start.elapsed().as_nanos();
        ranked
    }
}
