use ndarray::ArrayD;
use ort::{
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
    value::Value,
};

use crate::error::{ConfigError, ScoreError};

/// Inference hardware preference, replacing the original pair of global
/// classifier singletons with an explicit construction-time choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceleration {
    /// Full graph optimization with the runtime's default thread pool.
    Auto,
    /// Single-threaded CPU session.
    CpuOnly,
}

impl Default for Acceleration {
    fn default() -> Self {
        Acceleration::Auto
    }
}

/// The opaque acoustic model: a float window in, one score per vocabulary
/// entry out. The vocabulary size is fixed at load time.
pub trait Scorer: Send {
    fn vocabulary_size(&self) -> usize;

    fn score(&mut self, window: &[f32]) -> Result<Vec<f32>, ScoreError>;
}

/// ONNX-backed scorer for YAMNet-style waveform classifiers.
pub struct OnnxScorer {
    session: Session,
    window_size: usize,
    vocabulary_size: usize,
}

impl OnnxScorer {
    /// Load the model and discover its vocabulary size with a silent probe
    /// window. Any failure here is a fatal configuration error.
    pub fn load(
        model_path: &str,
        window_size: usize,
        acceleration: Acceleration,
    ) -> Result<Self, ConfigError> {
        let builder = SessionBuilder::new().map_err(|source| ConfigError::ModelLoad {
            path: model_path.to_string(),
            source,
        })?;

        let builder = match acceleration {
            Acceleration::Auto => builder.with_optimization_level(GraphOptimizationLevel::Level3),
            Acceleration::CpuOnly => builder
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .and_then(|b| b.with_intra_threads(1))
                .and_then(|b| b.with_inter_threads(1)),
        }
        .map_err(|source| ConfigError::ModelLoad {
            path: model_path.to_string(),
            source,
        })?;

        let session = builder
            .commit_from_file(model_path)
            .map_err(|source| ConfigError::ModelLoad {
                path: model_path.to_string(),
                source,
            })?;

        let mut scorer = Self {
            session,
            window_size,
            vocabulary_size: 0,
        };

        let probe = vec![0.0f32; window_size];
        let scores = scorer.run(&probe).map_err(|err| match err {
            ScoreError::Inference(source) => ConfigError::ModelLoad {
                path: model_path.to_string(),
                source,
            },
            other => ConfigError::ModelLoad {
                path: model_path.to_string(),
                source: ort::Error::new(other.to_string()),
            },
        })?;
        scorer.vocabulary_size = scores.len();

        log::info!(
            "loaded model {} (window {}, vocabulary {}, {:?})",
            model_path,
            window_size,
            scorer.vocabulary_size,
            acceleration
        );
        Ok(scorer)
    }

    fn run(&mut self, window: &[f32]) -> Result<Vec<f32>, ScoreError> {
        let shape = vec![1usize, window.len()];
        let input_tensor = Value::from_array((shape, window.to_vec()))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let array = ArrayD::from_shape_vec(dims.clone(), data.to_vec())
            .map_err(|_| ScoreError::OutputShape(dims))?;

        // Accept [vocab] or [1, vocab] outputs.
        match array.ndim() {
            1 => Ok(array.into_raw_vec()),
            2 if array.shape()[0] == 1 => Ok(array.into_raw_vec()),
            _ => Err(ScoreError::OutputShape(array.shape().to_vec())),
        }
    }
}

impl Scorer for OnnxScorer {
    fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    fn score(&mut self, window: &[f32]) -> Result<Vec<f32>, ScoreError> {
        if window.len() != self.window_size {
            return Err(ScoreError::InputShape {
                expected: self.window_size,
                given: window.len(),
            });
        }
        let scores = self.run(window)?;
        if scores.len() != self.vocabulary_size {
            return Err(ScoreError::OutputShape(vec![scores.len()]));
        }
        Ok(scores)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// What a `FakeScorer` has seen so far. Held behind an `Arc` so tests
    /// can keep a handle after boxing the scorer into a classifier.
    #[derive(Debug, Default)]
    pub struct Probe {
        pub calls: usize,
        pub received: Vec<Vec<f32>>,
    }

    /// In-memory scorer returning canned vectors, cycling when it runs out.
    pub struct FakeScorer {
        window_size: usize,
        responses: Vec<Vec<f32>>,
        probe: Arc<Mutex<Probe>>,
    }

    impl FakeScorer {
        pub fn new(window_size: usize, responses: Vec<Vec<f32>>) -> Self {
            assert!(!responses.is_empty());
            Self {
                window_size,
                responses,
                probe: Arc::new(Mutex::new(Probe::default())),
            }
        }

        /// A scorer that always returns the same vector.
        pub fn constant(window_size: usize, scores: Vec<f32>) -> Self {
            Self::new(window_size, vec![scores])
        }

        pub fn probe(&self) -> Arc<Mutex<Probe>> {
            self.probe.clone()
        }
    }

    impl Scorer for FakeScorer {
        fn vocabulary_size(&self) -> usize {
            self.responses[0].len()
        }

        fn score(&mut self, window: &[f32]) -> Result<Vec<f32>, ScoreError> {
            if window.len() != self.window_size {
                return Err(ScoreError::InputShape {
                    expected: self.window_size,
                    given: window.len(),
                });
            }
            let mut probe = self.probe.lock().unwrap();
            let response = self.responses[probe.calls % self.responses.len()].clone();
            probe.calls += 1;
            probe.received.push(window.to_vec());
            Ok(response)
        }
    }
}
