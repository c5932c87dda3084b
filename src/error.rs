use thiserror::Error;

/// Fatal construction-time errors. None of these are retried: a mismatch
/// between the model and its label table means the deployment is broken.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load model from {path}: {source}")]
    ModelLoad {
        path: String,
        #[source]
        source: ort::Error,
    },

    #[error("failed to read label table from {path}: {source}")]
    LabelLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("label table is empty")]
    EmptyLabelTable,

    #[error("model vocabulary size {vocabulary} does not match label table size {labels}")]
    VocabularyMismatch { vocabulary: usize, labels: usize },
}

/// Sample buffer extraction failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("window [{start}, {end}) exceeds buffered history of {available} samples")]
    InsufficientData {
        start: usize,
        end: usize,
        available: usize,
    },

    #[error("window start {start} is behind the retention horizon {oldest}")]
    Discarded { start: usize, oldest: usize },
}

/// External scorer failures. A shape rejection is a model/window-size
/// mismatch and therefore a configuration bug, not a transient condition.
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("scorer rejected input of {given} samples, expected {expected}")]
    InputShape { expected: usize, given: usize },

    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("unexpected output tensor shape {0:?}")]
    OutputShape(Vec<usize>),
}

/// Capture collaborator failures.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,

    #[error("unsupported sample format {0}")]
    UnsupportedFormat(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("capture stream disconnected")]
    Disconnected,
}
