use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ConfigError;

/// Ordered label vocabulary, one label per line, index-aligned with the
/// model's output vector. Loaded once; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::LabelLoad {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), &path.display().to_string())
    }

    pub fn from_reader<R: BufRead>(reader: R, path: &str) -> Result<Self, ConfigError> {
        let labels = reader
            .lines()
            .collect::<Result<Vec<String>, _>>()
            .map_err(|source| ConfigError::LabelLoad {
                path: path.to_string(),
                source,
            })?;

        if labels.is_empty() {
            return Err(ConfigError::EmptyLabelTable);
        }
        Ok(Self { labels })
    }

    /// Build a table from in-memory labels. Used by tests and embedders.
    pub fn from_labels(labels: Vec<String>) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::EmptyLabelTable);
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }
}
