use crate::error::BufferError;

/// Buffer of raw 16-bit capture samples, addressed by absolute offset.
///
/// Offsets keep counting from the start of the stream even after old
/// samples are trimmed, so the scheduler's sliding pointer stays valid
/// across retention passes.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    data: Vec<i16>,
    base_offset: usize,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append captured samples, extending the retained history.
    pub fn append(&mut self, samples: &[i16]) {
        self.data.extend_from_slice(samples);
    }

    /// Total number of samples ever appended (absolute stream length).
    pub fn len(&self) -> usize {
        self.base_offset + self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute offset of the oldest sample still retained.
    pub fn oldest(&self) -> usize {
        self.base_offset
    }

    /// Copy out `length` samples starting at absolute offset `start`,
    /// converted to float amplitude in [-1, 1).
    pub fn extract_window(&self, start: usize, length: usize) -> Result<Vec<f32>, BufferError> {
        let end = start + length;
        if end > self.len() {
            return Err(BufferError::InsufficientData {
                start,
                end,
                available: self.len(),
            });
        }
        if start < self.base_offset {
            return Err(BufferError::Discarded {
                start,
                oldest: self.base_offset,
            });
        }

        let lo = start - self.base_offset;
        let hi = end - self.base_offset;
        Ok(self.data[lo..hi]
            .iter()
            .map(|&s| s as f32 / 32768.0)
            .collect())
    }

    /// The most recent `n` raw samples (fewer if less history is retained).
    pub fn recent(&self, n: usize) -> &[i16] {
        let skip = self.data.len().saturating_sub(n);
        &self.data[skip..]
    }

    /// Discard samples older than absolute offset `offset`. Trimming past
    /// the end of history clamps to the end.
    pub fn trim_before(&mut self, offset: usize) {
        let offset = offset.min(self.len());
        if offset <= self.base_offset {
            return;
        }
        let drop = offset - self.base_offset;
        self.data.drain(..drop);
        self.base_offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_extends_history() {
        let mut buf = SampleBuffer::new();
        assert!(buf.is_empty());
        buf.append(&[1, 2, 3]);
        buf.append(&[4]);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn extract_converts_to_unit_floats() {
        let mut buf = SampleBuffer::new();
        buf.append(&[0, 16384, -32768]);
        let window = buf.extract_window(0, 3).unwrap();
        assert_eq!(window, vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn extract_beyond_history_is_insufficient_data() {
        let mut buf = SampleBuffer::new();
        buf.append(&[0; 10]);
        let err = buf.extract_window(5, 6).unwrap_err();
        assert_eq!(
            err,
            BufferError::InsufficientData {
                start: 5,
                end: 11,
                available: 10
            }
        );
    }

    #[test]
    fn extract_behind_horizon_is_discarded() {
        let mut buf = SampleBuffer::new();
        buf.append(&[0; 10]);
        buf.trim_before(4);
        let err = buf.extract_window(2, 4).unwrap_err();
        assert_eq!(err, BufferError::Discarded { start: 2, oldest: 4 });
    }

    #[test]
    fn trim_preserves_absolute_offsets() {
        let mut buf = SampleBuffer::new();
        buf.append(&[10, 20, 30, 40, 50]);
        buf.trim_before(2);
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.oldest(), 2);
        let window = buf.extract_window(2, 3).unwrap();
        assert_eq!(window.len(), 3);
        assert!((window[0] - 30.0 / 32768.0).abs() < 1e-9);
    }

    #[test]
    fn trim_is_idempotent_and_clamped() {
        let mut buf = SampleBuffer::new();
        buf.append(&[0; 8]);
        buf.trim_before(3);
        buf.trim_before(3);
        assert_eq!(buf.oldest(), 3);
        buf.trim_before(100);
        assert_eq!(buf.oldest(), 8);
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn recent_returns_tail() {
        let mut buf = SampleBuffer::new();
        buf.append(&[1, 2, 3, 4, 5]);
        assert_eq!(buf.recent(2), &[4, 5]);
        assert_eq!(buf.recent(10), &[1, 2, 3, 4, 5]);
    }
}
