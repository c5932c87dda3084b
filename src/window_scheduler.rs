use crate::sample_buffer::SampleBuffer;
use crate::{STRIDE, WINDOW_SIZE};

/// A fixed-length slice of float samples handed to the scorer.
///
/// Always exactly `window_size` samples; never padded or truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub start: usize,
    pub samples: Vec<f32>,
}

/// Slides a fixed window over the sample buffer at a fixed stride.
///
/// Window starts are strictly increasing; no window is skipped or emitted
/// twice. A fresh scheduler over the same buffer reproduces the same
/// window sequence.
#[derive(Debug)]
pub struct WindowScheduler {
    next_start: usize,
    window_size: usize,
    stride: usize,
}

impl Default for WindowScheduler {
    fn default() -> Self {
        Self::new(WINDOW_SIZE, STRIDE)
    }
}

impl WindowScheduler {
    pub fn new(window_size: usize, stride: usize) -> Self {
        assert!(window_size > 0 && stride > 0);
        Self {
            next_start: 0,
            window_size,
            stride,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Offset of the next window to be emitted. Samples before this point
    /// will never be needed again and may be trimmed from the buffer.
    pub fn next_start(&self) -> usize {
        self.next_start
    }

    /// Emit the next window if the buffer holds enough samples for it,
    /// advancing the sliding pointer by one stride. Returns `None` until
    /// more samples arrive.
    pub fn poll_ready(&mut self, buffer: &SampleBuffer) -> Option<Window> {
        if self.next_start + self.window_size > buffer.len() {
            return None;
        }

        // The buffer retains everything at or past next_start, so this
        // extraction cannot fail in correct operation.
        let samples = buffer
            .extract_window(self.next_start, self.window_size)
            .expect("scheduler window behind retention horizon");
        let window = Window {
            start: self.next_start,
            samples,
        };
        self.next_start += self.stride;
        Some(window)
    }
}
