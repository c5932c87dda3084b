use log::debug;

/// Last-cycle phase durations. Overwritten every cycle, never historized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingSample {
    pub preprocessing_nanos: u128,
    pub inference_nanos: u128,
    pub postprocessing_nanos: u128,
}

impl TimingSample {
    pub fn total_nanos(&self) -> u128 {
        self.preprocessing_nanos + self.inference_nanos + self.postprocessing_nanos
    }
}

/// Observational sink for per-cycle timing. Must not apply back-pressure.
pub trait TelemetrySink: Send {
    fn record(&mut self, sample: &TimingSample);
}

/// Default sink: timing goes to the debug log.
#[derive(Debug, Default)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn record(&mut self, sample: &TimingSample) {
        debug!(
            "cycle timing: preprocess {:.3}ms, inference {:.3}ms, postprocess {:.3}ms",
            sample.preprocessing_nanos as f64 / 1e6,
            sample.inference_nanos as f64 / 1e6,
            sample.postprocessing_nanos as f64 / 1e6,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_phases() {
        let sample = TimingSample {
            preprocessing_nanos: 10,
            inference_nanos: 200,
            postprocessing_nanos: 3,
        };
        assert_eq!(sample.total_nanos(), 213);
    }
}
