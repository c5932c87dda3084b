use anyhow::Context;
use log::{info, warn};
use tokio::sync::watch;

use crate::capture::CaptureSource;
use crate::classifier::SoundClassifier;
use crate::config::PipelineConfig;
use crate::decision::DecisionEngine;
use crate::loudness;
use crate::sample_buffer::SampleBuffer;
use crate::telemetry::{LogTelemetry, TelemetrySink};
use crate::window_scheduler::{Window, WindowScheduler};
use crate::{AlertEvent, Result, LOUDNESS_PROBE_SAMPLES};

// Consecutive failed capture reads tolerated before the pipeline gives up.
const MAX_CAPTURE_FAILURES: u32 = 5;

/// The streaming classification pipeline: one instance owns the sample
/// buffer, scheduler, classifier and capture source exclusively. Each tick
/// runs one synchronous classification cycle and emits at most one alert.
pub struct Pipeline {
    // Field order is the release order: the capture device goes before
    // the scorer on every exit path, including mid-construction errors.
    capture: Box<dyn CaptureSource>,
    classifier: SoundClassifier,
    buffer: SampleBuffer,
    scheduler: WindowScheduler,
    decision: DecisionEngine,
    telemetry: Box<dyn TelemetrySink>,
    on_alert: Box<dyn FnMut(&AlertEvent)>,
    interval: std::time::Duration,
    capture_failures: u32,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        classifier: SoundClassifier,
        capture: Box<dyn CaptureSource>,
    ) -> Self {
        Self {
            capture,
            classifier,
            buffer: SampleBuffer::new(),
            scheduler: WindowScheduler::new(config.window_size, config.stride),
            decision: config.decision_engine(),
            telemetry: Box::new(LogTelemetry),
            on_alert: Box::new(|_| {}),
            interval: config.interval(),
            capture_failures: 0,
        }
    }

    /// Install the alert consumer. Called at most once per cycle,
    /// fire-and-forget, only for non-`None` events.
    pub fn set_alert_handler(&mut self, handler: impl FnMut(&AlertEvent) + 'static) {
        self.on_alert = Box::new(handler);
    }

    pub fn set_telemetry(&mut self, sink: Box<dyn TelemetrySink>) {
        self.telemetry = sink;
    }

    /// One classification cycle: refill the buffer, score every ready
    /// window, estimate loudness, decide, report telemetry, trim.
    pub fn run_cycle(&mut self) -> Result<AlertEvent> {
        match self.capture.read() {
            Ok(samples) => {
                self.capture_failures = 0;
                self.buffer.append(&samples);
            }
            Err(err) => {
                self.capture_failures += 1;
                if self.capture_failures >= MAX_CAPTURE_FAILURES {
                    return Err(err).context("capture failed repeatedly");
                }
                warn!(
                    "capture read failed ({}/{}), skipping cycle: {}",
                    self.capture_failures, MAX_CAPTURE_FAILURES, err
                );
                return Ok(AlertEvent::none());
            }
        }

        let mut windows: Vec<Window> = Vec::new();
        while let Some(window) = self.scheduler.poll_ready(&self.buffer) {
            windows.push(window);
        }

        let ranked = self
            .classifier
            .classify_windows(&windows)
            .context("window scoring failed")?;

        let level = loudness::level_db(self.buffer.recent(LOUDNESS_PROBE_SAMPLES));

        let event = self.decision.decide(&ranked, level);
        if event.is_alert() {
            (self.on_alert)(&event);
        }

        self.telemetry.record(&self.classifier.timing());

        // Everything before the scheduler's pointer is consumed for good.
        self.buffer.trim_before(self.scheduler.next_start());

        Ok(event)
    }

    /// Drive cycles on a fixed wall-clock tick until `shutdown` flips to
    /// true or a cycle fails fatally. A slow cycle is never cancelled; it
    /// eats into the following idle gap instead.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        info!(
            "pipeline started, classifying every {}ms",
            self.interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle()?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("pipeline stopped");
        Ok(())
    }

    /// Tear down, releasing the capture device before the scorer.
    pub fn close(self) {
        let Self {
            capture, classifier, ..
        } = self;
        drop(capture);
        drop(classifier);
        info!("pipeline resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptureError;
    use crate::labels::LabelTable;
    use crate::scorer::testing::FakeScorer;
    use crate::telemetry::TimingSample;
    use crate::{AlertKind, STRIDE, WINDOW_SIZE};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedCapture {
        reads: VecDeque<std::result::Result<Vec<i16>, CaptureError>>,
    }

    impl ScriptedCapture {
        fn new(reads: Vec<std::result::Result<Vec<i16>, CaptureError>>) -> Self {
            Self {
                reads: reads.into(),
            }
        }
    }

    impl CaptureSource for ScriptedCapture {
        fn read(&mut self) -> std::result::Result<Vec<i16>, CaptureError> {
            self.reads.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct CollectingSink(Arc<Mutex<Vec<TimingSample>>>);

    impl TelemetrySink for CollectingSink {
        fn record(&mut self, sample: &TimingSample) {
            self.0.lock().unwrap().push(*sample);
        }
    }

    fn classifier(scorer: FakeScorer, names: &[&str]) -> SoundClassifier {
        let labels = LabelTable::from_labels(names.iter().map(|s| s.to_string()).collect()).unwrap();
        SoundClassifier::new(Box::new(scorer), labels, WINDOW_SIZE, STRIDE, 3).unwrap()
    }

    fn pipeline_with(
        scorer: FakeScorer,
        names: &[&str],
        capture: ScriptedCapture,
    ) -> (Pipeline, Arc<Mutex<Vec<AlertEvent>>>) {
        let mut pipeline = Pipeline::new(
            &PipelineConfig::default(),
            classifier(scorer, names),
            Box::new(capture),
        );
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let sink = alerts.clone();
        pipeline.set_alert_handler(move |event| sink.lock().unwrap().push(event.clone()));
        (pipeline, alerts)
    }

    #[test]
    fn quiet_short_cycle_emits_nothing() {
        let capture = ScriptedCapture::new(vec![Ok(vec![0i16; 1000])]);
        let (mut pipeline, alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);

        let event = pipeline.run_cycle().unwrap();
        assert_eq!(event.kind, AlertKind::None);
        assert!(alerts.lock().unwrap().is_empty());
    }

    #[test]
    fn loudness_alone_triggers_without_any_window() {
        // 1024 full-scale samples: far below a window, way over 10 dB.
        let loud: Vec<i16> = (0..1024)
            .map(|i| if i % 2 == 0 { 32767 } else { -32767 })
            .collect();
        let capture = ScriptedCapture::new(vec![Ok(loud)]);
        let (mut pipeline, alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);

        let event = pipeline.run_cycle().unwrap();
        assert_eq!(event.kind, AlertKind::Loud);
        assert_eq!(alerts.lock().unwrap().len(), 1);
    }

    #[test]
    fn siren_window_triggers_label_alert() {
        let capture = ScriptedCapture::new(vec![Ok(vec![0i16; WINDOW_SIZE])]);
        let scorer = FakeScorer::constant(WINDOW_SIZE, vec![0.1, 0.5]);
        let (mut pipeline, alerts) = pipeline_with(scorer, &["Speech", "Siren"], capture);

        let event = pipeline.run_cycle().unwrap();
        assert_eq!(event.kind, AlertKind::Siren);
        assert_eq!(event.label.as_deref(), Some("Siren"));
        assert_eq!(alerts.lock().unwrap().len(), 1);
    }

    #[test]
    fn cycle_scores_every_ready_window() {
        let capture = ScriptedCapture::new(vec![Ok(vec![0i16; 32000])]);
        let scorer = FakeScorer::new(
            WINDOW_SIZE,
            vec![
                vec![0.9, 0.1],
                vec![0.1, 0.9],
                vec![0.5, 0.5],
            ],
        );
        let probe = scorer.probe();
        let (mut pipeline, _alerts) = pipeline_with(scorer, &["a", "b"], capture);

        // Mean over the three vectors is [0.5, 0.5]; neither label is a
        // target category, so the cycle stays quiet.
        let event = pipeline.run_cycle().unwrap();
        assert_eq!(probe.lock().unwrap().calls, 3);
        assert_eq!(event.kind, AlertKind::None);
    }

    #[test]
    fn consumed_samples_are_trimmed_after_the_cycle() {
        let capture = ScriptedCapture::new(vec![Ok(vec![0i16; WINDOW_SIZE])]);
        let (mut pipeline, _alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);

        pipeline.run_cycle().unwrap();
        assert_eq!(pipeline.buffer.oldest(), STRIDE);
        assert_eq!(pipeline.scheduler.next_start(), STRIDE);
    }

    #[test]
    fn one_capture_failure_skips_the_cycle() {
        let capture = ScriptedCapture::new(vec![
            Err(CaptureError::Stream("underrun".into())),
            Ok(vec![0i16; 100]),
        ]);
        let (mut pipeline, _alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);

        let event = pipeline.run_cycle().unwrap();
        assert_eq!(event.kind, AlertKind::None);
        // A later good read resets the failure count.
        pipeline.run_cycle().unwrap();
        assert_eq!(pipeline.capture_failures, 0);
    }

    #[test]
    fn repeated_capture_failures_become_fatal() {
        let reads = (0..MAX_CAPTURE_FAILURES)
            .map(|_| Err(CaptureError::Stream("gone".into())))
            .collect();
        let (mut pipeline, _alerts) = pipeline_with(
            FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]),
            &["a", "b"],
            ScriptedCapture::new(reads),
        );

        for _ in 0..MAX_CAPTURE_FAILURES - 1 {
            assert!(pipeline.run_cycle().is_ok());
        }
        assert!(pipeline.run_cycle().is_err());
    }

    #[test]
    fn telemetry_receives_one_sample_per_cycle() {
        let capture = ScriptedCapture::new(vec![Ok(vec![0i16; WINDOW_SIZE]), Ok(Vec::new())]);
        let (mut pipeline, _alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);
        let samples = Arc::new(Mutex::new(Vec::new()));
        pipeline.set_telemetry(Box::new(CollectingSink(samples.clone())));

        pipeline.run_cycle().unwrap();
        pipeline.run_cycle().unwrap();
        assert_eq!(samples.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let capture = ScriptedCapture::new(vec![]);
        let (mut pipeline, _alerts) =
            pipeline_with(FakeScorer::constant(WINDOW_SIZE, vec![0.0, 0.0]), &["a", "b"], capture);

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        pipeline.run(rx).await.unwrap();
    }
}
