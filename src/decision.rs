use log::debug;

use crate::aggregator::RankedLabel;
use crate::{AlertEvent, AlertKind};
use crate::{LABEL_TRIGGER_THRESHOLD, LOUDNESS_THRESHOLD_DB, MINIMUM_DISPLAY_THRESHOLD};

/// Per-cycle alert decision: a label-confidence trigger OR a loudness
/// trigger, evaluated independently each cycle with no cross-cycle memory.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    pub loudness_threshold_db: f64,
    pub minimum_display_threshold: f32,
    pub label_trigger_threshold: f32,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self {
            loudness_threshold_db: LOUDNESS_THRESHOLD_DB,
            minimum_display_threshold: MINIMUM_DISPLAY_THRESHOLD,
            label_trigger_threshold: LABEL_TRIGGER_THRESHOLD,
        }
    }
}

impl DecisionEngine {
    /// Decide this cycle's event from the ranked labels and the loudness
    /// level. At most one label fires: the scan walks the ranking in
    /// descending score order and stops at the first qualifying label.
    pub fn decide(&self, ranked: &[RankedLabel], level_db: f64) -> AlertEvent {
        let is_loud = level_db > self.loudness_threshold_db;

        for entry in ranked {
            if entry.score <= self.minimum_display_threshold {
                continue;
            }
            let lower = entry.label.to_lowercase();
            let matches_target = lower.contains("siren") || lower.contains("horn");
            if matches_target && entry.score > self.label_trigger_threshold {
                let kind = if lower.contains("siren") {
                    AlertKind::Siren
                } else {
                    AlertKind::Horn
                };
                debug!(
                    "label trigger: {} ({:.3}) -> {}",
                    entry.label,
                    entry.score,
                    kind.as_str()
                );
                return AlertEvent::new(kind, Some(entry.label.clone()), Some(entry.score));
            }
        }

        if is_loud {
            debug!("loudness trigger: {:.1} dB", level_db);
            return AlertEvent::new(AlertKind::Loud, None, None);
        }

        AlertEvent::none()
    }
}
