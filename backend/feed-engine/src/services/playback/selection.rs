use crate::config::PlaybackConfig;
use crate::models::ElementId;

/// Hysteresis band around the visibility boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub activation: f64,
    pub deactivation: f64,
}

impl From<&PlaybackConfig> for Thresholds {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            activation: config.activation_threshold,
            deactivation: config.deactivation_threshold,
        }
    }
}

/// Latest visibility of one tracked element, in container order
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilitySample {
    pub element_id: ElementId,
    pub ratio: f64,
    /// false when observation could not be attached
    pub autoplay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Leave the current state alone
    Keep,
    /// Pause the current element; nothing replaces it
    Demote(ElementId),
    /// Make this element the active one, pausing the current one
    Promote(ElementId),
}

/// Apply the hysteresis rule.
///
/// The most visible autoplay-eligible element is the candidate and only wins
/// once it reaches the activation threshold. The current element is dropped
/// when it falls below the deactivation threshold, even if no candidate
/// qualifies.
pub fn select(samples: &[VisibilitySample], current: Option<&str>, thresholds: Thresholds) -> Selection {
    let mut candidate: Option<&VisibilitySample> = None;
    for sample in samples.iter().filter(|s| s.autoplay) {
        match candidate {
            Some(best) if sample.ratio <= best.ratio => {}
            _ => candidate = Some(sample),
        }
    }

    if let Some(best) = candidate {
        if best.ratio >= thresholds.activation && Some(best.element_id.as_str()) != current {
            return Selection::Promote(best.element_id.clone());
        }
    }

    if let Some(current_id) = current {
        let current_ratio = samples
            .iter()
            .find(|s| s.element_id == current_id)
            .map(|s| s.ratio)
            .unwrap_or(0.0);
        if current_ratio < thresholds.deactivation {
            return Selection::Demote(current_id.to_string());
        }
    }

    Selection::Keep
}
