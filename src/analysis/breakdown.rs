use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::analysis::config::LocalizerConfig;
use crate::analysis::deviation::{DeviationDetector, DeviationPoint};
use crate::analysis::edge::EdgeDetector;
use crate::analysis::error::AnalysisError;
use crate::analysis::jitter::{JitterEstimate, JitterEstimator};
use crate::analysis::pulse::{PulseShape, PulseShapeEvaluator};
use crate::analysis::waveform::{EventMeta, Waveform};
/// The three power signals recorded for one pulse.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalPath {
    pub incident: Waveform,
    pub transmitted: Waveform,
    pub reflected: Waveform,
}
impl SignalPath {
    pub fn new(incident: Waveform, transmitted: Waveform, reflected: Waveform) -> Self {
        Self {
            incident,
            transmitted,
            reflected,
        }
    }
    pub fn shifted(&self, delta: f64) -> SignalPath {
        SignalPath {
            incident: self.incident.shifted(delta),
            transmitted: self.transmitted.shifted(delta),
            reflected: self.reflected.shifted(delta),
        }
    }
}
/// Everything measured for one breakdown event.
///
/// Only `meta` and `jitter` are filled when the jitter estimate is invalid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLocation {
    pub meta: EventMeta,
    pub jitter: JitterEstimate,
    pub reference: Option<PulseShape>,
    pub current: Option<PulseShape>,
    pub transmitted_edge: Option<f64>,
    pub reflected_edge: Option<f64>,
    pub transmitted_deviation: Option<DeviationPoint>,
    pub reflected_deviation: Option<DeviationPoint>,
    /// Half the difference of the reflected and transmitted deviation delays.
    pub position: Option<f64>,
}
impl BreakdownLocation {
    fn metadata_only(meta: EventMeta, jitter: JitterEstimate) -> Self {
        Self {
            meta,
            jitter,
            reference: None,
            current: None,
            transmitted_edge: None,
            reflected_edge: None,
            transmitted_deviation: None,
            reflected_deviation: None,
            position: None,
        }
    }
    pub fn is_complete(&self) -> bool {
        self.position.is_some() && self.reference.is_some() && self.current.is_some()
    }
}
/// `((t_dev,refl - t_edge,refl) - (t_dev,tran - t_edge,tran)) / 2`
pub fn breakdown_position(transmitted_deviation: f64, transmitted_edge: f64, reflected_deviation: f64, reflected_edge: f64) -> f64 {
    0.5 * ((reflected_deviation - reflected_edge) - (transmitted_deviation - transmitted_edge))
}
/// Combines jitter, edge and deviation detection into a breakdown position estimate.
#[derive(Clone, Debug)]
pub struct BreakdownLocalizer {
    pulse: PulseShapeEvaluator,
    jitter: JitterEstimator,
    edge: EdgeDetector,
    deviation: DeviationDetector,
}
impl BreakdownLocalizer {
    pub fn new(config: LocalizerConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            pulse: PulseShapeEvaluator::new(config.pulse)?,
            jitter: JitterEstimator::new(config.jitter)?,
            edge: EdgeDetector::new(config.edge)?,
            deviation: DeviationDetector::new(config.deviation)?,
        })
    }
    /// Compares the current pulse against the reference (previous) pulse.
    ///
    /// `sync` and `sync_ref` carry the same trigger-locked signal for both pulses and
    /// only serve the jitter estimate. The reference path is shifted by `-jitter`
    /// before any other measurement.
    pub fn evaluate(&self, signal_path: &SignalPath, signal_path_ref: &SignalPath, sync: &Waveform, sync_ref: &Waveform) -> BreakdownLocation {
        let meta = signal_path.incident.meta().clone();
        let jitter = self.jitter.estimate(sync, sync_ref);
        let Some(delay) = jitter.delay() else {
            info!("event {}: invalid jitter, keeping metadata only", meta.event_id);
            return BreakdownLocation::metadata_only(meta, jitter);
        };
        let aligned = signal_path_ref.shifted(-delay);
        let reference = self
            .edge
            .locate(&aligned.incident)
            .and_then(|rise| self.pulse.evaluate_with_rise(&aligned.incident, rise));
        let current = self.pulse.evaluate(&signal_path.incident);
        let transmitted_edge = self.edge.locate(&aligned.transmitted);
        let reflected_edge = self.edge.locate(&aligned.reflected);
        let transmitted_deviation = self.deviation.locate(&signal_path.transmitted, &aligned.transmitted, 0.0);
        let reflected_deviation = self.deviation.locate(&signal_path.reflected, &aligned.reflected, 0.0);
        let position = match (
            transmitted_deviation.time(),
            transmitted_edge,
            reflected_deviation.time(),
            reflected_edge,
        ) {
            (Some(td), Some(te), Some(rd), Some(re)) => Some(breakdown_position(td, te, rd, re)),
            _ => None,
        };
        debug!(
            "event {}: jitter {delay}, edges {transmitted_edge:?}/{reflected_edge:?}, deviations {transmitted_deviation:?}/{reflected_deviation:?}",
            meta.event_id
        );
        if let Some(position) = position {
            info!("event {}: breakdown position {position}", meta.event_id);
        }
        BreakdownLocation {
            meta,
            jitter,
            reference,
            current,
            transmitted_edge,
            reflected_edge,
            transmitted_deviation: Some(transmitted_deviation),
            reflected_deviation: Some(reflected_deviation),
            position,
        }
    }
}
