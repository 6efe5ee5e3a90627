use log::debug;
use serde::{Deserialize, Serialize};
use crate::analysis::config::{check_fraction, PulseConfig};
use crate::analysis::error::AnalysisError;
use crate::analysis::waveform::Waveform;
/// Pulse top statistics between a rising and a falling edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseShape {
    pub rising_edge: f64,
    pub falling_edge: f64,
    /// `falling_edge - rising_edge`.
    pub length: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub integral: f64,
    /// Peak-to-peak amplitude over the whole record.
    pub span: f64,
}
impl PulseShape {
    /// Statistics of `waveform` over `[rise, fall]`.
    pub fn between(waveform: &Waveform, rise: f64, fall: f64) -> Self {
        PulseShape {
            rising_edge: rise,
            falling_edge: fall,
            length: fall - rise,
            min: waveform.min(rise, fall),
            max: waveform.max(rise, fall),
            mean: waveform.mean(rise, fall),
            integral: waveform.integral(rise, fall),
            span: waveform.span(1.0, 0.0),
        }
    }
}
/// Threshold-based pulse edges plus top statistics.
#[derive(Clone, Debug)]
pub struct PulseShapeEvaluator {
    config: PulseConfig,
}
impl PulseShapeEvaluator {
    pub fn new(config: PulseConfig) -> Result<Self, AnalysisError> {
        config.window.validate()?;
        check_fraction("pulse threshold", config.threshold)?;
        Ok(Self { config })
    }
    pub fn config(&self) -> &PulseConfig {
        &self.config
    }
    pub fn evaluate(&self, waveform: &Waveform) -> Option<PulseShape> {
        let (t0, t1) = waveform.fiducial(&self.config.window);
        let rise = waveform.rising_edge(self.config.threshold, t0, t1)?;
        self.evaluate_with_rise(waveform, rise)
    }
    /// Same as [`evaluate`](Self::evaluate) with an externally refined rising edge.
    pub fn evaluate_with_rise(&self, waveform: &Waveform, rise: f64) -> Option<PulseShape> {
        let (t0, t1) = waveform.fiducial(&self.config.window);
        let Some(fall) = waveform.falling_edge(self.config.threshold, t0, t1) else {
            debug!("pulse: no falling edge in [{t0}, {t1}]");
            return None;
        };
        let shape = PulseShape::between(waveform, rise, fall);
        debug!(
            "pulse: rise {rise}, fall {fall}, min {}, max {}, mean {}, span {}",
            shape.min, shape.max, shape.mean, shape.span
        );
        Some(shape)
    }
}
/// Plain window statistics; an inverted window covers the whole record.
pub fn signal_stats(waveform: &Waveform, t0: f64, t1: f64) -> PulseShape {
    PulseShape::between(waveform, t0, t1)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::synth::SyntheticPulse;
    #[test]
    fn measures_flat_top() {
        let wf = SyntheticPulse::default().waveform(2000, 1.0).unwrap();
        let evaluator = PulseShapeEvaluator::new(PulseConfig::default()).unwrap();
        let shape = evaluator.evaluate(&wf).unwrap();
        assert!(shape.rising_edge > 550.0 && shape.rising_edge < 600.0);
        assert!(shape.falling_edge > 1400.0 && shape.falling_edge < 1450.0);
        assert!(shape.max <= 1.0 && shape.min > 0.85);
        assert!(shape.mean > 0.9 && shape.mean < 1.0);
        assert!((shape.integral - shape.mean * (shape.falling_edge.floor() - shape.rising_edge.floor() + 1.0)).abs() < 1e-9);
        assert_eq!(shape.span, 1.0);
        assert!(shape.length > 800.0);
        assert_eq!(shape.length, shape.falling_edge - shape.rising_edge);
        let json = serde_json::to_value(shape).unwrap();
        assert_eq!(json["length"].as_f64(), Some(shape.length));
    }
    #[test]
    fn refined_rise_is_kept() {
        let wf = SyntheticPulse::default().waveform(2000, 1.0).unwrap();
        let evaluator = PulseShapeEvaluator::new(PulseConfig::default()).unwrap();
        let shape = evaluator.evaluate_with_rise(&wf, 520.0).unwrap();
        assert_eq!(shape.rising_edge, 520.0);
        assert!(shape.min < 0.5);
    }
    #[test]
    fn empty_record_has_no_shape() {
        let wf = Waveform::new(vec![0.0; 100], 0.0, 1.0).unwrap();
        let evaluator = PulseShapeEvaluator::new(PulseConfig::default()).unwrap();
        assert_eq!(evaluator.evaluate(&wf), None);
    }
    #[test]
    fn window_statistics() {
        let wf = Waveform::new(vec![1.0, 2.0, 3.0, 4.0], 0.0, 1.0).unwrap();
        let stats = signal_stats(&wf, 1.0, 2.0);
        assert_eq!((stats.min, stats.max, stats.mean), (2.0, 3.0, 2.5));
        assert_eq!(stats.span, 3.0);
        assert!(PulseShapeEvaluator::new(PulseConfig { threshold: 0.0, ..PulseConfig::default() }).is_err());
    }
}
