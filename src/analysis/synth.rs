use std::f64::consts::PI;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::analysis::error::AnalysisError;
use crate::analysis::waveform::{EventMeta, Waveform};
/// Linear collapse of the pulse envelope down to zero, as seen on the transmitted
/// power of a breakdown pulse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collapse {
    pub at: f64,
    pub duration: f64,
}
/// Deterministic RF pulse envelope: raised-cosine rise, drooping flat top,
/// raised-cosine fall. Used to build repeatable events for tests and the demo.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticPulse {
    pub onset: f64,
    pub rise: f64,
    pub top: f64,
    pub fall: f64,
    pub amplitude: f64,
    /// Fractional amplitude lost across the flat top.
    pub droop: f64,
    pub baseline: f64,
    pub collapse: Option<Collapse>,
}
impl Default for SyntheticPulse {
    fn default() -> Self {
        SyntheticPulse {
            onset: 500.0,
            rise: 100.0,
            top: 800.0,
            fall: 100.0,
            amplitude: 1.0,
            droop: 0.05,
            baseline: 0.0,
            collapse: None,
        }
    }
}
impl SyntheticPulse {
    pub fn with_onset(mut self, onset: f64) -> Self {
        self.onset = onset;
        self
    }
    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }
    pub fn with_collapse(mut self, at: f64, duration: f64) -> Self {
        self.collapse = Some(Collapse { at, duration });
        self
    }
    pub fn value_at(&self, t: f64) -> f64 {
        let u = t - self.onset;
        let envelope = if u < 0.0 {
            0.0
        } else if u < self.rise {
            0.5 * (1.0 - (PI * u / self.rise).cos())
        } else if u < self.rise + self.top {
            1.0 - self.droop * (u - self.rise) / self.top
        } else if u < self.rise + self.top + self.fall {
            let v = (u - self.rise - self.top) / self.fall;
            (1.0 - self.droop) * 0.5 * (1.0 + (PI * v).cos())
        } else {
            0.0
        };
        let kept = match self.collapse {
            Some(c) if t > c.at => (1.0 - (t - c.at) / c.duration).max(0.0),
            _ => 1.0,
        };
        self.amplitude * envelope * kept + self.baseline
    }
    pub fn samples(&self, len: usize, increment: f64) -> Vec<f64> {
        (0..len).map(|i| self.value_at(i as f64 * increment)).collect()
    }
    pub fn waveform(&self, len: usize, increment: f64) -> Result<Waveform, AnalysisError> {
        Waveform::new(self.samples(len, increment), 0.0, increment)
    }
}
/// Sample-wise sum of equally long records.
pub fn superpose(parts: &[Vec<f64>]) -> Vec<f64> {
    let len = parts.iter().map(Vec::len).min().unwrap_or(0);
    (0..len).map(|i| parts.iter().map(|p| p[i]).sum()).collect()
}
/// Ramp from zero to `amplitude` over `duration` starting at `at`, held until the
/// record ends. Mimics the reflected power growing after a breakdown.
pub fn ramp(len: usize, increment: f64, at: f64, duration: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * ((i as f64 * increment - at) / duration).clamp(0.0, 1.0))
        .collect()
}
/// Adds uniform noise in `[-level, level]` from a seeded generator.
pub fn add_noise(samples: &mut [f64], level: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for v in samples.iter_mut() {
        *v += rng.gen_range(-level..=level);
    }
}
/// Metadata for a synthetic event with the given pulse counter.
pub fn event_meta(event_id: u64, breakdown: bool) -> EventMeta {
    EventMeta {
        version: 1,
        event_id,
        breakdown_flag: breakdown,
        ..EventMeta::default()
    }
}
