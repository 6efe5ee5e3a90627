use log::debug;
use serde::{Deserialize, Serialize};
use crate::analysis::config::{check_fraction, check_samples, JitterConfig};
use crate::analysis::error::AnalysisError;
use crate::analysis::filter::{linspace, SignalFilter};
use crate::analysis::waveform::Waveform;
/// Delay of waveform B relative to waveform A.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum JitterEstimate {
    Valid(f64),
    /// No crossing in one of the records, or the delay exceeds the tolerance.
    Invalid,
}
impl JitterEstimate {
    pub fn delay(&self) -> Option<f64> {
        match self {
            JitterEstimate::Valid(delay) => Some(*delay),
            JitterEstimate::Invalid => None,
        }
    }
    pub fn is_valid(&self) -> bool {
        matches!(self, JitterEstimate::Valid(_))
    }
}
/// Threshold-alignment delay estimator between two acquisitions of the same signal.
#[derive(Clone, Debug)]
pub struct JitterEstimator {
    config: JitterConfig,
    filter: SignalFilter,
}
impl JitterEstimator {
    pub fn new(config: JitterConfig) -> Result<Self, AnalysisError> {
        config.window.validate()?;
        check_fraction("jitter threshold", config.threshold)?;
        check_fraction("jitter tolerance", config.tolerance)?;
        check_samples("jitter samples", config.samples, 3)?;
        Ok(Self {
            filter: SignalFilter::new(config.filter, 0)?,
            config,
        })
    }
    pub fn config(&self) -> &JitterConfig {
        &self.config
    }
    /// `t_B - t_A` of the first crossing of a level derived from A's smoothed curve.
    pub fn estimate(&self, a: &Waveform, b: &Waveform) -> JitterEstimate {
        let (t0, t1) = a.fiducial(&self.config.window);
        let grid = linspace(t0, t1, self.config.samples);
        let (ya, yb) = match (self.filter.sample_at(a, &grid), self.filter.sample_at(b, &grid)) {
            (Ok(ya), Ok(yb)) => (ya, yb),
            (Err(err), _) | (_, Err(err)) => {
                debug!("jitter: cannot resample window [{t0}, {t1}]: {err}");
                return JitterEstimate::Invalid;
            }
        };
        let min = ya.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ya.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let level = self.config.threshold * (max - min) + min;
        let (Some(ta), Some(tb)) = (first_crossing(&grid, &ya, level), first_crossing(&grid, &yb, level)) else {
            debug!("jitter: level {level} not crossed by both records");
            return JitterEstimate::Invalid;
        };
        let delay = tb - ta;
        let (lb, ub) = a.bounds();
        if delay.abs() > self.config.tolerance * (ub - lb) {
            debug!("jitter: delay {delay} exceeds tolerance");
            return JitterEstimate::Invalid;
        }
        debug!("jitter: level {level}, t_a {ta}, t_b {tb}, delay {delay}");
        JitterEstimate::Valid(delay)
    }
}
/// First time `y` leaves the side of `level` it starts on, linearly interpolated.
/// Reaching the level from below counts.
pub fn first_crossing(t: &[f64], y: &[f64], level: f64) -> Option<f64> {
    let below = *y.first()? < level;
    (1..y.len().min(t.len()))
        .find(|&i| if below { y[i] >= level } else { y[i] < level })
        .map(|i| t[i] - (y[i] - level) / (y[i] - y[i - 1]) * (t[i] - t[i - 1]))
}
