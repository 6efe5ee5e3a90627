use log::debug;
use crate::analysis::config::{check_fraction, check_samples, EdgeConfig};
use crate::analysis::error::AnalysisError;
use crate::analysis::filter::{linspace, SignalFilter};
use crate::analysis::waveform::Waveform;
/// Locates the onset of a pulse's rising edge.
///
/// A coarse threshold crossing selects a proximity window which is resampled on a
/// dense grid. The smoothed signal and its first two derivatives are then walked
/// through four stages: the crest after the window centre, the inflection before
/// it, the tangent's baseline crossing, and finally the point of maximum
/// curvature between the last two, which is reported as the onset.
#[derive(Clone, Debug)]
pub struct EdgeDetector {
    config: EdgeConfig,
    signal: SignalFilter,
    slope: SignalFilter,
    curvature: SignalFilter,
}
impl EdgeDetector {
    pub fn new(config: EdgeConfig) -> Result<Self, AnalysisError> {
        config.window.validate()?;
        check_fraction("edge threshold", config.threshold)?;
        check_fraction("edge proximity", config.proximity)?;
        check_samples("edge refine samples", config.refine_samples, 3)?;
        Ok(Self {
            signal: SignalFilter::new(config.signal_filter, 0)?,
            slope: SignalFilter::new(config.derivative_filter, 1)?,
            curvature: SignalFilter::new(config.derivative_filter, 2)?,
            config,
        })
    }
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
    pub fn locate(&self, waveform: &Waveform) -> Option<f64> {
        let (t0, t1) = waveform.fiducial(&self.config.window);
        let Some(coarse) = waveform.rising_edge(self.config.threshold, t0, t1) else {
            debug!("edge: no threshold crossing in [{t0}, {t1}]");
            return None;
        };
        let (lb, ub) = waveform.bounds();
        let half = 0.5 * self.config.proximity * (ub - lb);
        let (lo, hi) = ((coarse - half).max(lb), (coarse + half).min(ub));
        let n = self.config.refine_samples;
        let grid = linspace(lo, hi, n);
        let dt = (hi - lo) / (n - 1) as f64;
        let (y, dy, ddy) = match self.curves(waveform, &grid) {
            Ok(curves) => curves,
            Err(err) => {
                debug!("edge: refinement window unusable: {err}");
                return None;
            }
        };
        let crest = find_local_max_after(&dy, n / 2);
        let Some(inflection) = find_preceding_sign_change(&ddy, crest) else {
            debug!("edge: no inflection before crest at {}", grid[crest]);
            return None;
        };
        let zero = tangent_zero_crossing(&y, &dy, inflection, self.config.slope_window, dt);
        let onset = max_curvature_in_range(&ddy, zero, inflection);
        debug!(
            "edge: coarse {coarse}, crest {}, inflection {}, tangent zero {}, onset {}",
            grid[crest], grid[inflection], grid[zero], grid[onset]
        );
        Some(grid[onset])
    }
    fn curves(&self, waveform: &Waveform, grid: &[f64]) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), AnalysisError> {
        Ok((
            self.signal.sample_at(waveform, grid)?,
            self.slope.sample_at(waveform, grid)?,
            self.curvature.sample_at(waveform, grid)?,
        ))
    }
}
/// Index of the first local maximum of the underlying signal at or after `start`,
/// i.e. where its derivative `dy` changes sign from positive to negative. When `dy`
/// is not positive at `start` the next upward sign change is taken instead. Falls
/// back to the last index.
pub fn find_local_max_after(dy: &[f64], start: usize) -> usize {
    let last = dy.len().saturating_sub(1);
    let start = start.min(last);
    let rising = dy.get(start).is_some_and(|&v| v > 0.0);
    (start..last)
        .find(|&i| {
            if rising {
                dy[i] > 0.0 && dy[i + 1] < 0.0
            } else {
                dy[i] < 0.0 && dy[i + 1] > 0.0
            }
        })
        .unwrap_or(last)
}
/// Nearest sign change of `values` at or before `start`, scanning backward.
///
/// With a negative value at `start` this is the positive-to-negative transition
/// (the inflection of a rising edge seen from its crest).
pub fn find_preceding_sign_change(values: &[f64], start: usize) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let start = start.min(values.len() - 1);
    let from_above = values[start] > 0.0;
    (1..=start).rev().find(|&i| {
        if from_above {
            values[i - 1] < 0.0 && values[i] > 0.0
        } else {
            values[i - 1] > 0.0 && values[i] < 0.0
        }
    })
}
/// Index where the tangent at `inflection` meets the baseline (minimum of `y`).
///
/// The slope is the mean of `dy` over `inflection ± half_window`; `dt` is the grid
/// spacing. Clamped to `[0, inflection]`.
pub fn tangent_zero_crossing(y: &[f64], dy: &[f64], inflection: usize, half_window: usize, dt: f64) -> usize {
    let lo = inflection.saturating_sub(half_window);
    let hi = (inflection + half_window).min(dy.len() - 1);
    let slope = dy[lo..=hi].iter().sum::<f64>() / (hi - lo + 1) as f64;
    let baseline = y.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = (y[inflection] - baseline) / (slope * dt);
    if !(shift.is_finite() && shift > 0.0) {
        return if shift.is_finite() { inflection } else { 0 };
    }
    inflection.saturating_sub(shift.floor() as usize)
}
/// Index of the largest value in `[from, to)`, `from` when the range is empty.
pub fn max_curvature_in_range(ddy: &[f64], from: usize, to: usize) -> usize {
    let to = to.min(ddy.len());
    (from..to).fold(from, |best, i| if ddy[i] > ddy[best] { i } else { best })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::synth::{add_noise, SyntheticPulse};
    fn pulse() -> Waveform {
        SyntheticPulse::default().waveform(2000, 1.0).unwrap()
    }
    #[test]
    fn onset_lies_between_foot_and_coarse_crossing() {
        let wf = pulse();
        let detector = EdgeDetector::new(EdgeConfig::default()).unwrap();
        let coarse = wf.rising_edge(0.6, 19.99, 1979.01).unwrap();
        let edge = detector.locate(&wf).unwrap();
        assert!(edge > 500.0 && edge < coarse, "edge {edge}, coarse {coarse}");
    }
    #[test]
    fn wide_proximity_finds_tangent_foot() {
        // tangent at the mid-rise inflection meets zero at 550 - 100 / pi
        let wf = pulse();
        let config = EdgeConfig {
            proximity: 0.1,
            ..EdgeConfig::default()
        };
        let edge = EdgeDetector::new(config).unwrap().locate(&wf).unwrap();
        assert!((edge - (550.0 - 100.0 / std::f64::consts::PI)).abs() < 1.0, "edge {edge}");
    }
    #[test]
    fn edge_follows_time_shift() {
        let wf = pulse();
        let detector = EdgeDetector::new(EdgeConfig::default()).unwrap();
        let a = detector.locate(&wf).unwrap();
        let b = detector.locate(&wf.shifted(12.5)).unwrap();
        assert!((b - a - 12.5).abs() < 0.25, "{a} vs {b}");
    }
    #[test]
    fn onset_is_stable_under_noise() {
        let detector = EdgeDetector::new(EdgeConfig::default()).unwrap();
        let clean = detector.locate(&pulse()).unwrap();
        for seed in [11, 12, 13, 14] {
            let mut samples = SyntheticPulse::default().samples(2000, 1.0);
            add_noise(&mut samples, 0.002, seed);
            let wf = Waveform::new(samples, 0.0, 1.0).unwrap();
            let edge = detector.locate(&wf).unwrap();
            assert!((edge - clean).abs() < 1.0, "seed {seed}: {edge} vs {clean}");
        }
    }
    #[test]
    fn flat_record_has_no_edge() {
        let wf = Waveform::new(vec![0.3; 500], 0.0, 1.0).unwrap();
        let detector = EdgeDetector::new(EdgeConfig::default()).unwrap();
        assert_eq!(detector.locate(&wf), None);
    }
    #[test]
    fn rejects_invalid_configuration() {
        let bad_filter = EdgeConfig {
            derivative_filter: crate::analysis::config::FilterSpec::savitzky_golay(1, 3, 3),
            ..EdgeConfig::default()
        };
        assert!(EdgeDetector::new(bad_filter).is_err());
        let bad_samples = EdgeConfig {
            refine_samples: 2,
            ..EdgeConfig::default()
        };
        assert!(EdgeDetector::new(bad_samples).is_err());
    }
    #[test]
    fn stage_helpers_on_sampled_curves() {
        let dy = [1.0, 2.0, 1.0, -1.0, -2.0];
        assert_eq!(find_local_max_after(&dy, 0), 2);
        assert_eq!(find_local_max_after(&[1.0, 1.0, 1.0], 0), 2);
        assert_eq!(find_local_max_after(&[-1.0, -0.5, 0.5], 0), 1);
        let ddy = [0.5, 1.0, 0.2, -0.3, -1.0];
        assert_eq!(find_preceding_sign_change(&ddy, 4), Some(3));
        assert_eq!(find_preceding_sign_change(&[-1.0, -1.0], 1), None);
        assert_eq!(max_curvature_in_range(&ddy, 0, 3), 1);
        assert_eq!(max_curvature_in_range(&ddy, 2, 2), 2);
        // straight line y = t - 2 sampled at unit spacing; baseline is y[0] = -2
        let y: Vec<f64> = (0..10).map(|i| i as f64 - 2.0).collect();
        let slope = vec![1.0; 10];
        assert_eq!(tangent_zero_crossing(&y, &slope, 6, 2, 1.0), 0);
        assert_eq!(tangent_zero_crossing(&y, &slope, 6, 2, 2.0), 3);
    }
}
