use log::debug;
use serde::{Deserialize, Serialize};
use crate::analysis::config::{check_fraction, check_samples, DeviationConfig};
use crate::analysis::error::AnalysisError;
use crate::analysis::filter::{linspace, SignalFilter};
use crate::analysis::waveform::Waveform;
/// Time at which two aligned records start to differ.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeviationPoint {
    At(f64),
    /// The difference never leaves the coarse noise band.
    InNoise,
    /// The difference is significant but no sustained onset could be isolated.
    NotFound,
}
impl DeviationPoint {
    pub fn time(&self) -> Option<f64> {
        match self {
            DeviationPoint::At(t) => Some(*t),
            _ => None,
        }
    }
}
/// Coarse-to-fine search for the first divergence between a record and its reference.
#[derive(Clone, Debug)]
pub struct DeviationDetector {
    config: DeviationConfig,
    signal: SignalFilter,
    difference: SignalFilter,
}
impl DeviationDetector {
    pub fn new(config: DeviationConfig) -> Result<Self, AnalysisError> {
        config.window.validate()?;
        check_fraction("coarse threshold", config.coarse_threshold)?;
        check_fraction("refine threshold", config.refine_threshold)?;
        check_fraction("deviation proximity", config.proximity)?;
        check_samples("coarse samples", config.coarse_samples, 3)?;
        // the second smoothing pass must leave at least two refined points
        let support = config.difference_filter.nl + config.difference_filter.nr;
        check_samples("refine samples", config.refine_samples, (support + 2).max(3))?;
        check_samples("coarse run", config.coarse_run, 1)?;
        check_samples("refine run", config.refine_run, 1)?;
        Ok(Self {
            signal: SignalFilter::new(config.signal_filter, 0)?,
            difference: SignalFilter::new(config.difference_filter, 0)?,
            config,
        })
    }
    pub fn config(&self) -> &DeviationConfig {
        &self.config
    }
    /// `b` is moved by `-jitter` before comparison; pass `0.0` for pre-aligned records.
    pub fn locate(&self, a: &Waveform, b: &Waveform, jitter: f64) -> DeviationPoint {
        let b = b.shifted(-jitter);
        let (t0, t1) = a.fiducial(&self.config.window);
        let span = a.span(t0, t1).max(b.span(t0, t1));
        let coarse_level = self.config.coarse_threshold * span;
        let grid = linspace(t0, t1, self.config.coarse_samples);
        let diff = match self.difference_on(a, &b, &grid) {
            Ok(diff) => diff,
            Err(err) => {
                debug!("deviation: cannot resample window [{t0}, {t1}]: {err}");
                return DeviationPoint::NotFound;
            }
        };
        let peak = diff.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if peak < coarse_level {
            debug!("deviation: peak difference {peak} below noise level {coarse_level}");
            return DeviationPoint::InNoise;
        }
        let Some(coarse) = first_sustained_exceedance(&grid, &diff, coarse_level, self.config.coarse_run) else {
            debug!("deviation: no run of {} samples above {coarse_level}", self.config.coarse_run);
            return DeviationPoint::NotFound;
        };
        let (lb, ub) = a.bounds();
        let half = 0.5 * self.config.proximity * (ub - lb);
        let grid = linspace((coarse - half).max(lb), (coarse + half).min(ub), self.config.refine_samples);
        let diff = match self.difference_on(a, &b, &grid) {
            Ok(diff) => diff,
            Err(err) => {
                debug!("deviation: cannot resample refine window: {err}");
                return DeviationPoint::NotFound;
            }
        };
        // second smoothing pass keeps the valid part only, realign it onto the grid
        let unit = grid.get(1).map_or(1.0, |t| t - grid[0]);
        let smoothed = self.difference.filter(&diff, unit);
        let offset = self.difference.kernel(unit).nl();
        let times = &grid[offset.min(grid.len())..];
        let refine_level = self.config.refine_threshold * span;
        match last_quiet_crossing(times, &smoothed, refine_level, self.config.refine_run) {
            Some(t) => {
                debug!("deviation: span {span}, coarse {coarse}, refined {t}");
                DeviationPoint::At(t)
            }
            None => {
                debug!("deviation: coarse {coarse} but no quiet run below {refine_level}");
                DeviationPoint::NotFound
            }
        }
    }
    fn difference_on(&self, a: &Waveform, b: &Waveform, grid: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        let ya = self.signal.sample_at(a, grid)?;
        let yb = self.signal.sample_at(b, grid)?;
        Ok(ya.iter().zip(&yb).map(|(u, v)| u - v).collect())
    }
}
/// Start of the first run of `run` consecutive samples with `|y| > level`.
///
/// The time is interpolated against the preceding sample when that one is below
/// the level, otherwise the grid time of the run start is returned.
pub fn first_sustained_exceedance(t: &[f64], y: &[f64], level: f64, run: usize) -> Option<f64> {
    let n = y.len().min(t.len());
    if run == 0 || n < run {
        return None;
    }
    let i = (0..=n - run).find(|&i| y[i..i + run].iter().all(|v| v.abs() > level))?;
    if i == 0 {
        return Some(t[0]);
    }
    let (prev, cur) = (y[i - 1].abs(), y[i].abs());
    if prev >= level || cur == prev {
        return Some(t[i]);
    }
    Some(t[i] - (cur - level) / (cur - prev) * (t[i] - t[i - 1]))
}
/// Onset of the divergence seen from the middle of a refined window.
///
/// From the centre, moves forward to the first sample with `|y| >= level`, then walks
/// back to the nearest index whose trailing `run` samples are all below the level,
/// and interpolates the crossing between that index and its successor.
pub fn last_quiet_crossing(t: &[f64], y: &[f64], level: f64, run: usize) -> Option<f64> {
    let n = y.len().min(t.len());
    if n < 2 || run == 0 {
        return None;
    }
    let start = (n / 2..n).find(|&i| y[i].abs() >= level)?;
    let i = (run - 1..=start.min(n - 2))
        .rev()
        .find(|&i| y[i + 1 - run..=i].iter().all(|v| v.abs() < level))?;
    let (quiet, loud) = (y[i].abs(), y[i + 1].abs());
    if loud == quiet {
        return Some(t[i + 1]);
    }
    Some(t[i + 1] - (loud - level) / (loud - quiet).abs() * (t[i + 1] - t[i]))
}
