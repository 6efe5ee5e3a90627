use serde::{Deserialize, Serialize};
use crate::analysis::error::AnalysisError;
/// Sub-interval of a record expressed as fractions of its time span.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiducialWindow {
    pub min: f64,
    pub max: f64,
}
impl FiducialWindow {
    pub fn new(min: f64, max: f64) -> Result<Self, AnalysisError> {
        let window = Self { min, max };
        window.validate()?;
        Ok(window)
    }
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if in_unit(self.min) && in_unit(self.max) && self.min < self.max {
            Ok(())
        } else {
            Err(AnalysisError::InvalidWindow {
                min: self.min,
                max: self.max,
            })
        }
    }
}
impl Default for FiducialWindow {
    fn default() -> Self {
        FiducialWindow { min: 0.01, max: 0.99 }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Raw samples; derivatives fall back to central differences.
    None,
    MovingAverage,
    SavitzkyGolay,
}
/// Smoothing kernel shape: polynomial order and the left/right support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub order: usize,
    pub nl: usize,
    pub nr: usize,
}
impl FilterSpec {
    pub fn none() -> Self {
        Self {
            kind: FilterKind::None,
            order: 0,
            nl: 0,
            nr: 0,
        }
    }
    pub fn moving_average(nl: usize, nr: usize) -> Self {
        Self {
            kind: FilterKind::MovingAverage,
            order: 0,
            nl,
            nr,
        }
    }
    pub fn savitzky_golay(order: usize, nl: usize, nr: usize) -> Self {
        Self {
            kind: FilterKind::SavitzkyGolay,
            order,
            nl,
            nr,
        }
    }
}
impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec::savitzky_golay(3, 7, 7)
    }
}
/// Threshold levels used for the plain rising/falling edges of a pulse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    pub window: FiducialWindow,
    pub threshold: f64,
}
impl Default for PulseConfig {
    fn default() -> Self {
        PulseConfig {
            window: FiducialWindow::default(),
            threshold: 0.9,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub window: FiducialWindow,
    /// Relative level of the coarse threshold crossing.
    pub threshold: f64,
    /// Width of the refinement window as a fraction of the record span.
    pub proximity: f64,
    pub refine_samples: usize,
    /// Half-width, in grid samples, of the slope average at the inflection.
    pub slope_window: usize,
    pub signal_filter: FilterSpec,
    pub derivative_filter: FilterSpec,
}
impl Default for EdgeConfig {
    fn default() -> Self {
        EdgeConfig {
            window: FiducialWindow::default(),
            threshold: 0.6,
            proximity: 0.03,
            refine_samples: 512,
            slope_window: 8,
            signal_filter: FilterSpec::savitzky_golay(3, 7, 7),
            derivative_filter: FilterSpec::savitzky_golay(3, 15, 15),
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    pub window: FiducialWindow,
    pub threshold: f64,
    /// Largest accepted |delay| as a fraction of the record span.
    pub tolerance: f64,
    pub samples: usize,
    pub filter: FilterSpec,
}
impl Default for JitterConfig {
    fn default() -> Self {
        JitterConfig {
            window: FiducialWindow { min: 0.01, max: 0.4 },
            threshold: 0.3,
            tolerance: 0.4,
            samples: 10001,
            filter: FilterSpec::savitzky_golay(3, 7, 7),
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviationConfig {
    pub window: FiducialWindow,
    /// Coarse threshold, fraction of the larger raw signal span.
    pub coarse_threshold: f64,
    /// Fine threshold, fraction of the larger raw signal span.
    pub refine_threshold: f64,
    pub proximity: f64,
    pub coarse_samples: usize,
    pub refine_samples: usize,
    /// Consecutive samples that must exceed the coarse threshold.
    pub coarse_run: usize,
    /// Consecutive samples that must stay below the fine threshold.
    pub refine_run: usize,
    pub signal_filter: FilterSpec,
    pub difference_filter: FilterSpec,
}
impl Default for DeviationConfig {
    fn default() -> Self {
        DeviationConfig {
            window: FiducialWindow::default(),
            coarse_threshold: 0.1,
            refine_threshold: 0.01,
            proximity: 0.1,
            coarse_samples: 8196,
            refine_samples: 1024,
            coarse_run: 32,
            refine_run: 8,
            signal_filter: FilterSpec::savitzky_golay(3, 7, 7),
            difference_filter: FilterSpec::savitzky_golay(3, 20, 20),
        }
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizerConfig {
    pub pulse: PulseConfig,
    pub jitter: JitterConfig,
    pub edge: EdgeConfig,
    pub deviation: DeviationConfig,
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    /// Resample points (moving window) or buckets (fixed bucket).
    pub samples: usize,
    /// Gaussian width as a fraction of the covered count range.
    pub sigma_fraction: f64,
    /// Window cut-off in units of the Gaussian width.
    pub sigma_cutoff: f64,
}
impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            samples: 1001,
            sigma_fraction: 0.1,
            sigma_cutoff: 3.0,
        }
    }
}
pub(crate) fn check_fraction(what: &'static str, value: f64) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidParameter { what, value })
    }
}
pub(crate) fn check_samples(what: &'static str, actual: usize, minimum: usize) -> Result<(), AnalysisError> {
    if actual >= minimum {
        Ok(())
    } else {
        Err(AnalysisError::InvalidSamples {
            what,
            minimum,
            actual,
        })
    }
}
