// src/analysis/mod.rs
pub mod breakdown;
pub mod config;
pub mod deviation;
pub mod edge;
pub mod error;
pub mod filter;
pub mod jitter;
pub mod pulse;
pub mod rate;
pub mod spline;
pub mod synth;
pub mod waveform;
// flat re-exports for callers of the library
pub use breakdown::{breakdown_position, BreakdownLocalizer, BreakdownLocation, SignalPath};
pub use config::{
    DeviationConfig, EdgeConfig, FiducialWindow, FilterKind, FilterSpec, JitterConfig, LocalizerConfig,
    PulseConfig, RateConfig,
};
pub use deviation::{DeviationDetector, DeviationPoint};
pub use edge::EdgeDetector;
pub use error::AnalysisError;
pub use filter::{linspace, FilterKernel, SignalFilter};
pub use jitter::{JitterEstimate, JitterEstimator};
pub use pulse::{signal_stats, PulseShape, PulseShapeEvaluator};
pub use rate::{BreakdownRateCurve, BreakdownRateEstimator, PulseCountSeries, RateMethod, RatePoint};
pub use spline::{Boundary, CubicSpline, SplineBoundary};
pub use synth::SyntheticPulse;
pub use waveform::{EventMeta, Waveform};
