//! Breakdown location and breakdown rate analysis for RF pulse records.
//!
//! Detectors work on immutable [`Waveform`] snapshots and are configured once
//! through serde-friendly config structs; see [`BreakdownLocalizer`] and
//! [`BreakdownRateEstimator`] for the two entry points.
pub mod analysis;
pub use analysis::{
    AnalysisError, BreakdownLocalizer, BreakdownLocation, BreakdownRateCurve, BreakdownRateEstimator,
    LocalizerConfig, PulseCountSeries, RateConfig, RateMethod, SignalPath, Waveform,
};
