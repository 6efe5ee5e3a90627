use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("filter support too small: order {order} needs nl + nr >= order, got nl = {nl}, nr = {nr}")]
    InvalidFilterSupport { order: usize, nl: usize, nr: usize },
    #[error("derivative order {derivative} exceeds polynomial order {order}")]
    DerivativeTooHigh { derivative: usize, order: usize },
    #[error("derivative order {derivative} is not available for the pass-through kernel")]
    UnsupportedDerivative { derivative: usize },
    #[error("normal equations are singular")]
    SingularSystem,
    #[error("spline needs at least 3 nodes, got {count}")]
    TooFewNodes { count: usize },
    #[error("node count mismatch: {x} abscissae, {y} ordinates")]
    NodeLengthMismatch { x: usize, y: usize },
    #[error("spline nodes must be strictly ascending (violated at index {index})")]
    UnsortedNodes { index: usize },
    #[error("waveform has no samples")]
    EmptyWaveform,
    #[error("sample increment must be finite and greater than zero, got {0}")]
    InvalidIncrement(f64),
    #[error("fiducial window [{min}, {max}] is not a sub-interval of [0, 1]")]
    InvalidWindow { min: f64, max: f64 },
    #[error("{what} must be at least {minimum}, got {actual}")]
    InvalidSamples {
        what: &'static str,
        minimum: usize,
        actual: usize,
    },
    #[error("{what} must be finite and positive, got {value}")]
    InvalidParameter { what: &'static str, value: f64 },
    #[error("pulse counts must be non-decreasing (count {value} at index {index} follows {previous})")]
    UnsortedPulseCounts {
        index: usize,
        previous: u64,
        value: u64,
    },
    #[error("rate estimate needs more than {required} events, got {actual}")]
    TooFewEvents { required: usize, actual: usize },
    #[error("window keeps {available} samples, filter needs more than {required}")]
    WindowTooShort { available: usize, required: usize },
}
