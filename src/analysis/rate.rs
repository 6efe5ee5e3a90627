use log::debug;
use serde::{Deserialize, Serialize};
use crate::analysis::config::{check_fraction, check_samples, RateConfig};
use crate::analysis::error::AnalysisError;
/// Accumulated pulse counter at each recorded breakdown, non-decreasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PulseCountRecord")]
pub struct PulseCountSeries {
    counts: Vec<u64>,
}
#[derive(Deserialize)]
struct PulseCountRecord {
    counts: Vec<u64>,
}
impl TryFrom<PulseCountRecord> for PulseCountSeries {
    type Error = AnalysisError;
    fn try_from(record: PulseCountRecord) -> Result<Self, Self::Error> {
        PulseCountSeries::new(record.counts)
    }
}
impl PulseCountSeries {
    /// Ties are kept, decreasing counters are rejected.
    pub fn new(counts: Vec<u64>) -> Result<Self, AnalysisError> {
        if counts.len() < 2 {
            return Err(AnalysisError::TooFewEvents {
                required: 1,
                actual: counts.len(),
            });
        }
        if let Some(i) = counts.windows(2).position(|w| w[1] < w[0]) {
            return Err(AnalysisError::UnsortedPulseCounts {
                index: i + 1,
                previous: counts[i],
                value: counts[i + 1],
            });
        }
        Ok(Self { counts })
    }
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
    pub fn len(&self) -> usize {
        self.counts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
    pub fn first(&self) -> u64 {
        self.counts[0]
    }
    pub fn last(&self) -> u64 {
        self.counts[self.counts.len() - 1]
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateMethod {
    /// `step` events divided by the counts they took.
    FixedStep { step: usize },
    /// Events per equal-width pulse-count bucket.
    FixedBucket,
    /// Causal Gaussian-weighted average of past local rates.
    MovingWindow,
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub count: u64,
    /// Breakdowns per pulse.
    pub rate: f64,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRateCurve {
    pub points: Vec<RatePoint>,
}
impl BreakdownRateCurve {
    pub fn counts(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.count).collect()
    }
    pub fn rates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.rate).collect()
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
#[derive(Clone, Debug)]
pub struct BreakdownRateEstimator {
    config: RateConfig,
}
impl BreakdownRateEstimator {
    pub fn new(config: RateConfig) -> Result<Self, AnalysisError> {
        check_samples("rate samples", config.samples, 1)?;
        check_fraction("sigma fraction", config.sigma_fraction)?;
        check_fraction("sigma cutoff", config.sigma_cutoff)?;
        Ok(Self { config })
    }
    pub fn config(&self) -> &RateConfig {
        &self.config
    }
    pub fn estimate(&self, series: &PulseCountSeries, method: RateMethod) -> Result<BreakdownRateCurve, AnalysisError> {
        let points = match method {
            RateMethod::FixedStep { step } => fixed_step(series.counts(), step)?,
            RateMethod::FixedBucket => self.fixed_bucket(series.counts())?,
            RateMethod::MovingWindow => self.moving_window(series.counts())?,
        };
        debug!("rate: {method:?} over {} events -> {} points", series.len(), points.len());
        Ok(BreakdownRateCurve { points })
    }
    /// Every event after the first lands in the bucket of its counter together with the
    /// whole gap back to its predecessor, even when that gap starts in an earlier
    /// bucket. Clipping gaps at the bucket edges would inflate the rate of any
    /// bucket whose first event sits right after an edge.
    fn fixed_bucket(&self, counts: &[u64]) -> Result<Vec<RatePoint>, AnalysisError> {
        let (min, range) = count_range(counts)?;
        let buckets = self.config.samples;
        let width = range as f64 / buckets as f64;
        let mut events = vec![0usize; buckets];
        let mut elapsed = vec![0u64; buckets];
        for pair in counts.windows(2) {
            let bucket = (((pair[1] - min) as f64 / width).floor() as usize).min(buckets - 1);
            events[bucket] += 1;
            elapsed[bucket] += pair[1] - pair[0];
        }
        Ok((0..buckets)
            .map(|b| RatePoint {
                count: (min as f64 + (b as f64 + 0.5) * width).round() as u64,
                rate: if events[b] == 0 {
                    0.0
                } else {
                    events[b] as f64 / elapsed[b] as f64
                },
            })
            .collect())
    }
    /// Gaussian-weighted average of `k / (v - c[j - k])` over the events before the
    /// resample point `v`, in unsigned counter arithmetic. The weight distance is
    /// taken from the first event after `v`, the very first event never enters a
    /// window, and a point without usable neighbours yields NaN.
    fn moving_window(&self, counts: &[u64]) -> Result<Vec<RatePoint>, AnalysisError> {
        let (min, range) = count_range(counts)?;
        let samples = self.config.samples;
        let increment = range / samples as u64;
        let sigma = (range as f64 * self.config.sigma_fraction) as u64;
        let cutoff = (range as f64 * self.config.sigma_fraction * self.config.sigma_cutoff) as u64;
        if sigma == 0 {
            return Err(AnalysisError::InvalidParameter {
                what: "gaussian width in pulse counts",
                value: range as f64 * self.config.sigma_fraction,
            });
        }
        let two_sigma_sq = 2.0 * (sigma as f64).powi(2);
        let mut points = Vec::with_capacity(samples);
        let mut value = min;
        for _ in 0..samples {
            let (nearest, distance) = nearest_event(counts, value);
            let reference = value.wrapping_sub(distance);
            let lower = if counts[0].saturating_add(cutoff) < value {
                value - cutoff
            } else {
                counts[0]
            };
            let mut past = 0;
            while past + 1 < nearest && counts[nearest - past - 1] >= lower {
                past += 1;
            }
            let (mut weighted, mut total) = (0.0, 0.0);
            if value > counts[nearest] {
                weighted += 1.0 / (value - counts[nearest]) as f64;
                total += 1.0;
            }
            for k in 1..=past {
                let event = counts[nearest - k];
                if value > event {
                    let d = reference.wrapping_sub(event) as f64;
                    let w = (-(d * d) / two_sigma_sq).exp();
                    weighted += w * k as f64 / (value - event) as f64;
                    total += w;
                }
            }
            points.push(RatePoint {
                count: value,
                rate: weighted / total,
            });
            value += increment;
        }
        Ok(points)
    }
}
/// `step / (c[i] - c[i - step])`, the first `step` points repeat `rate[step]`.
fn fixed_step(counts: &[u64], step: usize) -> Result<Vec<RatePoint>, AnalysisError> {
    if step == 0 || counts.len() <= step {
        return Err(AnalysisError::TooFewEvents {
            required: step.max(1),
            actual: counts.len(),
        });
    }
    let mut rates: Vec<f64> = (0..counts.len())
        .map(|i| {
            if i < step {
                0.0
            } else {
                step as f64 / (counts[i] - counts[i - step]) as f64
            }
        })
        .collect();
    let boundary = rates[step];
    rates[..step].iter_mut().for_each(|r| *r = boundary);
    Ok(counts
        .iter()
        .zip(rates)
        .map(|(&count, rate)| RatePoint { count, rate })
        .collect())
}
fn count_range(counts: &[u64]) -> Result<(u64, u64), AnalysisError> {
    let (min, max) = (counts[0], counts[counts.len() - 1]);
    if max == min {
        return Err(AnalysisError::InvalidParameter {
            what: "pulse count range",
            value: 0.0,
        });
    }
    Ok((min, max - min))
}
/// Nearest event to `value` and the unsigned distance used for the Gaussian
/// reference, see [`BreakdownRateEstimator::moving_window`].
fn nearest_event(counts: &[u64], value: u64) -> (usize, u64) {
    let n = counts.len();
    if counts[n - 1] < value {
        return (n - 1, value - counts[n - 1]);
    }
    match (1..n).find(|&i| value < counts[i]) {
        Some(i) => {
            let nearest = if counts[i] - value < value - counts[i - 1] { i } else { i - 1 };
            (nearest, value.wrapping_sub(counts[i]))
        }
        None => (0, 0),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn estimator(samples: usize, sigma_fraction: f64, sigma_cutoff: f64) -> BreakdownRateEstimator {
        BreakdownRateEstimator::new(RateConfig {
            samples,
            sigma_fraction,
            sigma_cutoff,
        })
        .unwrap()
    }
    #[test]
    fn series_policy() {
        assert!(PulseCountSeries::new(vec![1, 2, 2, 5]).is_ok());
        assert_eq!(
            PulseCountSeries::new(vec![1, 4, 3]),
            Err(AnalysisError::UnsortedPulseCounts {
                index: 2,
                previous: 4,
                value: 3
            })
        );
        assert!(PulseCountSeries::new(vec![7]).is_err());
    }
    #[test]
    fn deserialized_series_is_validated() {
        let series: PulseCountSeries = serde_json::from_str(r#"{"counts":[3,5,5,9]}"#).unwrap();
        assert_eq!(series.counts(), &[3, 5, 5, 9]);
        assert!(serde_json::from_str::<PulseCountSeries>(r#"{"counts":[10,5,3]}"#).is_err());
        assert!(serde_json::from_str::<PulseCountSeries>(r#"{"counts":[]}"#).is_err());
    }
    #[test]
    fn fixed_step_on_constant_spacing() {
        let series = PulseCountSeries::new((0..20).map(|i| 100 + 50 * i).collect()).unwrap();
        let curve = estimator(10, 0.1, 3.0)
            .estimate(&series, RateMethod::FixedStep { step: 3 })
            .unwrap();
        assert_eq!(curve.len(), 20);
        assert_eq!(curve.counts(), series.counts().to_vec());
        assert!(curve.rates().iter().all(|r| (r - 0.02).abs() < 1e-15));
    }
    #[test]
    fn fixed_step_replicates_first_full_window() {
        let series = PulseCountSeries::new(vec![0, 1, 3, 7, 15]).unwrap();
        let rates = estimator(10, 0.1, 3.0)
            .estimate(&series, RateMethod::FixedStep { step: 2 })
            .unwrap()
            .rates();
        assert_eq!(rates, vec![2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0, 2.0 / 6.0, 2.0 / 12.0]);
        let too_short = estimator(10, 0.1, 3.0).estimate(&series, RateMethod::FixedStep { step: 5 });
        assert!(matches!(too_short, Err(AnalysisError::TooFewEvents { .. })));
    }
    #[test]
    fn fixed_bucket_counts_events_per_bucket() {
        let series = PulseCountSeries::new((0..=10).map(|i| 10 * i).collect()).unwrap();
        let curve = estimator(5, 0.1, 3.0).estimate(&series, RateMethod::FixedBucket).unwrap();
        assert_eq!(curve.counts(), vec![10, 30, 50, 70, 90]);
        assert!(curve.rates().iter().all(|r| (r - 0.1).abs() < 1e-15));
    }
    #[test]
    fn fixed_bucket_charges_whole_gaps() {
        // gaps straddle every bucket edge, the rate stays the true spacing
        let series = PulseCountSeries::new((0..=10).map(|i| 3 + 10 * i).collect()).unwrap();
        let rates = estimator(4, 0.1, 3.0)
            .estimate(&series, RateMethod::FixedBucket)
            .unwrap()
            .rates();
        assert_eq!(rates.len(), 4);
        assert!(rates.iter().all(|r| (r - 0.1).abs() < 1e-15), "{rates:?}");
    }
    #[test]
    fn fixed_bucket_reports_zero_for_empty_buckets() {
        let series = PulseCountSeries::new(vec![0, 1, 2, 100]).unwrap();
        let rates = estimator(4, 0.1, 3.0)
            .estimate(&series, RateMethod::FixedBucket)
            .unwrap()
            .rates();
        assert_eq!(rates, vec![1.0, 0.0, 0.0, 1.0 / 98.0]);
    }
    #[test]
    fn moving_window_matches_reference_output() {
        let series = PulseCountSeries::new(vec![0, 9, 13, 24, 33, 40]).unwrap();
        let curve = estimator(4, 0.25, 3.0).estimate(&series, RateMethod::MovingWindow).unwrap();
        assert_eq!(curve.counts(), vec![0, 10, 20, 30]);
        let rates = curve.rates();
        assert!(rates[0].is_nan());
        assert!((rates[1] - 1.0).abs() < 1e-15);
        let (a, b) = ((-0.605f64).exp(), (-1.125f64).exp());
        let expected = (a / 7.0 + b * 2.0 / 11.0) / (a + b);
        assert!((rates[2] - expected).abs() < 1e-14);
        let (a, b, c) = ((-0.405f64).exp(), (-2.0f64).exp(), (-2.88f64).exp());
        let expected = (a / 6.0 + b * 2.0 / 17.0 + c * 3.0 / 21.0) / (a + b + c);
        assert!((rates[3] - expected).abs() < 1e-14);
    }
    #[test]
    fn moving_window_on_uniform_spacing() {
        let series = PulseCountSeries::new((0..=100).map(|i| 10 * i).collect()).unwrap();
        let curve = estimator(50, 0.1, 3.0).estimate(&series, RateMethod::MovingWindow).unwrap();
        assert_eq!(curve.len(), 50);
        assert!(curve.points[0].rate.is_nan());
        for p in &curve.points[1..] {
            assert!((p.rate - 0.1).abs() < 1e-12, "{p:?}");
        }
    }
    #[test]
    fn degenerate_inputs_are_errors() {
        let flat = PulseCountSeries::new(vec![5, 5, 5]).unwrap();
        assert!(estimator(10, 0.1, 3.0).estimate(&flat, RateMethod::MovingWindow).is_err());
        assert!(estimator(10, 0.1, 3.0).estimate(&flat, RateMethod::FixedBucket).is_err());
        let short = PulseCountSeries::new(vec![0, 3]).unwrap();
        assert!(estimator(10, 0.1, 3.0).estimate(&short, RateMethod::MovingWindow).is_err());
        assert!(BreakdownRateEstimator::new(RateConfig {
            samples: 0,
            ..RateConfig::default()
        })
        .is_err());
    }
    #[test]
    fn curve_serializes_to_json() {
        let series = PulseCountSeries::new(vec![0, 10, 20, 30]).unwrap();
        let curve = estimator(10, 0.1, 3.0)
            .estimate(&series, RateMethod::FixedStep { step: 1 })
            .unwrap();
        let text = serde_json::to_string(&curve).unwrap();
        let back: BreakdownRateCurve = serde_json::from_str(&text).unwrap();
        assert_eq!(back, curve);
    }
}
