use log::trace;
use ndarray::{Array1, Array2};
use crate::analysis::config::{FilterKind, FilterSpec};
use crate::analysis::error::AnalysisError;
use crate::analysis::spline::CubicSpline;
use crate::analysis::waveform::Waveform;
/// Finite correlation kernel: `out[j] = sum_k c_k * y[j + nl + k]` for `k` in `-nl..=nr`.
///
/// Coefficients already include the `d! / increment^d` derivative scaling.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterKernel {
    coefficients: Vec<f64>,
    nl: usize,
    nr: usize,
    derivative: usize,
}
impl FilterKernel {
    pub fn build(spec: &FilterSpec, derivative: usize, increment: f64) -> Result<Self, AnalysisError> {
        if !(increment.is_finite() && increment > 0.0) {
            return Err(AnalysisError::InvalidIncrement(increment));
        }
        let unit = match spec.kind {
            FilterKind::None => Self::central_difference(derivative)?,
            FilterKind::MovingAverage => {
                if derivative > 0 {
                    return Err(AnalysisError::DerivativeTooHigh { derivative, order: 0 });
                }
                Self::moving_average(spec.nl, spec.nr)
            }
            FilterKind::SavitzkyGolay => Self::savitzky_golay(spec.order, spec.nl, spec.nr, derivative)?,
        };
        trace!(
            "built {:?} kernel (order {}, nl {}, nr {}, derivative {})",
            spec.kind,
            spec.order,
            unit.nl,
            unit.nr,
            derivative
        );
        Ok(unit.rescaled(increment))
    }
    /// Uniform weights, identical to a Savitzky–Golay kernel of order zero.
    pub fn moving_average(nl: usize, nr: usize) -> Self {
        let width = nl + nr + 1;
        Self {
            coefficients: vec![1.0 / width as f64; width],
            nl,
            nr,
            derivative: 0,
        }
    }
    pub fn passthrough() -> Self {
        Self {
            coefficients: vec![1.0],
            nl: 0,
            nr: 0,
            derivative: 0,
        }
    }
    /// Kernel for unit sample spacing.
    pub fn savitzky_golay(order: usize, nl: usize, nr: usize, derivative: usize) -> Result<Self, AnalysisError> {
        if nl + nr < order {
            return Err(AnalysisError::InvalidFilterSupport { order, nl, nr });
        }
        if derivative > order {
            return Err(AnalysisError::DerivativeTooHigh { derivative, order });
        }
        let size = order + 1;
        let offsets: Vec<f64> = (-(nl as i64)..=nr as i64).map(|k| k as f64).collect();
        // normal equations of the least-squares polynomial fit over the support
        let mut normal = Array2::<f64>::zeros((size, size));
        for i in 0..size {
            for j in 0..size {
                normal[[i, j]] = offsets.iter().map(|k| k.powi((i + j) as i32)).sum();
            }
        }
        let mut rhs = Array1::<f64>::zeros(size);
        rhs[derivative] = 1.0;
        let solution = solve_linear(normal, rhs)?;
        let factorial: f64 = (1..=derivative).map(|v| v as f64).product();
        let coefficients = offsets
            .iter()
            .map(|k| factorial * solution.iter().enumerate().map(|(p, x)| x * k.powi(p as i32)).sum::<f64>())
            .collect();
        Ok(Self {
            coefficients,
            nl,
            nr,
            derivative,
        })
    }
    fn central_difference(derivative: usize) -> Result<Self, AnalysisError> {
        let coefficients = match derivative {
            0 => return Ok(Self::passthrough()),
            1 => vec![-0.5, 0.0, 0.5],
            2 => vec![1.0, -2.0, 1.0],
            _ => return Err(AnalysisError::UnsupportedDerivative { derivative }),
        };
        Ok(Self {
            coefficients,
            nl: 1,
            nr: 1,
            derivative,
        })
    }
    fn rescaled(mut self, increment: f64) -> Self {
        let scale = increment.powi(self.derivative as i32);
        if scale != 1.0 {
            self.coefficients.iter_mut().for_each(|c| *c /= scale);
        }
        self
    }
    /// Coefficient for offsets `-nl..=nr`, in that order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
    pub fn nl(&self) -> usize {
        self.nl
    }
    pub fn nr(&self) -> usize {
        self.nr
    }
    pub fn derivative(&self) -> usize {
        self.derivative
    }
    /// Valid part only: output `j` belongs to input index `j + nl`.
    pub fn apply(&self, samples: &[f64]) -> Vec<f64> {
        let width = self.coefficients.len();
        if samples.len() < width {
            return Vec::new();
        }
        samples
            .windows(width)
            .map(|w| w.iter().zip(&self.coefficients).map(|(y, c)| y * c).sum())
            .collect()
    }
}
/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, AnalysisError> {
    let n = b.len();
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r, &s| a[[r, col]].abs().total_cmp(&a[[s, col]].abs()))
            .unwrap_or(col);
        if !(a[[pivot, col]].abs() > scale * 1e-14) {
            return Err(AnalysisError::SingularSystem);
        }
        if pivot != col {
            for j in 0..n {
                a.swap([col, j], [pivot, j]);
            }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|j| a[[row, j]] * x[j]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(x)
}
/// Smoothing (or differentiating) filter bound to one kernel shape.
#[derive(Clone, Debug)]
pub struct SignalFilter {
    spec: FilterSpec,
    unit: FilterKernel,
}
impl SignalFilter {
    pub fn new(spec: FilterSpec, derivative: usize) -> Result<Self, AnalysisError> {
        let unit = FilterKernel::build(&spec, derivative, 1.0)?;
        Ok(Self { spec, unit })
    }
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
    pub fn derivative(&self) -> usize {
        self.unit.derivative
    }
    pub fn kernel(&self, increment: f64) -> FilterKernel {
        self.unit.clone().rescaled(increment)
    }
    pub fn filter(&self, samples: &[f64], increment: f64) -> Vec<f64> {
        self.kernel(increment).apply(samples)
    }
    /// Filtered signal evaluated at arbitrary `times`.
    ///
    /// The record is cut around the requested span with enough margin for the kernel,
    /// filtered, and interpolated with a natural cubic spline. Times outside the
    /// filtered range are clamped onto it.
    pub fn sample_at(&self, waveform: &Waveform, times: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        let dt = waveform.increment();
        let (lb, ub) = waveform.bounds();
        let first = times.iter().copied().fold(f64::INFINITY, f64::min);
        let last = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (nl, nr) = (self.unit.nl, self.unit.nr);
        let lo = (first - 2.0 * (nl + 1) as f64 * dt).max(lb);
        let hi = (last + 2.0 * (nr + 1) as f64 * dt).min(ub);
        let range = waveform.index_range(lo, hi);
        let filtered = self.filter(&waveform.samples()[range.clone()], dt);
        if filtered.len() < 3 {
            return Err(AnalysisError::WindowTooShort {
                available: range.len(),
                required: nl + nr + 2,
            });
        }
        let nodes: Vec<f64> = (0..filtered.len())
            .map(|j| waveform.time_at(range.start + nl + j))
            .collect();
        let (x0, x1) = (nodes[0], nodes[nodes.len() - 1]);
        let spline = CubicSpline::new(nodes, filtered)?;
        Ok(times.iter().map(|&t| spline.eval(t.clamp(x0, x1))).collect())
    }
}
/// `n` evenly spaced points from `a` to `b` inclusive.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n).map(|i| a + i as f64 * step).collect()
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn cubic(t: f64) -> f64 {
        t * t * t - 2.0 * t + 1.0
    }
    #[test]
    fn smoothing_weights_sum_to_one() {
        for (order, nl, nr) in [(3, 7, 7), (2, 3, 5), (3, 20, 20), (0, 4, 4)] {
            let k = FilterKernel::savitzky_golay(order, nl, nr, 0).unwrap();
            assert_eq!(k.coefficients().len(), nl + nr + 1);
            let sum: f64 = k.coefficients().iter().sum();
            assert!((sum - 1.0).abs() < 1e-10, "order {order}: {sum}");
        }
    }
    #[test]
    fn order_zero_equals_moving_average() {
        let sg = FilterKernel::savitzky_golay(0, 3, 2, 0).unwrap();
        let ma = FilterKernel::moving_average(3, 2);
        for (a, b) in sg.coefficients().iter().zip(ma.coefficients()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    #[test]
    fn reproduces_polynomials_up_to_order() {
        let samples: Vec<f64> = (0..30).map(|i| cubic(i as f64 * 0.1)).collect();
        let kernel = FilterKernel::savitzky_golay(3, 4, 4, 0).unwrap();
        let out = kernel.apply(&samples);
        assert_eq!(out.len(), samples.len() - 8);
        for (j, v) in out.iter().enumerate() {
            assert!((v - samples[j + 4]).abs() < 1e-9);
        }
        // asymmetric support on a quadratic
        let quad: Vec<f64> = (0..20).map(|i| 0.5 * (i * i) as f64 - i as f64).collect();
        let kernel = FilterKernel::savitzky_golay(2, 2, 5, 0).unwrap();
        for (j, v) in kernel.apply(&quad).iter().enumerate() {
            assert!((v - quad[j + 2]).abs() < 1e-9);
        }
    }
    #[test]
    fn derivative_kernels_are_scaled_by_increment() {
        let dt = 0.5;
        let samples: Vec<f64> = (0..40).map(|i| cubic(i as f64 * dt)).collect();
        let spec = FilterSpec::savitzky_golay(3, 5, 5);
        let first = FilterKernel::build(&spec, 1, dt).unwrap().apply(&samples);
        let second = FilterKernel::build(&spec, 2, dt).unwrap().apply(&samples);
        for j in 0..first.len() {
            let t = (j + 5) as f64 * dt;
            assert!((first[j] - (3.0 * t * t - 2.0)).abs() < 1e-7);
            assert!((second[j] - 6.0 * t).abs() < 1e-7);
        }
    }
    #[test]
    fn invalid_shapes_are_rejected() {
        assert_eq!(
            FilterKernel::savitzky_golay(4, 1, 2, 0),
            Err(AnalysisError::InvalidFilterSupport { order: 4, nl: 1, nr: 2 })
        );
        assert_eq!(
            FilterKernel::savitzky_golay(2, 3, 3, 3),
            Err(AnalysisError::DerivativeTooHigh { derivative: 3, order: 2 })
        );
        assert!(SignalFilter::new(FilterSpec::moving_average(2, 2), 1).is_err());
        assert!(SignalFilter::new(FilterSpec::none(), 3).is_err());
        assert!(FilterKernel::build(&FilterSpec::default(), 0, 0.0).is_err());
    }
    #[test]
    fn passthrough_uses_central_differences() {
        let samples = [0.0, 1.0, 4.0, 9.0, 16.0];
        let smooth = SignalFilter::new(FilterSpec::none(), 0).unwrap();
        assert_eq!(smooth.filter(&samples, 1.0), samples.to_vec());
        let d1 = SignalFilter::new(FilterSpec::none(), 1).unwrap();
        assert_eq!(d1.filter(&samples, 1.0), vec![2.0, 4.0, 6.0]);
        let d2 = SignalFilter::new(FilterSpec::none(), 2).unwrap();
        assert_eq!(d2.filter(&samples, 0.5), vec![8.0, 8.0, 8.0]);
    }
    #[test]
    fn short_input_yields_empty_output() {
        let kernel = FilterKernel::moving_average(3, 3);
        assert!(kernel.apply(&[1.0; 6]).is_empty());
        assert_eq!(kernel.apply(&[1.0; 7]).len(), 1);
    }
    #[test]
    fn sample_at_resamples_the_smoothed_record() {
        let dt = 0.01;
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 * dt).sin()).collect();
        let wf = Waveform::new(samples, 0.0, dt).unwrap();
        let times = linspace(2.0, 4.0, 77);
        let smooth = SignalFilter::new(FilterSpec::savitzky_golay(3, 7, 7), 0).unwrap();
        let slope = SignalFilter::new(FilterSpec::savitzky_golay(3, 15, 15), 1).unwrap();
        let y = smooth.sample_at(&wf, &times).unwrap();
        let dy = slope.sample_at(&wf, &times).unwrap();
        for ((t, v), d) in times.iter().zip(&y).zip(&dy) {
            assert!((v - t.sin()).abs() < 1e-6);
            assert!((d - t.cos()).abs() < 1e-4);
        }
    }
    #[test]
    fn sample_at_rejects_records_shorter_than_kernel() {
        let wf = Waveform::new(vec![1.0; 10], 0.0, 1.0).unwrap();
        let smooth = SignalFilter::new(FilterSpec::savitzky_golay(3, 7, 7), 0).unwrap();
        assert!(matches!(
            smooth.sample_at(&wf, &[4.0, 5.0]),
            Err(AnalysisError::WindowTooShort { .. })
        ));
    }
    #[test]
    fn linspace_includes_both_ends() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
