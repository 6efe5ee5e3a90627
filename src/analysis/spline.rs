use serde::{Deserialize, Serialize};
use crate::analysis::error::AnalysisError;
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    FirstDerivative(f64),
    SecondDerivative(f64),
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplineBoundary {
    pub left: Boundary,
    pub right: Boundary,
    /// Drop the curvature term outside the node range.
    pub linear_extrapolation: bool,
}
impl Default for SplineBoundary {
    /// Natural spline: zero curvature at both ends.
    fn default() -> Self {
        SplineBoundary {
            left: Boundary::SecondDerivative(0.0),
            right: Boundary::SecondDerivative(0.0),
            linear_extrapolation: false,
        }
    }
}
/// Piecewise cubic interpolant, `f(x) = a h^3 + b h^2 + c h + y_i` with `h = x - x_i`.
///
/// Coefficients are recomputed whenever nodes or boundary conditions change, so a
/// constructed spline is always ready to evaluate.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    boundary: SplineBoundary,
    // left extrapolation
    b0: f64,
    c0: f64,
}
impl CubicSpline {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, AnalysisError> {
        Self::with_boundary(x, y, SplineBoundary::default())
    }
    pub fn with_boundary(x: Vec<f64>, y: Vec<f64>, boundary: SplineBoundary) -> Result<Self, AnalysisError> {
        check_nodes(&x, &y)?;
        let mut spline = Self {
            x,
            y,
            a: Vec::new(),
            b: Vec::new(),
            c: Vec::new(),
            boundary,
            b0: 0.0,
            c0: 0.0,
        };
        spline.compute_coefficients();
        Ok(spline)
    }
    pub fn set_nodes(&mut self, x: Vec<f64>, y: Vec<f64>) -> Result<(), AnalysisError> {
        check_nodes(&x, &y)?;
        self.x = x;
        self.y = y;
        self.compute_coefficients();
        Ok(())
    }
    pub fn set_boundary(&mut self, boundary: SplineBoundary) {
        self.boundary = boundary;
        self.compute_coefficients();
    }
    pub fn nodes(&self) -> (&[f64], &[f64]) {
        (&self.x, &self.y)
    }
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }
    fn compute_coefficients(&mut self) {
        let (x, y) = (&self.x, &self.y);
        let n = x.len();
        let mut lower = vec![0.0; n - 1];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n - 1];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            lower[i - 1] = (x[i] - x[i - 1]) / 3.0;
            diag[i] = 2.0 / 3.0 * (x[i + 1] - x[i - 1]);
            upper[i] = (x[i + 1] - x[i]) / 3.0;
            rhs[i] = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        }
        match self.boundary.left {
            Boundary::FirstDerivative(slope) => {
                let h = x[1] - x[0];
                diag[0] = 2.0 * h;
                upper[0] = h;
                rhs[0] = 3.0 * ((y[1] - y[0]) / h - slope);
            }
            Boundary::SecondDerivative(curvature) => {
                diag[0] = 2.0;
                upper[0] = 0.0;
                rhs[0] = curvature;
            }
        }
        match self.boundary.right {
            Boundary::FirstDerivative(slope) => {
                let h = x[n - 1] - x[n - 2];
                diag[n - 1] = 2.0 * h;
                lower[n - 2] = h;
                rhs[n - 1] = 3.0 * (slope - (y[n - 1] - y[n - 2]) / h);
            }
            Boundary::SecondDerivative(curvature) => {
                diag[n - 1] = 2.0;
                lower[n - 2] = 0.0;
                rhs[n - 1] = curvature;
            }
        }
        let mut b = solve_tridiagonal(&lower, diag, &upper, rhs);
        let mut a = vec![0.0; n];
        let mut c = vec![0.0; n];
        for i in 0..n - 1 {
            let h = x[i + 1] - x[i];
            a[i] = (b[i + 1] - b[i]) / (3.0 * h);
            c[i] = (y[i + 1] - y[i]) / h - (2.0 * b[i] + b[i + 1]) * h / 3.0;
        }
        let linear = self.boundary.linear_extrapolation;
        self.b0 = if linear { 0.0 } else { b[0] };
        self.c0 = c[0];
        // right end: quadratic (or linear) continuation with the slope of the last segment
        let h = x[n - 1] - x[n - 2];
        a[n - 1] = 0.0;
        c[n - 1] = 3.0 * a[n - 2] * h * h + 2.0 * b[n - 2] * h + c[n - 2];
        if linear {
            b[n - 1] = 0.0;
        }
        self.a = a;
        self.b = b;
        self.c = c;
    }
    /// Index `i` of the segment starting at `x_i`, 0 left of the domain.
    fn segment(&self, x: f64) -> usize {
        self.x.partition_point(|&node| node < x).saturating_sub(1)
    }
    pub fn eval(&self, x: f64) -> f64 {
        self.derivative(x, 0)
    }
    /// Value (order 0) or derivative of the given order; orders above 3 are zero.
    pub fn derivative(&self, x: f64, order: u32) -> f64 {
        let n = self.x.len();
        if x < self.x[0] {
            let h = x - self.x[0];
            return match order {
                0 => (self.b0 * h + self.c0) * h + self.y[0],
                1 => 2.0 * self.b0 * h + self.c0,
                2 => 2.0 * self.b0,
                _ => 0.0,
            };
        }
        if x > self.x[n - 1] {
            let h = x - self.x[n - 1];
            let (b, c) = (self.b[n - 1], self.c[n - 1]);
            return match order {
                0 => (b * h + c) * h + self.y[n - 1],
                1 => 2.0 * b * h + c,
                2 => 2.0 * b,
                _ => 0.0,
            };
        }
        let i = self.segment(x);
        let h = x - self.x[i];
        let (a, b, c) = (self.a[i], self.b[i], self.c[i]);
        match order {
            0 => ((a * h + b) * h + c) * h + self.y[i],
            1 => (3.0 * a * h + 2.0 * b) * h + c,
            2 => 6.0 * a * h + 2.0 * b,
            3 => 6.0 * a,
            _ => 0.0,
        }
    }
}
fn check_nodes(x: &[f64], y: &[f64]) -> Result<(), AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::NodeLengthMismatch { x: x.len(), y: y.len() });
    }
    if x.len() < 3 {
        return Err(AnalysisError::TooFewNodes { count: x.len() });
    }
    match x.windows(2).position(|w| !(w[0] < w[1])) {
        Some(i) => Err(AnalysisError::UnsortedNodes { index: i + 1 }),
        None => Ok(()),
    }
}
/// Thomas algorithm for a diagonally dominant tridiagonal system, no pivoting.
fn solve_tridiagonal(lower: &[f64], mut diag: Vec<f64>, upper: &[f64], mut rhs: Vec<f64>) -> Vec<f64> {
    let n = rhs.len();
    for i in 1..n {
        let w = lower[i - 1] / diag[i - 1];
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }
    let mut x = vec![0.0; n];
    x[n - 1] = rhs[n - 1] / diag[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = (rhs[i] - upper[i] * x[i + 1]) / diag[i];
    }
    x
}
