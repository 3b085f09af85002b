//! Dense univariate polynomial over `f64`.
//!
//! Coefficients are stored lowest degree first. The failure-time machinery
//! of the engine reduces certificate predicates to "first real root of
//! `p(t)` at or after a threshold", so the solver here only ever looks
//! forward in time: closed forms for degree ≤ 2, a sign-change scan with
//! bisection refinement above that.
//!
//! Roots of even multiplicity (the curve touches zero without crossing) are
//! not reported by the scan; a certificate failure is a sign transition, so
//! a touch is not a failure.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use thiserror::Error;

/// Coefficients with magnitude at or below this are treated as zero when
/// trimming the leading term.
const COEFF_EPS: f64 = 1e-12;

/// Grid resolution for the sign-change scan on degree ≥ 3.
const SCAN_STEPS: usize = 4096;

/// Bisection refinement iterations.
const BISECT_ITERS: usize = 128;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolynomialError {
    #[error("interpolation requires at least one sample")]
    EmptyFit,

    #[error("duplicate sample time {0} makes the fit singular")]
    DuplicateTime(f64),
}

/// A dense univariate polynomial, lowest degree first.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Build from coefficients, lowest degree first. Trailing zeros are
    /// trimmed; the zero polynomial keeps a single `0.0` coefficient.
    pub fn new(coeffs: Vec<f64>) -> Self {
        let mut p = Self { coeffs };
        p.trim();
        p
    }

    /// The constant polynomial `[x]`.
    pub fn constant(x: f64) -> Self {
        Self { coeffs: vec![x] }
    }

    /// The zero polynomial.
    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    fn trim(&mut self) {
        while self.coeffs.len() > 1 {
            match self.coeffs.last() {
                Some(&c) if c == 0.0 => {
                    self.coeffs.pop();
                }
                _ => break,
            }
        }
        if self.coeffs.is_empty() {
            self.coeffs.push(0.0);
        }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0.0)
    }

    /// Horner evaluation at `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }

    /// Multiply every coefficient by `k`.
    pub fn scale(&self, k: f64) -> Self {
        Self::new(self.coeffs.iter().map(|c| c * k).collect())
    }

    /// Interpolating fit: `n` samples yield the unique polynomial of degree
    /// `n - 1` passing through all of them (Lagrange basis).
    ///
    /// Sample times must be pairwise distinct; a duplicate makes the system
    /// singular and is reported as an error so callers can treat the
    /// prediction as unavailable.
    pub fn fit(samples: &[(f64, f64)]) -> Result<Self, PolynomialError> {
        if samples.is_empty() {
            return Err(PolynomialError::EmptyFit);
        }

        let mut acc = Polynomial::zero();
        for (i, &(xi, yi)) in samples.iter().enumerate() {
            let mut basis = Polynomial::constant(1.0);
            let mut denom = 1.0;
            for (j, &(xj, _)) in samples.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = xi - xj;
                if d == 0.0 {
                    return Err(PolynomialError::DuplicateTime(xi));
                }
                denom *= d;
                basis = &basis * &Polynomial::new(vec![-xj, 1.0]);
            }
            acc = &acc + &basis.scale(yi / denom);
        }
        Ok(acc)
    }

    /// Smallest real root strictly greater than `t0`, if any.
    pub fn first_root_after(&self, t0: f64) -> Option<f64> {
        self.first_root(t0, false)
    }

    /// Smallest real root at or after `t0`, if any.
    pub fn first_root_at_or_after(&self, t0: f64) -> Option<f64> {
        self.first_root(t0, true)
    }

    fn first_root(&self, t0: f64, inclusive: bool) -> Option<f64> {
        let accept = |r: f64| if inclusive { r >= t0 } else { r > t0 };

        let coeffs = self.effective_coeffs();
        match coeffs.len() {
            0 | 1 => None,
            2 => {
                let r = -coeffs[0] / coeffs[1];
                accept(r).then_some(r)
            }
            3 => {
                let (a, b, c) = (coeffs[2], coeffs[1], coeffs[0]);
                let disc = b * b - 4.0 * a * c;
                if disc < 0.0 {
                    return None;
                }
                let sq = disc.sqrt();
                let mut roots = [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)];
                roots.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
                roots.into_iter().find(|&r| accept(r))
            }
            _ => self.scan_root(t0, inclusive),
        }
    }

    /// Coefficients with the numerically-dead leading terms dropped.
    fn effective_coeffs(&self) -> &[f64] {
        let mut end = self.coeffs.len();
        while end > 1 && self.coeffs[end - 1].abs() <= COEFF_EPS {
            end -= 1;
        }
        if end == 1 && self.coeffs[0].abs() <= COEFF_EPS {
            return &[];
        }
        &self.coeffs[..end]
    }

    /// Sign-change scan over `[t0, cauchy_bound]` with bisection refinement.
    fn scan_root(&self, t0: f64, inclusive: bool) -> Option<f64> {
        let bound = self.cauchy_bound();
        if t0 > bound {
            return None;
        }

        let lo = t0;
        let span = bound - lo;
        let mut prev_t = lo;
        let mut prev_f = self.evaluate(lo);
        if inclusive && prev_f == 0.0 {
            return Some(lo);
        }

        let step = span / SCAN_STEPS as f64;
        if step <= 0.0 {
            return None;
        }

        for i in 1..=SCAN_STEPS {
            let t = lo + step * i as f64;
            let f = self.evaluate(t);
            if f == 0.0 {
                return Some(t);
            }
            if prev_f * f < 0.0 {
                return Some(self.bisect(prev_t, t));
            }
            prev_t = t;
            prev_f = f;
        }
        None
    }

    /// All real roots lie in `[-B, B]` with `B = 1 + max|c_i| / |c_n|`.
    fn cauchy_bound(&self) -> f64 {
        let coeffs = self.effective_coeffs();
        let Some((&lead, rest)) = coeffs.split_last() else {
            return 0.0;
        };
        let max = rest.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        1.0 + max / lead.abs()
    }

    fn bisect(&self, mut lo: f64, mut hi: f64) -> f64 {
        let mut f_lo = self.evaluate(lo);
        for _ in 0..BISECT_ITERS {
            let mid = 0.5 * (lo + hi);
            if hi - lo < 1e-12 {
                return mid;
            }
            let f_mid = self.evaluate(mid);
            if f_mid == 0.0 {
                return mid;
            }
            if f_lo * f_mid < 0.0 {
                hi = mid;
            } else {
                lo = mid;
                f_lo = f_mid;
            }
        }
        0.5 * (lo + hi)
    }
}

impl Add<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let n = self.coeffs.len().max(rhs.coeffs.len());
        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.coeffs.get(i).copied().unwrap_or(0.0)
                + rhs.coeffs.get(i).copied().unwrap_or(0.0);
        }
        Polynomial::new(out)
    }
}

impl Sub<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        let n = self.coeffs.len().max(rhs.coeffs.len());
        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.coeffs.get(i).copied().unwrap_or(0.0)
                - rhs.coeffs.get(i).copied().unwrap_or(0.0);
        }
        Polynomial::new(out)
    }
}

impl Mul<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }
        let mut out = vec![0.0; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Polynomial::new(out)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (i, &c) in self.coeffs.iter().enumerate().rev() {
            if c == 0.0 && self.coeffs.len() > 1 {
                continue;
            }
            if !first {
                write!(f, " + ")?;
            }
            match i {
                0 => write!(f, "{c}")?,
                1 => write!(f, "{c}*t")?,
                _ => write!(f, "{c}*t^{i}")?,
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}
