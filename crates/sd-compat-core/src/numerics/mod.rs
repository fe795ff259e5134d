//! Floating-point closeness checks used when diffing simulation output.
//!
//! The four methods differ in how the relative tolerance is scaled: by `b`
//! alone (`asymmetric`), by both values (`strong`), by either value (`weak`),
//! or by their mean (`average`). An absolute tolerance always applies on top.
//! Infinities are only close to an identical infinity and NaN is never close
//! to anything.

pub mod reconcile;

pub use reconcile::{
    ValueParseError, fraction_digits, parse_value, reconcile_precision, round_to_decimals,
};

use crate::domain::CompatError;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const DEFAULT_REL_TOL: f64 = 1e-9;
pub const DEFAULT_ABS_TOL: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMethod {
    Asymmetric,
    Strong,
    #[default]
    Weak,
    Average,
}

impl ToleranceMethod {
    pub const ALL: [Self; 4] = [Self::Asymmetric, Self::Strong, Self::Weak, Self::Average];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asymmetric => "asymmetric",
            Self::Strong => "strong",
            Self::Weak => "weak",
            Self::Average => "average",
        }
    }
}

impl Display for ToleranceMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for ToleranceMethod {
    type Err = ToleranceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| ToleranceError::UnknownMethod(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToleranceError {
    #[error(
        "method must be one of: \"asymmetric\", \"strong\", \"weak\", \"average\" (got '{0}')"
    )]
    UnknownMethod(String),
    #[error("error tolerances must be non-negative (rel_tol={rel_tol}, abs_tol={abs_tol})")]
    NegativeTolerance { rel_tol: f64, abs_tol: f64 },
}

impl From<ToleranceError> for CompatError {
    fn from(error: ToleranceError) -> Self {
        CompatError::input_validation("INPUT.TOLERANCE", error.to_string())
    }
}

/// Scalar types the tolerance check can compare.
///
/// Complex values are compared by modulus, so `|x|` below is `norm()`.
pub trait ToleranceScalar: Copy + PartialEq {
    /// True for an infinite value. NaN is not infinite.
    fn is_unbounded(self) -> bool;

    /// `|other - self|`
    fn distance(self, other: Self) -> f64;

    /// `|factor * self|`
    fn scaled_magnitude(self, factor: f64) -> f64;

    /// `|factor * (self + other) / 2|`
    fn scaled_mean_magnitude(self, other: Self, factor: f64) -> f64;
}

impl ToleranceScalar for f64 {
    fn is_unbounded(self) -> bool {
        self.is_infinite()
    }

    fn distance(self, other: Self) -> f64 {
        (other - self).abs()
    }

    fn scaled_magnitude(self, factor: f64) -> f64 {
        (factor * self).abs()
    }

    fn scaled_mean_magnitude(self, other: Self, factor: f64) -> f64 {
        (factor * (self + other) / 2.0).abs()
    }
}

impl ToleranceScalar for Complex64 {
    fn is_unbounded(self) -> bool {
        self.is_infinite()
    }

    fn distance(self, other: Self) -> f64 {
        (other - self).norm()
    }

    fn scaled_magnitude(self, factor: f64) -> f64 {
        (self * factor).norm()
    }

    fn scaled_mean_magnitude(self, other: Self, factor: f64) -> f64 {
        ((self + other) * factor / 2.0).norm()
    }
}

/// A validated tolerance configuration. Construction rejects negative
/// tolerances, so [`Tolerance::is_close`] cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    rel_tol: f64,
    abs_tol: f64,
    method: ToleranceMethod,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rel_tol: DEFAULT_REL_TOL,
            abs_tol: DEFAULT_ABS_TOL,
            method: ToleranceMethod::Weak,
        }
    }
}

impl Tolerance {
    pub fn new(
        rel_tol: f64,
        abs_tol: f64,
        method: ToleranceMethod,
    ) -> Result<Self, ToleranceError> {
        if rel_tol < 0.0 || abs_tol < 0.0 {
            return Err(ToleranceError::NegativeTolerance { rel_tol, abs_tol });
        }

        Ok(Self {
            rel_tol,
            abs_tol,
            method,
        })
    }

    pub const fn rel_tol(&self) -> f64 {
        self.rel_tol
    }

    pub const fn abs_tol(&self) -> f64 {
        self.abs_tol
    }

    pub const fn method(&self) -> ToleranceMethod {
        self.method
    }

    pub fn is_close<T: ToleranceScalar>(&self, a: T, b: T) -> bool {
        if a == b {
            return true;
        }

        // Opposite infinities, or an infinity against a finite value, would
        // otherwise get an unbounded relative tolerance.
        if a.is_unbounded() || b.is_unbounded() {
            return false;
        }

        let diff = a.distance(b);
        let within_abs = diff <= self.abs_tol;
        match self.method {
            ToleranceMethod::Asymmetric => diff <= b.scaled_magnitude(self.rel_tol) || within_abs,
            ToleranceMethod::Strong => {
                (diff <= b.scaled_magnitude(self.rel_tol)
                    && diff <= a.scaled_magnitude(self.rel_tol))
                    || within_abs
            }
            ToleranceMethod::Weak => {
                diff <= b.scaled_magnitude(self.rel_tol)
                    || diff <= a.scaled_magnitude(self.rel_tol)
                    || within_abs
            }
            ToleranceMethod::Average => {
                diff <= a.scaled_mean_magnitude(b, self.rel_tol) || within_abs
            }
        }
    }
}

pub fn isclose<T: ToleranceScalar>(
    a: T,
    b: T,
    rel_tol: f64,
    abs_tol: f64,
    method: ToleranceMethod,
) -> Result<bool, ToleranceError> {
    Ok(Tolerance::new(rel_tol, abs_tol, method)?.is_close(a, b))
}

#[cfg(test)]
mod tests {
    use super::{Tolerance, ToleranceError, ToleranceMethod, isclose};
    use crate::domain::{CompatError, CompatErrorCategory};
    use num_complex::Complex64;

    #[test]
    fn method_parses_known_names_and_rejects_others() {
        for method in ToleranceMethod::ALL {
            assert_eq!(method.as_str().parse::<ToleranceMethod>(), Ok(method));
        }
        assert_eq!(
            "relative".parse::<ToleranceMethod>(),
            Err(ToleranceError::UnknownMethod("relative".to_string()))
        );
        assert_eq!(ToleranceMethod::default(), ToleranceMethod::Weak);
    }

    #[test]
    fn negative_tolerances_are_rejected() {
        assert!(matches!(
            Tolerance::new(-1e-9, 0.0, ToleranceMethod::Weak),
            Err(ToleranceError::NegativeTolerance { .. })
        ));
        assert!(matches!(
            isclose(1.0, 1.0, 1e-9, -0.5, ToleranceMethod::Strong),
            Err(ToleranceError::NegativeTolerance { .. })
        ));

        let error: CompatError = ToleranceError::NegativeTolerance {
            rel_tol: -1.0,
            abs_tol: 0.0,
        }
        .into();
        assert_eq!(error.category(), CompatErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.TOLERANCE");
    }

    #[test]
    fn default_tolerance_matches_harness_operating_point() {
        let tolerance = Tolerance::default();
        assert_eq!(tolerance.rel_tol(), 1e-9);
        assert_eq!(tolerance.abs_tol(), 0.0);
        assert_eq!(tolerance.method(), ToleranceMethod::Weak);
    }

    #[test]
    fn asymmetric_scales_by_second_value_only() {
        let tolerance = Tolerance::new(0.1, 0.0, ToleranceMethod::Asymmetric).unwrap();
        // diff = 1.0; |0.1 * 10| = 1.0 passes, |0.1 * 9| = 0.9 fails.
        assert!(tolerance.is_close(9.0, 10.0));
        assert!(!tolerance.is_close(10.0, 9.0));
    }

    #[test]
    fn strong_and_weak_differ_on_boundary() {
        let strong = Tolerance::new(0.1, 0.0, ToleranceMethod::Strong).unwrap();
        let weak = Tolerance::new(0.1, 0.0, ToleranceMethod::Weak).unwrap();
        assert!(!strong.is_close(9.0, 10.0));
        assert!(weak.is_close(9.0, 10.0));
        assert!(weak.is_close(10.0, 9.0));
    }

    #[test]
    fn average_scales_by_mean() {
        let tolerance = Tolerance::new(0.1, 0.0, ToleranceMethod::Average).unwrap();
        // mean 10.0 allows a diff of 1.0
        assert!(tolerance.is_close(9.5, 10.5));
        assert!(!tolerance.is_close(9.0, 11.0));
    }

    #[test]
    fn absolute_tolerance_covers_comparisons_near_zero() {
        let relative_only = Tolerance::new(1e-9, 0.0, ToleranceMethod::Weak).unwrap();
        let with_abs = Tolerance::new(1e-9, 1e-6, ToleranceMethod::Weak).unwrap();
        assert!(!relative_only.is_close(0.0, 1e-7));
        assert!(with_abs.is_close(0.0, 1e-7));
    }

    #[test]
    fn complex_values_compare_by_modulus() {
        let tolerance = Tolerance::new(1e-6, 0.0, ToleranceMethod::Weak).unwrap();
        let a = Complex64::new(3.0, 4.0);
        let b = Complex64::new(3.0, 4.000_000_1);
        assert!(tolerance.is_close(a, b));
        assert!(!tolerance.is_close(a, Complex64::new(3.0, 4.1)));
        assert!(!tolerance.is_close(a, Complex64::new(f64::INFINITY, 4.0)));
        let nan = Complex64::new(f64::NAN, 0.0);
        assert!(!tolerance.is_close(nan, nan));
    }
}
