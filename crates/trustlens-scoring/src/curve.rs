//! Monotonic penalty curves

use serde::{Deserialize, Serialize};

/// Piecewise-linear map from a deviation/badness measure to a score
///
/// Breakpoints are `(x, score)` with strictly increasing `x` and
/// non-increasing `score`, so a larger deviation never maps to a higher
/// score. Inputs outside the breakpoint range clamp to the end scores.
///
/// # Examples
///
/// ```
/// use trustlens_scoring::PenaltyCurve;
///
/// let curve = PenaltyCurve::new(vec![(0.0, 100.0), (10.0, 50.0)]);
/// assert_eq!(curve.score(0.0), 100.0);
/// assert_eq!(curve.score(5.0), 75.0);
/// assert_eq!(curve.score(40.0), 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PenaltyCurve {
    points: Vec<(f64, f64)>,
}

impl PenaltyCurve {
    /// Create a curve from breakpoints (call [`PenaltyCurve::validate`] before use)
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// The breakpoints
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Check the curve is non-empty, finite, in [0, 100] and monotonic
    pub fn validate(&self) -> Result<(), String> {
        if self.points.is_empty() {
            return Err("curve has no breakpoints".to_string());
        }

        for &(x, score) in &self.points {
            if !x.is_finite() || !score.is_finite() {
                return Err("breakpoints must be finite".to_string());
            }
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("score {} outside [0, 100]", score));
            }
        }

        for pair in self.points.windows(2) {
            let (x0, s0) = pair[0];
            let (x1, s1) = pair[1];
            if x1 <= x0 {
                return Err(format!("x must strictly increase ({} then {})", x0, x1));
            }
            if s1 > s0 {
                return Err(format!("score rises from {} to {} between x={} and x={}", s0, s1, x0, x1));
            }
        }

        Ok(())
    }

    /// Score for a deviation `x`
    ///
    /// NaN inputs are treated as the worst case.
    pub fn score(&self, x: f64) -> f64 {
        let (Some(&(first_x, first_s)), Some(&(last_x, last_s))) =
            (self.points.first(), self.points.last())
        else {
            return 0.0;
        };

        if x.is_nan() {
            return last_s;
        }
        if x <= first_x {
            return first_s;
        }
        if x >= last_x {
            return last_s;
        }

        for pair in self.points.windows(2) {
            let (x0, s0) = pair[0];
            let (x1, s1) = pair[1];
            if x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return s0 + t * (s1 - s0);
            }
        }

        last_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rtp_curve() -> PenaltyCurve {
        PenaltyCurve::new(vec![
            (0.0, 100.0),
            (1.0, 95.0),
            (3.0, 80.0),
            (5.0, 65.0),
            (8.0, 45.0),
            (15.0, 10.0),
            (25.0, 0.0),
        ])
    }

    #[test]
    fn test_interpolation() {
        let curve = rtp_curve();
        assert_eq!(curve.score(1.0), 95.0);
        assert!((curve.score(2.0) - 87.5).abs() < 1e-9);
        assert_eq!(curve.score(8.0), 45.0);
    }

    #[test]
    fn test_clamps_at_ends() {
        let curve = rtp_curve();
        assert_eq!(curve.score(-3.0), 100.0);
        assert_eq!(curve.score(1000.0), 0.0);
        assert_eq!(curve.score(f64::NAN), 0.0);
    }

    #[test]
    fn test_validate_rejects_rising_score() {
        let curve = PenaltyCurve::new(vec![(0.0, 50.0), (1.0, 60.0)]);
        assert!(curve.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsorted_x() {
        let curve = PenaltyCurve::new(vec![(2.0, 90.0), (1.0, 80.0)]);
        assert!(curve.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(PenaltyCurve::new(vec![]).validate().is_err());
    }

    #[test]
    fn test_single_point_is_constant() {
        let curve = PenaltyCurve::new(vec![(5.0, 70.0)]);
        assert!(curve.validate().is_ok());
        assert_eq!(curve.score(0.0), 70.0);
        assert_eq!(curve.score(50.0), 70.0);
    }
}
