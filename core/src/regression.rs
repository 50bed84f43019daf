//! Vanlig minste kvadraters lineær tilpasning, én per måltype.

use serde::Serialize;

use crate::error::FitError;

/// Hvor mye man kan stole på en trendlinje, avledet fra r².
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

impl Confidence {
    pub fn from_r_squared(r2: f64) -> Self {
        if r2 >= 0.8 {
            Self::High
        } else if r2 >= 0.5 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendFit {
    /// Enhet per dag.
    pub slope: f64,
    pub intercept: f64,
    /// Kvadratet av Pearson-korrelasjonen, 0..=1. 0 for flate serier.
    pub r_squared: f64,
    pub n: usize,
    pub confidence: Confidence,
}

impl TrendFit {
    #[inline]
    pub fn predict(&self, day: f64) -> f64 {
        self.slope.mul_add(day, self.intercept)
    }
}

/// OLS på (dag, verdi). Ingen vekting, glatting eller fjerning av uteliggere.
pub fn fit(days: &[f64], values: &[f64]) -> Result<TrendFit, FitError> {
    if days.len() != values.len() {
        return Err(FitError::LengthMismatch {
            days: days.len(),
            values: values.len(),
        });
    }
    let n = days.len();
    if n < 2 {
        return Err(FitError::TooFewPoints(n));
    }

    let nf = n as f64;
    let mean_x = days.iter().sum::<f64>() / nf;
    let mean_y = values.iter().sum::<f64>() / nf;

    // Sentrerte summer (stabilt også for store dagsverdier)
    let (mut sxx, mut sxy, mut syy) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in days.iter().zip(values) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx <= f64::EPSILON {
        return Err(FitError::ZeroDayVariance);
    }

    let slope = sxy / sxx;
    let intercept = slope.mul_add(-mean_x, mean_y);

    let r_squared = if syy <= f64::EPSILON {
        0.0
    } else {
        let r = sxy / (sxx * syy).sqrt();
        (r * r).clamp(0.0, 1.0)
    };

    log::debug!("fit n={n} slope={slope:.5} intercept={intercept:.3} r2={r_squared:.3}");

    Ok(TrendFit {
        slope,
        intercept,
        r_squared,
        n,
        confidence: Confidence::from_r_squared(r_squared),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_line_is_recovered() {
        let days: Vec<f64> = (0..10).map(f64::from).collect();
        let values: Vec<f64> = days.iter().map(|d| 2.0 * d + 5.0).collect();
        let f = fit(&days, &values).unwrap();
        assert!((f.slope - 2.0).abs() < 1e-9);
        assert!((f.intercept - 5.0).abs() < 1e-9);
        assert!((f.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(f.confidence, Confidence::High);
        assert!((f.predict(20.0) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_gives_zero_slope_and_zero_r2() {
        let f = fit(&[0.0, 7.0, 14.0, 21.0], &[80.0; 4]).unwrap();
        assert!(f.slope.abs() < 1e-12);
        assert_eq!(f.r_squared, 0.0);
        assert_eq!(f.confidence, Confidence::Low);
    }

    #[test]
    fn descending_line_has_full_confidence() {
        let f = fit(&[0.0, 7.0, 14.0], &[90.0, 89.3, 88.6]).unwrap();
        assert!((f.slope + 0.1).abs() < 1e-9);
        assert!((f.r_squared - 1.0).abs() < 1e-9);
    }

    #[test]
    fn contract_violations_are_reported() {
        assert_eq!(
            fit(&[0.0, 1.0], &[1.0]),
            Err(FitError::LengthMismatch { days: 2, values: 1 })
        );
        assert_eq!(fit(&[0.0], &[1.0]), Err(FitError::TooFewPoints(1)));
        assert_eq!(fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), Err(FitError::ZeroDayVariance));
    }

    #[test]
    fn noisy_series_lowers_r2() {
        let f = fit(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 3.0, 1.5, 3.5, 2.0]).unwrap();
        assert!(f.r_squared > 0.0 && f.r_squared < 0.5);
    }
}
