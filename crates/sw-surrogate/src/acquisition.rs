//! Acquisition functions for minimization.
//!
//! Scores are oriented so that larger is better; the optimizer maximizes
//! them over candidate points.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use sw_types::{config_error, SwError, SwResult};

/// Selection criterion used to pick the next point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AcquisitionFunction {
    /// Pick one of LCB, EI and PI at random per suggestion.
    #[default]
    GpHedge,
    /// Lower confidence bound, `mu - kappa * sigma`.
    Lcb,
    /// Expected improvement over the best observation, with margin `xi`.
    Ei,
    /// Probability of improvement over the best observation, with margin `xi`.
    Pi,
}

impl AcquisitionFunction {
    /// Portfolio members a hedge chooses between, in draw order.
    pub const HEDGE_MEMBERS: [AcquisitionFunction; 3] = [Self::Lcb, Self::Ei, Self::Pi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GpHedge => "gp_hedge",
            Self::Lcb => "LCB",
            Self::Ei => "EI",
            Self::Pi => "PI",
        }
    }

    /// Score a posterior `(mean, std)` given the best observed outcome.
    /// `GpHedge` has no score of its own and scores like LCB.
    pub fn score(self, mean: f64, std: f64, y_best: f64, kappa: f64, xi: f64) -> f64 {
        let score = match self {
            Self::Lcb | Self::GpHedge => -(mean - kappa * std),
            Self::Ei => {
                if std > 0.0 {
                    let improvement = y_best - mean - xi;
                    let z = improvement / std;
                    improvement * norm_cdf(z) + std * norm_pdf(z)
                } else {
                    0.0
                }
            }
            Self::Pi => {
                if std > 0.0 {
                    norm_cdf((y_best - mean - xi) / std)
                } else {
                    0.0
                }
            }
        };
        if score.is_nan() {
            f64::NEG_INFINITY
        } else {
            score
        }
    }
}

impl std::fmt::Display for AcquisitionFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcquisitionFunction {
    type Err = SwError;

    fn from_str(s: &str) -> SwResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gp_hedge" | "gp-hedge" => Ok(Self::GpHedge),
            "lcb" => Ok(Self::Lcb),
            "ei" => Ok(Self::Ei),
            "pi" => Ok(Self::Pi),
            other => Err(config_error!(
                "unsupported acquisition function '{other}' (expected gp_hedge, LCB, EI or PI)"
            )),
        }
    }
}

impl TryFrom<String> for AcquisitionFunction {
    type Error = SwError;

    fn try_from(value: String) -> SwResult<Self> {
        value.parse()
    }
}

impl From<AcquisitionFunction> for String {
    fn from(acq: AcquisitionFunction) -> Self {
        acq.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Normal distribution helpers
// ---------------------------------------------------------------------------

/// Standard normal PDF.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Hart / Abramowitz-Stegun rational approximation).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    const B: [f64; 5] = [
        0.319_381_530,
        -0.356_563_782,
        1.781_477_937,
        -1.821_255_978,
        1.330_274_429,
    ];
    let poly = t * B.iter().rev().fold(0.0, |acc, b| b + t * acc);
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(
            "gp_hedge".parse::<AcquisitionFunction>().unwrap(),
            AcquisitionFunction::GpHedge
        );
        assert_eq!("LCB".parse::<AcquisitionFunction>().unwrap(), AcquisitionFunction::Lcb);
        assert_eq!("ei".parse::<AcquisitionFunction>().unwrap(), AcquisitionFunction::Ei);
        assert_eq!("Pi".parse::<AcquisitionFunction>().unwrap(), AcquisitionFunction::Pi);
        assert!(matches!(
            "EIps".parse::<AcquisitionFunction>(),
            Err(SwError::Configuration(_))
        ));
    }

    #[test]
    fn serializes_as_canonical_name() {
        let json = serde_json::to_string(&AcquisitionFunction::Lcb).unwrap();
        assert_eq!(json, "\"LCB\"");
        let back: AcquisitionFunction = serde_json::from_str("\"gp_hedge\"").unwrap();
        assert_eq!(back, AcquisitionFunction::GpHedge);
    }

    #[test]
    fn normal_cdf_matches_known_values() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-4);
        assert!((norm_cdf(-1.0) - 0.158_655).abs() < 1e-4);
    }

    #[test]
    fn lcb_prefers_low_mean_and_high_uncertainty() {
        let lcb = AcquisitionFunction::Lcb;
        assert!(lcb.score(0.0, 1.0, 0.0, 1.96, 0.01) > lcb.score(1.0, 1.0, 0.0, 1.96, 0.01));
        assert!(lcb.score(0.0, 2.0, 0.0, 1.96, 0.01) > lcb.score(0.0, 1.0, 0.0, 1.96, 0.01));
    }

    #[test]
    fn improvement_scores_vanish_without_uncertainty() {
        assert_eq!(AcquisitionFunction::Ei.score(-5.0, 0.0, 0.0, 1.96, 0.01), 0.0);
        assert_eq!(AcquisitionFunction::Pi.score(-5.0, 0.0, 0.0, 1.96, 0.01), 0.0);
    }

    #[test]
    fn ei_rewards_expected_improvement() {
        let ei = AcquisitionFunction::Ei;
        let better = ei.score(-1.0, 0.5, 0.0, 1.96, 0.01);
        let worse = ei.score(1.0, 0.5, 0.0, 1.96, 0.01);
        assert!(better > worse && worse >= 0.0);

        let pi = AcquisitionFunction::Pi.score(-1.0, 0.5, 0.0, 1.96, 0.01);
        assert!(pi > 0.9 && pi <= 1.0);
    }
}
