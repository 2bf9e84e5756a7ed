//! Gaussian-process regression with a Matérn 5/2 kernel.
//!
//! Outcomes are standardized before fitting. Kernel hyperparameters (a
//! shared lengthscale and, when the noise level is estimated, the noise
//! variance) are picked from a fixed grid by maximum log marginal
//! likelihood, which keeps fitting deterministic.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use sw_types::{config_error, SwError, SwResult};

/// How the surrogate treats observation noise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "NoiseRepr", into = "NoiseRepr")]
pub enum NoiseMode {
    /// Homoscedastic Gaussian noise whose level is estimated from the data.
    #[default]
    Gaussian,
    /// Known noise variance, in units of the objective squared.
    Fixed(f64),
}

impl std::fmt::Display for NoiseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::Fixed(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for NoiseMode {
    type Err = SwError;

    fn from_str(s: &str) -> SwResult<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("gaussian") {
            return Ok(Self::Gaussian);
        }
        s.parse::<f64>()
            .map(Self::Fixed)
            .map_err(|_| config_error!("noise must be \"gaussian\" or a variance, got '{s}'"))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NoiseRepr {
    Level(f64),
    Name(String),
}

impl TryFrom<NoiseRepr> for NoiseMode {
    type Error = SwError;

    fn try_from(repr: NoiseRepr) -> SwResult<Self> {
        match repr {
            NoiseRepr::Level(v) => Ok(Self::Fixed(v)),
            NoiseRepr::Name(s) => s.parse(),
        }
    }
}

impl From<NoiseMode> for NoiseRepr {
    fn from(mode: NoiseMode) -> Self {
        match mode {
            NoiseMode::Gaussian => Self::Name("gaussian".to_string()),
            NoiseMode::Fixed(v) => Self::Level(v),
        }
    }
}

/// Candidate lengthscales in unit-scaled input space.
const LENGTHSCALES: [f64; 10] = [0.05, 0.1, 0.2, 0.3, 0.5, 0.75, 1.0, 1.5, 2.5, 5.0];
/// Candidate noise variances (standardized units) when noise is estimated.
const NOISE_LEVELS: [f64; 5] = [1e-6, 1e-4, 1e-2, 5e-2, 2e-1];
/// Diagonal jitter tried in turn until the kernel matrix factorizes.
const JITTER: [f64; 4] = [1e-10, 1e-8, 1e-6, 1e-4];

const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matérn 5/2 kernel with unit signal variance.
///
/// `k(x1, x2) = (1 + √5 r + 5/3 r²) exp(-√5 r)` with `r = ‖x1 - x2‖ / l`
fn matern52(x1: &[f64], x2: &[f64], lengthscale: f64) -> f64 {
    let r_sq = x1
        .iter()
        .zip(x2)
        .map(|(a, b)| {
            let d = (a - b) / lengthscale;
            d * d
        })
        .sum::<f64>();
    let sqrt5_r = SQRT_5 * r_sq.sqrt();
    (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

/// A GP fitted to standardized observations.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    x_train: Vec<Vec<f64>>,
    /// Lower Cholesky factor of `K + σ²I`.
    l: DMatrix<f64>,
    /// `(K + σ²I)⁻¹ y`
    alpha: DVector<f64>,
    lengthscale: f64,
    noise: f64,
    y_mean: f64,
    y_std: f64,
    log_marginal_likelihood: f64,
}

impl GaussianProcess {
    /// Fit to `x_train` (unit-scaled rows) and raw outcomes `y_train`.
    pub fn fit(x_train: &[Vec<f64>], y_train: &[f64], noise: NoiseMode) -> SwResult<Self> {
        let n = y_train.len();
        if n == 0 || x_train.len() != n {
            return Err(SwError::Numerical(format!(
                "cannot fit a GP to {} inputs and {} outcomes",
                x_train.len(),
                n
            )));
        }

        let y_mean = y_train.iter().sum::<f64>() / n as f64;
        let y_var = if n > 1 {
            y_train.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() / n as f64
        } else {
            0.0
        };
        let y_std = if y_var > 1e-24 { y_var.sqrt() } else { 1.0 };
        let y = DVector::from_iterator(n, y_train.iter().map(|y| (y - y_mean) / y_std));

        let noise_levels: Vec<f64> = match noise {
            NoiseMode::Gaussian => NOISE_LEVELS.to_vec(),
            NoiseMode::Fixed(v) => vec![v / (y_std * y_std)],
        };

        let mut best: Option<Self> = None;
        for &lengthscale in &LENGTHSCALES {
            for &noise in &noise_levels {
                let Some((l, alpha, lml)) = factorize(x_train, &y, lengthscale, noise) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| lml > b.log_marginal_likelihood) {
                    best = Some(Self {
                        x_train: x_train.to_vec(),
                        l,
                        alpha,
                        lengthscale,
                        noise,
                        y_mean,
                        y_std,
                        log_marginal_likelihood: lml,
                    });
                }
            }
        }

        let gp = best.ok_or_else(|| {
            SwError::Numerical("kernel matrix is not positive definite".to_string())
        })?;
        debug!(
            lengthscale = gp.lengthscale,
            noise = gp.noise,
            log_marginal_likelihood = gp.log_marginal_likelihood,
            "fitted gaussian process"
        );
        Ok(gp)
    }

    /// Posterior mean and standard deviation at `x`, in outcome units.
    /// The standard deviation is that of the latent function and excludes
    /// observation noise.
    pub fn predict(&self, x: &[f64]) -> (f64, f64) {
        let k_star = DVector::from_iterator(
            self.x_train.len(),
            self.x_train.iter().map(|xi| matern52(x, xi, self.lengthscale)),
        );
        let mean = k_star.dot(&self.alpha);
        let var = match self.l.solve_lower_triangular(&k_star) {
            Some(v) => (1.0 - v.norm_squared()).max(0.0),
            None => 1.0,
        };
        (mean * self.y_std + self.y_mean, var.sqrt() * self.y_std)
    }

    pub fn lengthscale(&self) -> f64 {
        self.lengthscale
    }

    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }
}

/// Factorize `K + (noise + jitter)I` and return `(L, α, log marginal likelihood)`.
fn factorize(
    x: &[Vec<f64>],
    y: &DVector<f64>,
    lengthscale: f64,
    noise: f64,
) -> Option<(DMatrix<f64>, DVector<f64>, f64)> {
    let n = x.len();
    let kernel = DMatrix::from_fn(n, n, |i, j| matern52(&x[i], &x[j], lengthscale));

    for jitter in JITTER {
        let mut k = kernel.clone();
        for i in 0..n {
            k[(i, i)] += noise + jitter;
        }
        let Some(chol) = k.cholesky() else {
            continue;
        };
        let alpha = chol.solve(y);
        let l = chol.l();
        let log_det_half: f64 = l.diagonal().iter().map(|d| d.ln()).sum();
        let lml = -0.5 * y.dot(&alpha)
            - log_det_half
            - 0.5 * n as f64 * (2.0 * std::f64::consts::PI).ln();
        if lml.is_finite() {
            return Some((l, alpha, lml));
        }
    }
    None
}
