//! Ask/tell sequential optimizer.
//!
//! [`Optimizer`] is told prior observations and asked for one new point. It
//! never evaluates an objective itself: outcomes are supplied up front, so a
//! single `ask` is a pure "propose the next point given this history" query.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use sw_types::{
    data_integrity_error, internal_error, sequencing_error, Point, RandomState, SearchSpace,
    SwResult,
};

use crate::acquisition::AcquisitionFunction;
use crate::gp::{GaussianProcess, NoiseMode};
use crate::transform::SpaceTransform;

/// Default number of random candidates scored per acquisition.
pub const DEFAULT_N_POINTS: usize = 10_000;
/// Default number of candidates refined by local search.
pub const DEFAULT_N_RESTARTS: usize = 5;

/// Initial step of the coordinate search, in unit-scaled coordinates.
const LOCAL_STEP: f64 = 0.1;
/// The coordinate search stops once its step shrinks below this.
const LOCAL_MIN_STEP: f64 = 1e-4;
/// Points closer than this (unit-scaled) count as already evaluated.
const DUPLICATE_TOLERANCE: f64 = 1e-8;

/// Gaussian-process optimizer seeded from an explicit random state.
#[derive(Debug, Clone)]
pub struct Optimizer {
    transform: SpaceTransform,
    rng: ChaCha8Rng,
    random_points_remaining: usize,
    acq_func: AcquisitionFunction,
    kappa: f64,
    xi: f64,
    noise: NoiseMode,
    n_points: usize,
    n_restarts: usize,
    x_obs: Vec<Point>,
    y_obs: Vec<f64>,
}

impl Optimizer {
    /// Create an optimizer whose first `n_random_points` asks are uniform
    /// random draws. Observations passed to [`tell`](Self::tell) do not count
    /// towards them.
    pub fn new(space: SearchSpace, n_random_points: usize, random_state: &RandomState) -> Self {
        Self {
            transform: SpaceTransform::new(space),
            rng: random_state.rng(),
            random_points_remaining: n_random_points,
            acq_func: AcquisitionFunction::default(),
            kappa: 1.96,
            xi: 0.01,
            noise: NoiseMode::default(),
            n_points: DEFAULT_N_POINTS,
            n_restarts: DEFAULT_N_RESTARTS,
            x_obs: Vec::new(),
            y_obs: Vec::new(),
        }
    }

    pub fn acq_func(mut self, acq_func: AcquisitionFunction) -> Self {
        self.acq_func = acq_func;
        self
    }

    pub fn kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }

    pub fn xi(mut self, xi: f64) -> Self {
        self.xi = xi;
        self
    }

    pub fn noise(mut self, noise: NoiseMode) -> Self {
        self.noise = noise;
        self
    }

    pub fn n_points(mut self, n: usize) -> Self {
        self.n_points = n.max(1);
        self
    }

    pub fn n_restarts(mut self, n: usize) -> Self {
        self.n_restarts = n;
        self
    }

    /// Record observed `(point, outcome)` pairs. Lower outcomes are better.
    pub fn tell(&mut self, x: Vec<Point>, y: Vec<f64>) -> SwResult<()> {
        if x.len() != y.len() {
            return Err(data_integrity_error!(
                "{} points but {} outcomes",
                x.len(),
                y.len()
            ));
        }
        for (i, (point, outcome)) in x.iter().zip(&y).enumerate() {
            if !self.transform.space().contains(point) {
                return Err(data_integrity_error!(
                    "observation {i} is outside the search space: {point:?}"
                ));
            }
            if !outcome.is_finite() {
                return Err(data_integrity_error!("observation {i} has outcome {outcome}"));
            }
        }
        self.x_obs.extend(x);
        self.y_obs.extend(y);
        Ok(())
    }

    /// Propose the next point to evaluate.
    pub fn ask(&mut self) -> SwResult<Point> {
        if self.random_points_remaining > 0 {
            self.random_points_remaining -= 1;
            let point = self.transform.sample(&mut self.rng);
            debug!(?point, "proposing random point");
            return Ok(point);
        }

        if self.y_obs.is_empty() {
            return Err(sequencing_error!(
                "no observations to fit the surrogate model; the first suggestion must be a random start"
            ));
        }

        // Only single-choice categoricals: the space holds exactly one point.
        if self.transform.width() == 0 {
            return Ok(self.transform.sample(&mut self.rng));
        }

        let point = self.ask_model()?;
        if !self.transform.space().contains(&point) {
            return Err(internal_error!("proposed point left the search space: {point:?}"));
        }
        Ok(point)
    }

    /// Current generator position, to be handed to the next invocation.
    pub fn random_state(&self) -> RandomState {
        RandomState::capture(&self.rng)
    }

    fn ask_model(&mut self) -> SwResult<Point> {
        let x_train = self
            .x_obs
            .iter()
            .map(|p| self.transform.transform(p))
            .collect::<SwResult<Vec<_>>>()?;
        let gp = GaussianProcess::fit(&x_train, &self.y_obs, self.noise)?;
        let y_best = self.y_obs.iter().copied().fold(f64::INFINITY, f64::min);

        let candidates = (0..self.n_points)
            .map(|_| {
                let point = self.transform.sample(&mut self.rng);
                self.transform.transform(&point)
            })
            .collect::<SwResult<Vec<_>>>()?;
        let posteriors: Vec<(f64, f64)> = candidates.par_iter().map(|x| gp.predict(x)).collect();

        let scorer = Scorer {
            gp: &gp,
            y_best,
            kappa: self.kappa,
            xi: self.xi,
            continuous: self.transform.continuous_columns(),
        };

        let acq_func = match self.acq_func {
            AcquisitionFunction::GpHedge => {
                let proposals: Vec<Vec<f64>> = AcquisitionFunction::HEDGE_MEMBERS
                    .iter()
                    .map(|&acq| scorer.best(acq, &candidates, &posteriors, self.n_restarts))
                    .collect();
                // A fresh hedge has equal gains, so each member is equally likely.
                let chosen = self.rng.random_range(0..proposals.len());
                let acq = AcquisitionFunction::HEDGE_MEMBERS[chosen];
                debug!(acq_func = %acq, "gp_hedge selected acquisition");
                return self.finish(&proposals[chosen], &x_train);
            }
            other => other,
        };

        let best = scorer.best(acq_func, &candidates, &posteriors, self.n_restarts);
        self.finish(&best, &x_train)
    }

    fn finish(&self, x: &[f64], x_train: &[Vec<f64>]) -> SwResult<Point> {
        let point = self.transform.inverse(x)?;
        let encoded = self.transform.transform(&point)?;
        let duplicate = x_train.iter().any(|seen| {
            seen.iter()
                .zip(&encoded)
                .all(|(a, b)| (a - b).abs() <= DUPLICATE_TOLERANCE)
        });
        if duplicate {
            warn!(?point, "the objective has already been evaluated at the proposed point");
        }
        Ok(point)
    }
}

/// Scores candidates under a fitted GP for one acquisition function.
struct Scorer<'a> {
    gp: &'a GaussianProcess,
    y_best: f64,
    kappa: f64,
    xi: f64,
    continuous: Vec<usize>,
}

impl Scorer<'_> {
    fn score(&self, acq: AcquisitionFunction, posterior: (f64, f64)) -> f64 {
        acq.score(posterior.0, posterior.1, self.y_best, self.kappa, self.xi)
    }

    fn score_at(&self, acq: AcquisitionFunction, x: &[f64]) -> f64 {
        self.score(acq, self.gp.predict(x))
    }

    /// Best candidate by score, refined by coordinate search from the top
    /// `n_restarts` candidates. Ties go to the earliest candidate.
    fn best(
        &self,
        acq: AcquisitionFunction,
        candidates: &[Vec<f64>],
        posteriors: &[(f64, f64)],
        n_restarts: usize,
    ) -> Vec<f64> {
        let scores: Vec<f64> = posteriors.iter().map(|&p| self.score(acq, p)).collect();
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut best_x = candidates[order[0]].clone();
        let mut best_score = scores[order[0]];

        if self.continuous.is_empty() {
            return best_x;
        }

        for &start in order.iter().take(n_restarts) {
            let (x, score) = self.refine(acq, candidates[start].clone(), scores[start]);
            if score > best_score {
                best_score = score;
                best_x = x;
            }
        }
        best_x
    }

    /// Compass search over the continuous columns, staying inside [0, 1].
    fn refine(&self, acq: AcquisitionFunction, mut x: Vec<f64>, mut score: f64) -> (Vec<f64>, f64) {
        let mut step = LOCAL_STEP;
        while step >= LOCAL_MIN_STEP {
            let mut improved = false;
            for &col in &self.continuous {
                for delta in [step, -step] {
                    let original = x[col];
                    let moved = (original + delta).clamp(0.0, 1.0);
                    if moved == original {
                        continue;
                    }
                    x[col] = moved;
                    let candidate = self.score_at(acq, &x);
                    if candidate > score {
                        score = candidate;
                        improved = true;
                    } else {
                        x[col] = original;
                    }
                }
            }
            if !improved {
                step /= 2.0;
            }
        }
        (x, score)
    }
}
