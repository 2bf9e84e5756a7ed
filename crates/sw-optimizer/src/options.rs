//! Typed configuration for the suggestion engine and sequencer.

use serde::{Deserialize, Serialize};

use sw_surrogate::{AcquisitionFunction, NoiseMode, DEFAULT_N_POINTS, DEFAULT_N_RESTARTS};
use sw_types::{config_error, ObjectiveDirection, SwResult};

/// Optimizer hyperparameters threaded into every surrogate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    #[serde(alias = "acq-func")]
    pub acq_func: AcquisitionFunction,
    /// Exploration weight for LCB.
    pub kappa: f64,
    /// Improvement margin for EI and PI.
    pub xi: f64,
    pub noise: NoiseMode,
    /// Random candidates scored when maximizing the acquisition function.
    #[serde(alias = "n-points")]
    pub n_points: usize,
    /// Best candidates refined by local search.
    #[serde(alias = "n-restarts-optimizer")]
    pub n_restarts_optimizer: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            acq_func: AcquisitionFunction::GpHedge,
            kappa: 1.96,
            xi: 0.01,
            noise: NoiseMode::Gaussian,
            n_points: DEFAULT_N_POINTS,
            n_restarts_optimizer: DEFAULT_N_RESTARTS,
        }
    }
}

impl OptimizerOptions {
    pub fn with_acq_func(mut self, acq_func: AcquisitionFunction) -> Self {
        self.acq_func = acq_func;
        self
    }

    pub fn with_kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }

    pub fn with_xi(mut self, xi: f64) -> Self {
        self.xi = xi;
        self
    }

    pub fn with_noise(mut self, noise: NoiseMode) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_n_points(mut self, n: usize) -> Self {
        self.n_points = n;
        self
    }

    pub fn with_n_restarts_optimizer(mut self, n: usize) -> Self {
        self.n_restarts_optimizer = n;
        self
    }

    pub fn validate(&self) -> SwResult<()> {
        if !self.kappa.is_finite() || self.kappa < 0.0 {
            return Err(config_error!("kappa must be a non-negative number, got {}", self.kappa));
        }
        if !self.xi.is_finite() || self.xi < 0.0 {
            return Err(config_error!("xi must be a non-negative number, got {}", self.xi));
        }
        if let NoiseMode::Fixed(v) = self.noise {
            if !v.is_finite() || v < 0.0 {
                return Err(config_error!("noise variance must be non-negative, got {v}"));
            }
        }
        if self.n_points == 0 {
            return Err(config_error!("n_points must be at least 1"));
        }
        Ok(())
    }
}

/// Per-search settings for the [`Sequencer`](crate::Sequencer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Trials drawn at random before the surrogate model takes over.
    #[serde(alias = "random-starts")]
    pub random_starts: usize,
    pub direction: ObjectiveDirection,
    pub options: OptimizerOptions,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            random_starts: 3,
            direction: ObjectiveDirection::Minimize,
            options: OptimizerOptions::default(),
        }
    }
}

impl SequencerConfig {
    pub fn with_random_starts(mut self, n: usize) -> Self {
        self.random_starts = n;
        self
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_options(mut self, options: OptimizerOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sw_types::SwError;

    #[test]
    fn defaults_match_documented_values() {
        let config = SequencerConfig::default();
        assert_eq!(config.random_starts, 3);
        assert_eq!(config.options.acq_func, AcquisitionFunction::GpHedge);
        assert_eq!(config.options.kappa, 1.96);
        assert_eq!(config.options.xi, 0.01);
        assert_eq!(config.options.noise, NoiseMode::Gaussian);
        assert!(config.options.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_and_hyphenated_options() {
        let options: OptimizerOptions =
            serde_json::from_value(json!({"acq-func": "EI", "noise": 0.1})).unwrap();
        assert_eq!(options.acq_func, AcquisitionFunction::Ei);
        assert_eq!(options.noise, NoiseMode::Fixed(0.1));
        assert_eq!(options.kappa, 1.96);

        let config: SequencerConfig =
            serde_json::from_value(json!({"random-starts": 1, "direction": "maximize"})).unwrap();
        assert_eq!(config.random_starts, 1);
        assert_eq!(config.direction, ObjectiveDirection::Maximize);
    }

    #[test]
    fn unknown_acquisition_function_fails_to_load() {
        let result: Result<OptimizerOptions, _> =
            serde_json::from_value(json!({"acq_func": "UCB"}));
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        for options in [
            OptimizerOptions::default().with_kappa(-1.0),
            OptimizerOptions::default().with_xi(f64::NAN),
            OptimizerOptions::default().with_noise(NoiseMode::Fixed(-0.5)),
            OptimizerOptions::default().with_n_points(0),
        ] {
            assert!(matches!(options.validate(), Err(SwError::Configuration(_))));
        }
    }
}
