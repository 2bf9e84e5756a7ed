//! Single-step suggestion engine.
//!
//! Each call builds a fresh surrogate optimizer, tells it the full history
//! and asks it for exactly one point. Nothing survives the call except the
//! returned random state, so any suggestion can be reproduced from its
//! inputs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use sw_surrogate::Optimizer;
use sw_types::{
    data_integrity_error, sequencing_error, Dimension, Point, RandomState, SearchSpace, SwResult,
};

use crate::options::OptimizerOptions;

/// Everything one suggestion depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub dimensions: Vec<Dimension>,
    pub x0: Vec<Point>,
    /// Losses, positionally matched to `x0`.
    pub y0: Vec<f64>,
    /// Draw the point at random instead of from the surrogate model.
    pub random_start: bool,
    pub random_state: RandomState,
    pub options: OptimizerOptions,
}

/// One proposed point and the random state to use next time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub point: Point,
    pub random_state: RandomState,
}

/// Propose exactly one new point.
///
/// A random start makes one random draw; otherwise the point comes from the
/// Gaussian-process model fitted to `x0`/`y0`, which must then be non-empty.
pub fn suggest(request: &SuggestRequest) -> SwResult<Suggestion> {
    request.options.validate()?;
    let space = SearchSpace::new(request.dimensions.clone())?;

    if request.x0.len() != request.y0.len() {
        return Err(data_integrity_error!(
            "history has {} points but {} outcomes",
            request.x0.len(),
            request.y0.len()
        ));
    }
    if !request.random_start && request.x0.is_empty() {
        return Err(sequencing_error!(
            "a model-guided suggestion needs prior observations; start the search with a random trial"
        ));
    }

    let options = &request.options;
    let n_random = usize::from(request.random_start);
    let mut optimizer = Optimizer::new(space, n_random, &request.random_state)
        .acq_func(options.acq_func)
        .kappa(options.kappa)
        .xi(options.xi)
        .noise(options.noise)
        .n_points(options.n_points)
        .n_restarts(options.n_restarts_optimizer);
    optimizer.tell(request.x0.clone(), request.y0.clone())?;

    let point = optimizer.ask()?;
    debug!(
        random_start = request.random_start,
        observations = request.x0.len(),
        ?point,
        "suggested point"
    );

    Ok(Suggestion {
        point,
        random_state: optimizer.random_state(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_surrogate::AcquisitionFunction;
    use sw_types::{DimensionKind, FlagValue, Prior, SearchSpace, SwError};

    fn lr() -> Vec<Dimension> {
        vec![Dimension::real("lr", 0.0001, 0.1, Prior::Uniform).unwrap()]
    }

    fn fast_options() -> OptimizerOptions {
        OptimizerOptions::default().with_n_points(300).with_n_restarts_optimizer(2)
    }

    fn request(x0: Vec<Point>, y0: Vec<f64>, random_start: bool) -> SuggestRequest {
        SuggestRequest {
            dimensions: lr(),
            x0,
            y0,
            random_start,
            random_state: RandomState::from_seed(2024),
            options: fast_options(),
        }
    }

    #[test]
    fn identical_requests_give_identical_suggestions() {
        let history = request(
            vec![vec![FlagValue::Float(0.01)], vec![FlagValue::Float(0.08)]],
            vec![0.5, 0.9],
            false,
        );
        assert_eq!(suggest(&history).unwrap(), suggest(&history).unwrap());

        let random = request(vec![], vec![], true);
        assert_eq!(suggest(&random).unwrap(), suggest(&random).unwrap());
    }

    #[test]
    fn random_start_then_model_step_scenario() {
        let first = suggest(&request(vec![], vec![], true)).unwrap();
        let lr0 = first.point[0].as_f64().unwrap();
        assert!((0.0001..=0.1).contains(&lr0));
        assert_ne!(first.random_state, RandomState::from_seed(2024));

        let mut second = request(vec![vec![FlagValue::Float(0.01)]], vec![0.5], false);
        second.random_state = first.random_state.clone();
        let next = suggest(&second).unwrap();
        let lr1 = next.point[0].as_f64().unwrap();
        assert!((0.0001..=0.1).contains(&lr1));
        assert_ne!(next.random_state, first.random_state);
    }

    #[test]
    fn random_start_ignores_history_for_placement() {
        let with_history = request(vec![vec![FlagValue::Float(0.01)]], vec![0.5], true);
        let without = request(vec![], vec![], true);
        assert_eq!(suggest(&with_history).unwrap(), suggest(&without).unwrap());
    }

    #[test]
    fn model_step_without_history_is_sequencing_error() {
        let err = suggest(&request(vec![], vec![], false)).unwrap_err();
        assert!(matches!(err, SwError::Sequencing(_)));
    }

    #[test]
    fn length_mismatch_is_data_integrity_error() {
        let err = suggest(&request(vec![vec![FlagValue::Float(0.01)]], vec![], false)).unwrap_err();
        assert!(matches!(err, SwError::DataIntegrity(_)));

        let err = suggest(&request(vec![], vec![1.0], true)).unwrap_err();
        assert!(matches!(err, SwError::DataIntegrity(_)));
    }

    #[test]
    fn empty_dimensions_is_configuration_error() {
        let mut req = request(vec![], vec![], true);
        req.dimensions.clear();
        assert!(matches!(suggest(&req), Err(SwError::Configuration(_))));
    }

    #[test]
    fn invalid_options_are_configuration_errors() {
        let mut req = request(vec![], vec![], true);
        req.options = req.options.with_kappa(f64::INFINITY);
        assert!(matches!(suggest(&req), Err(SwError::Configuration(_))));
    }

    #[test]
    fn categorical_suggestions_stay_in_declared_sets() {
        let dimensions = vec![
            Dimension::categorical("arch", vec!["resnet".into()]).unwrap(),
            Dimension::categorical("opt", vec!["adam".into(), "sgd".into(), "rmsprop".into()])
                .unwrap(),
        ];
        let mut state = RandomState::from_seed(77);
        let mut x0: Vec<Point> = Vec::new();
        let mut y0 = Vec::new();

        for trial in 0..8 {
            let req = SuggestRequest {
                dimensions: dimensions.clone(),
                x0: x0.clone(),
                y0: y0.clone(),
                random_start: trial < 2,
                random_state: state.clone(),
                options: fast_options().with_acq_func(AcquisitionFunction::Ei),
            };
            let suggestion = suggest(&req).unwrap();
            for (dim, value) in dimensions.iter().zip(&suggestion.point) {
                assert!(dim.contains(value), "{value} not in {}", dim.name);
            }
            state = suggestion.random_state;
            x0.push(suggestion.point);
            y0.push(trial as f64 * 0.1);
        }
    }

    #[test]
    fn hand_built_malformed_dimensions_are_configuration_errors() {
        let inverted = Dimension {
            name: "n".into(),
            kind: DimensionKind::Integer { low: 5, high: 1 },
            initial: None,
        };
        let empty = Dimension {
            name: "opt".into(),
            kind: DimensionKind::Categorical { choices: vec![] },
            initial: None,
        };
        for dim in [inverted, empty] {
            let mut req = request(vec![], vec![], true);
            req.dimensions = vec![dim];
            assert!(matches!(suggest(&req), Err(SwError::Configuration(_))));
        }

        let mut value = serde_json::to_value(request(vec![], vec![], true)).unwrap();
        value["dimensions"][0]["kind"] = serde_json::json!({"Integer": {"low": 5, "high": 1}});
        let req: SuggestRequest = serde_json::from_value(value).unwrap();
        assert!(matches!(suggest(&req), Err(SwError::Configuration(_))));
    }

    #[test]
    fn wide_integer_range_model_step_stays_in_domain() {
        let dimensions = vec![Dimension::integer("n", i64::MIN, i64::MAX).unwrap()];
        let req = SuggestRequest {
            dimensions: dimensions.clone(),
            x0: vec![vec![FlagValue::Int(3)]],
            y0: vec![0.5],
            random_start: false,
            random_state: RandomState::from_seed(6),
            options: fast_options(),
        };
        let suggestion = suggest(&req).unwrap();
        assert!(dimensions[0].contains(&suggestion.point[0]));
    }

    #[test]
    fn mixed_space_model_steps_stay_in_domain() {
        let dimensions = vec![
            Dimension::real("lr", 1e-5, 1e-1, Prior::LogUniform).unwrap(),
            Dimension::integer("layers", 1, 6).unwrap(),
            Dimension::categorical("bias", vec![true.into(), false.into()]).unwrap(),
            Dimension::categorical("opt", vec!["adam".into(), "sgd".into(), "rmsprop".into()])
                .unwrap(),
            Dimension::real("dropout", 0.0, 0.5, Prior::Uniform).unwrap(),
        ];
        let space = SearchSpace::new(dimensions.clone()).unwrap();

        for acq in [
            AcquisitionFunction::GpHedge,
            AcquisitionFunction::Lcb,
            AcquisitionFunction::Ei,
        ] {
            let mut state = RandomState::from_seed(31);
            let mut x0: Vec<Point> = Vec::new();
            let mut y0: Vec<f64> = Vec::new();

            for trial in 0..7 {
                let req = SuggestRequest {
                    dimensions: dimensions.clone(),
                    x0: x0.clone(),
                    y0: y0.clone(),
                    random_start: trial < 2,
                    random_state: state.clone(),
                    options: fast_options().with_acq_func(acq),
                };
                let suggestion = suggest(&req).unwrap();
                assert!(
                    space.contains(&suggestion.point),
                    "{acq} trial {trial}: {:?}",
                    suggestion.point
                );
                assert!(matches!(suggestion.point[1], FlagValue::Int(_)));

                let lr = suggestion.point[0].as_f64().unwrap();
                let layers = suggestion.point[1].as_f64().unwrap();
                state = suggestion.random_state;
                x0.push(suggestion.point);
                y0.push((lr.ln() + 7.0).powi(2) + (layers - 3.0).powi(2));
            }
        }
    }
}
