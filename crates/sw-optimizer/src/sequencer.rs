//! One-suggestion-per-call driver for a resumable search.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use sw_types::{FlagDeclarations, FlagValue, RandomState, SwResult, TrialRecord};

use crate::dimensions::map_dimensions;
use crate::engine::{suggest, SuggestRequest};
use crate::history::replay_history;
use crate::options::SequencerConfig;

/// Where a search stands for a given trial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    /// Trial index below the configured number of random starts.
    #[serde(rename = "random_start")]
    AwaitingRandomStart,
    /// Every later trial is proposed by the surrogate model.
    #[serde(rename = "model_suggestion")]
    AwaitingModelSuggestion,
}

impl SearchPhase {
    pub fn for_trial(trial_index: usize, random_starts: usize) -> Self {
        if trial_index < random_starts {
            Self::AwaitingRandomStart
        } else {
            Self::AwaitingModelSuggestion
        }
    }

    pub fn is_random_start(self) -> bool {
        self == Self::AwaitingRandomStart
    }
}

impl std::fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingRandomStart => write!(f, "random_start"),
            Self::AwaitingModelSuggestion => write!(f, "model_suggestion"),
        }
    }
}

/// Source of completed trials for the current search.
///
/// Called once per suggestion; must reflect every trial completed so far.
pub trait PriorResults {
    fn prior_results(&self) -> SwResult<Vec<TrialRecord>>;
}

impl<F> PriorResults for F
where
    F: Fn() -> SwResult<Vec<TrialRecord>>,
{
    fn prior_results(&self) -> SwResult<Vec<TrialRecord>> {
        self()
    }
}

/// The flags for the next trial plus the random state to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSuggestion {
    /// Suggested search values merged with the fixed flags.
    pub flags: BTreeMap<String, FlagValue>,
    pub random_state: RandomState,
    pub phase: SearchPhase,
    pub trial_index: usize,
}

/// Drives a search one trial at a time.
///
/// Holds only configuration; all search state arrives through
/// [`next_trial`](Self::next_trial) and leaves through its result.
#[derive(Debug, Clone)]
pub struct Sequencer {
    flags: FlagDeclarations,
    config: SequencerConfig,
}

impl Sequencer {
    /// Validates the flag declarations and options up front so that
    /// misconfiguration surfaces before any trial history is read.
    pub fn new(flags: FlagDeclarations, config: SequencerConfig) -> SwResult<Self> {
        config.options.validate()?;
        map_dimensions(&flags)?;
        Ok(Self { flags, config })
    }

    /// Compute the flags for trial `trial_index` (zero-based).
    pub fn next_trial(
        &self,
        trial_index: usize,
        random_state: RandomState,
        prior: &impl PriorResults,
    ) -> SwResult<TrialSuggestion> {
        let mapped = map_dimensions(&self.flags)?;
        let records = prior.prior_results()?;
        let history = replay_history(&mapped.space, &records, self.config.direction)?;
        let phase = SearchPhase::for_trial(trial_index, self.config.random_starts);

        info!(
            trial_index,
            phase = %phase,
            observations = history.len(),
            skipped = history.skipped,
            "suggesting next trial"
        );

        let initial = match (phase, trial_index, history.is_empty()) {
            (SearchPhase::AwaitingRandomStart, 0, true) => mapped.space.initial_point(),
            _ => None,
        };

        let (point, random_state) = match initial {
            Some(point) => {
                info!("using declared initial values for the first trial");
                (point, random_state)
            }
            None => {
                let suggestion = suggest(&SuggestRequest {
                    dimensions: mapped.space.dimensions().to_vec(),
                    x0: history.x0,
                    y0: history.y0,
                    random_start: phase.is_random_start(),
                    random_state,
                    options: self.config.options.clone(),
                })?;
                (suggestion.point, suggestion.random_state)
            }
        };

        let mut flags = mapped.fixed;
        for (name, value) in mapped.space.names().zip(point) {
            flags.insert(name.to_string(), value);
        }

        Ok(TrialSuggestion {
            flags,
            random_state,
            phase,
            trial_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptimizerOptions;
    use sw_types::{FlagDomain, ObjectiveDirection, SwError};

    fn config(random_starts: usize) -> SequencerConfig {
        SequencerConfig::default()
            .with_random_starts(random_starts)
            .with_options(
                OptimizerOptions::default()
                    .with_n_points(300)
                    .with_n_restarts_optimizer(2),
            )
    }

    fn prior(records: Vec<TrialRecord>) -> impl Fn() -> SwResult<Vec<TrialRecord>> {
        move || Ok(records.clone())
    }

    fn lr_flags() -> FlagDeclarations {
        let mut flags = FlagDeclarations::new();
        flags.insert("lr".into(), FlagDomain::uniform(0.0001, 0.1));
        flags.insert("epochs".into(), FlagDomain::fixed(5_i64));
        flags
    }

    #[test]
    fn phase_follows_trial_index() {
        assert_eq!(SearchPhase::for_trial(0, 3), SearchPhase::AwaitingRandomStart);
        assert_eq!(SearchPhase::for_trial(2, 3), SearchPhase::AwaitingRandomStart);
        assert_eq!(SearchPhase::for_trial(3, 3), SearchPhase::AwaitingModelSuggestion);
        assert_eq!(SearchPhase::for_trial(0, 0), SearchPhase::AwaitingModelSuggestion);
    }

    #[test]
    fn two_trial_scenario_with_one_random_start() {
        let sequencer = Sequencer::new(lr_flags(), config(1)).unwrap();

        let first = sequencer
            .next_trial(0, RandomState::from_seed(1), &prior(Vec::new()))
            .unwrap();
        assert_eq!(first.phase, SearchPhase::AwaitingRandomStart);
        assert_eq!(first.flags["epochs"], FlagValue::Int(5));
        let lr = first.flags["lr"].as_f64().unwrap();
        assert!((0.0001..=0.1).contains(&lr));

        let history = vec![TrialRecord::completed(0.5)
            .with_flag("lr", 0.01)
            .with_flag("epochs", 5_i64)];
        let second = sequencer
            .next_trial(1, first.random_state.clone(), &prior(history.clone()))
            .unwrap();
        assert_eq!(second.phase, SearchPhase::AwaitingModelSuggestion);
        let lr = second.flags["lr"].as_f64().unwrap();
        assert!((0.0001..=0.1).contains(&lr));
        assert_ne!(second.random_state, first.random_state);
    }

    #[test]
    fn replaying_a_call_reproduces_it() {
        let sequencer = Sequencer::new(lr_flags(), config(1)).unwrap();
        let history = vec![
            TrialRecord::completed(0.5).with_flag("lr", 0.01),
            TrialRecord::completed(0.2).with_flag("lr", 0.04),
        ];
        let source = prior(history);

        let a = sequencer.next_trial(2, RandomState::from_seed(8), &source).unwrap();
        let b = sequencer.next_trial(2, RandomState::from_seed(8), &source).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn model_phase_without_completed_trials_is_sequencing_error() {
        let sequencer = Sequencer::new(lr_flags(), config(0)).unwrap();
        let err = sequencer
            .next_trial(0, RandomState::from_seed(1), &prior(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, SwError::Sequencing(_)));

        // Pending trials do not count as history.
        let pending = vec![TrialRecord::pending().with_flag("lr", 0.01)];
        let err = sequencer
            .next_trial(1, RandomState::from_seed(1), &prior(pending.clone()))
            .unwrap_err();
        assert!(matches!(err, SwError::Sequencing(_)));
    }

    #[test]
    fn first_trial_uses_declared_initial_values() {
        let mut flags = FlagDeclarations::new();
        flags.insert(
            "lr".into(),
            FlagDomain::Uniform {
                low: 0.0001,
                high: 0.1,
                initial: Some(0.01),
            },
        );
        let sequencer = Sequencer::new(flags, config(2)).unwrap();
        let token = RandomState::from_seed(3);

        let first = sequencer.next_trial(0, token.clone(), &prior(Vec::new())).unwrap();
        assert_eq!(first.flags["lr"], FlagValue::Float(0.01));
        assert_eq!(first.random_state, token);

        let second = sequencer.next_trial(1, token.clone(), &prior(Vec::new())).unwrap();
        assert_eq!(second.phase, SearchPhase::AwaitingRandomStart);
        assert_ne!(second.random_state, token);
    }

    #[test]
    fn corrupt_history_surfaces_as_data_integrity_error() {
        let sequencer = Sequencer::new(lr_flags(), config(1)).unwrap();
        let history = vec![TrialRecord::completed(0.5).with_flag("lr", 7.0)];
        let err = sequencer
            .next_trial(1, RandomState::from_seed(1), &prior(history.clone()))
            .unwrap_err();
        assert!(matches!(err, SwError::DataIntegrity(_)));
    }

    #[test]
    fn callback_errors_propagate() {
        let sequencer = Sequencer::new(lr_flags(), config(1)).unwrap();
        let err = sequencer
            .next_trial(0, RandomState::from_seed(1), &|| -> SwResult<Vec<TrialRecord>> {
                Err(SwError::Internal("run index unavailable".into()))
            })
            .unwrap_err();
        assert!(matches!(err, SwError::Internal(_)));
    }

    #[test]
    fn rejects_bad_configuration_up_front() {
        let mut flags = lr_flags();
        flags.insert("momentum".into(), FlagDomain::uniform(0.9, 0.1));
        assert!(matches!(
            Sequencer::new(flags, config(1)),
            Err(SwError::Configuration(_))
        ));

        let bad = config(1).with_options(OptimizerOptions::default().with_xi(-1.0));
        assert!(matches!(Sequencer::new(lr_flags(), bad), Err(SwError::Configuration(_))));
    }

    #[test]
    fn full_width_integer_flag_reaches_model_phase() {
        let mut flags = FlagDeclarations::new();
        flags.insert("n".into(), FlagDomain::int_range(i64::MIN, i64::MAX));
        let sequencer = Sequencer::new(flags, config(1)).unwrap();

        let history = vec![TrialRecord::completed(0.5).with_flag("n", 3_i64)];
        let next = sequencer
            .next_trial(1, RandomState::from_seed(2), &prior(history))
            .unwrap();
        assert_eq!(next.phase, SearchPhase::AwaitingModelSuggestion);
        assert!(matches!(next.flags["n"], FlagValue::Int(_)));
    }

    #[test]
    fn maximize_direction_is_accepted() {
        let config = config(1).with_direction(ObjectiveDirection::Maximize);
        let sequencer = Sequencer::new(lr_flags(), config).unwrap();
        let history = vec![
            TrialRecord::completed(0.91).with_flag("lr", 0.01),
            TrialRecord::completed(0.42).with_flag("lr", 0.09),
        ];
        let next = sequencer
            .next_trial(2, RandomState::from_seed(4), &prior(history.clone()))
            .unwrap();
        assert!(next.flags.contains_key("lr"));
    }
}
