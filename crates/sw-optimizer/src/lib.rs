//! # sw-optimizer
//!
//! Resumable, one-trial-at-a-time Bayesian search for Stepwise.
//!
//! Every call is independent: the caller replays the full trial history and
//! the random state returned by the previous call, and receives the flags for
//! the next trial plus a new random state to persist.
//!
//! - [`map_dimensions`] turns flag declarations into an ordered search space.
//! - [`replay_history`] aligns prior trial records into `x0`/`y0`.
//! - [`suggest`] runs a single propose-only step of the GP optimizer.
//! - [`Sequencer`] ties the three together per trial.

mod dimensions;
mod engine;
mod history;
mod options;
mod sequencer;

pub use dimensions::{map_dimensions, MappedFlags};
pub use engine::{suggest, SuggestRequest, Suggestion};
pub use history::{replay_history, History};
pub use options::{OptimizerOptions, SequencerConfig};
pub use sequencer::{PriorResults, SearchPhase, Sequencer, TrialSuggestion};

pub use sw_surrogate::{AcquisitionFunction, NoiseMode};
