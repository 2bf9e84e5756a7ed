//! # sw-surrogate
//!
//! Gaussian-process sequential optimizer used by Stepwise as a propose-only
//! oracle: tell it the history, ask it for exactly one point.
//!
//! Provides the space transform, a Matérn 5/2 GP with marginal-likelihood
//! hyperparameter selection, the `LCB`/`EI`/`PI`/`gp_hedge` acquisition
//! functions and an ask/tell [`Optimizer`] whose randomness is drawn from an
//! explicit [`RandomState`](sw_types::RandomState).

mod acquisition;
mod gp;
mod optimizer;
mod transform;

pub use acquisition::AcquisitionFunction;
pub use gp::{GaussianProcess, NoiseMode};
pub use optimizer::{Optimizer, DEFAULT_N_POINTS, DEFAULT_N_RESTARTS};
pub use transform::SpaceTransform;
