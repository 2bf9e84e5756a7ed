//! Replays prior trial records into positional `x0`/`y0` arrays.

use tracing::debug;

use sw_types::{
    data_integrity_error, ObjectiveDirection, Point, SearchSpace, SwResult, TrialRecord,
};

/// Prior observations aligned with the search space's dimension order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub x0: Vec<Point>,
    /// Losses (lower is better), one per entry of `x0`.
    pub y0: Vec<f64>,
    /// Records without an objective value that were left out.
    pub skipped: usize,
}

impl History {
    pub fn len(&self) -> usize {
        self.x0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x0.is_empty()
    }
}

/// Convert trial records into `(x0, y0)` in the order they were given.
///
/// Records with no objective are skipped. A completed record missing a
/// search flag, holding a value outside its dimension, or reporting a
/// non-finite objective is a data-integrity error.
pub fn replay_history(
    space: &SearchSpace,
    records: &[TrialRecord],
    direction: ObjectiveDirection,
) -> SwResult<History> {
    let mut history = History::default();

    for (i, record) in records.iter().enumerate() {
        let Some(objective) = record.objective else {
            debug!(record = i, "skipping trial without an objective value");
            history.skipped += 1;
            continue;
        };
        if !objective.is_finite() {
            return Err(data_integrity_error!("trial {i} reported objective {objective}"));
        }

        let point = space
            .dimensions()
            .iter()
            .map(|dim| {
                let value = record.flags.get(&dim.name).ok_or_else(|| {
                    data_integrity_error!("trial {i} has no value for flag '{}'", dim.name)
                })?;
                dim.coerce(value).ok_or_else(|| {
                    data_integrity_error!(
                        "trial {i} flag '{}' value '{value}' is outside its domain",
                        dim.name
                    )
                })
            })
            .collect::<SwResult<Point>>()?;

        history.x0.push(point);
        history.y0.push(direction.to_loss(objective));
    }

    Ok(history)
}
