//! Observed trial outcomes replayed into each suggestion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::flags::FlagValue;

/// Whether the objective is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveDirection {
    #[default]
    Minimize,
    Maximize,
}

impl ObjectiveDirection {
    /// Convert an observed objective into a loss (lower is better).
    pub fn to_loss(self, objective: f64) -> f64 {
        match self {
            Self::Minimize => objective,
            Self::Maximize => -objective,
        }
    }
}

/// A previously run trial: the flags it ran with and the objective it
/// reported. `objective` is `None` while the trial is pending or when it
/// failed before reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub flags: BTreeMap<String, FlagValue>,
    #[serde(default)]
    pub objective: Option<f64>,
}

impl TrialRecord {
    pub fn new(objective: Option<f64>) -> Self {
        Self {
            flags: BTreeMap::new(),
            objective,
        }
    }

    pub fn completed(objective: f64) -> Self {
        Self::new(Some(objective))
    }

    pub fn pending() -> Self {
        Self::new(None)
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.objective.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maximize_negates_objective() {
        assert_eq!(ObjectiveDirection::Minimize.to_loss(0.8), 0.8);
        assert_eq!(ObjectiveDirection::Maximize.to_loss(0.8), -0.8);
        assert_eq!(ObjectiveDirection::default(), ObjectiveDirection::Minimize);
    }

    #[test]
    fn record_deserializes_without_objective() {
        let record: TrialRecord =
            serde_json::from_value(json!({"flags": {"lr": 0.01, "opt": "adam"}})).unwrap();
        assert!(!record.is_completed());
        assert_eq!(record.flags["lr"], FlagValue::Float(0.01));
        assert_eq!(record.flags["opt"], FlagValue::Str("adam".into()));
    }

    #[test]
    fn builder_collects_flags() {
        let record = TrialRecord::completed(0.5).with_flag("lr", 0.01).with_flag("layers", 3_i64);
        assert_eq!(record.flags.len(), 2);
        assert_eq!(record.objective, Some(0.5));
        assert!(!TrialRecord::pending().is_completed());
    }
}
