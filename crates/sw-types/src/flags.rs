//! Flag values and declared flag domains.
//!
//! A flag declaration maps a flag name to a [`FlagDomain`]. Domains are read
//! from JSON either in structured form (`{"type": "uniform", ...}`), as a
//! choice list, as a plain scalar (a fixed value), or as a string in
//! search-function syntax such as `loguniform[1e-4:0.1]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::errors::{SwError, SwResult};
use crate::config_error;

/// A concrete flag value, either declared or suggested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FlagValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the value. Floats qualify only when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
            _ => None,
        }
    }

    /// Equality that treats `Int(1)` and `Float(1.0)` as the same value.
    pub fn loosely_eq(&self, other: &FlagValue) -> bool {
        match (self, other) {
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => self == other,
        }
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for FlagValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FlagValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FlagValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// The declared domain of a single flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "DomainSpec")]
pub enum FlagDomain {
    /// Continuous uniform range [low, high].
    Uniform { low: f64, high: f64, initial: Option<f64> },
    /// Continuous range sampled uniformly in log-space.
    LogUniform { low: f64, high: f64, initial: Option<f64> },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64, initial: Option<i64> },
    /// Categorical choices.
    Choice { values: Vec<FlagValue> },
    /// A constant that is passed through but never searched.
    Fixed(FlagValue),
}

impl FlagDomain {
    pub fn uniform(low: f64, high: f64) -> Self {
        Self::Uniform { low, high, initial: None }
    }

    pub fn log_uniform(low: f64, high: f64) -> Self {
        Self::LogUniform { low, high, initial: None }
    }

    pub fn int_range(low: i64, high: i64) -> Self {
        Self::IntRange { low, high, initial: None }
    }

    pub fn choice<V: Into<FlagValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Choice {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fixed(value: impl Into<FlagValue>) -> Self {
        Self::Fixed(value.into())
    }
}

/// Flag name to declared domain. Iteration order is lexicographic by name.
pub type FlagDeclarations = BTreeMap<String, FlagDomain>;

/// Structured JSON form of a [`FlagDomain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DomainSpec {
    Uniform {
        low: f64,
        high: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<f64>,
    },
    LogUniform {
        low: f64,
        high: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<f64>,
    },
    Int {
        low: i64,
        high: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial: Option<i64>,
    },
    Choice {
        values: Vec<FlagValue>,
    },
    Fixed {
        value: FlagValue,
    },
}

impl From<FlagDomain> for DomainSpec {
    fn from(domain: FlagDomain) -> Self {
        match domain {
            FlagDomain::Uniform { low, high, initial } => Self::Uniform { low, high, initial },
            FlagDomain::LogUniform { low, high, initial } => {
                Self::LogUniform { low, high, initial }
            }
            FlagDomain::IntRange { low, high, initial } => Self::Int { low, high, initial },
            FlagDomain::Choice { values } => Self::Choice { values },
            FlagDomain::Fixed(value) => Self::Fixed { value },
        }
    }
}

impl From<DomainSpec> for FlagDomain {
    fn from(spec: DomainSpec) -> Self {
        match spec {
            DomainSpec::Uniform { low, high, initial } => Self::Uniform { low, high, initial },
            DomainSpec::LogUniform { low, high, initial } => {
                Self::LogUniform { low, high, initial }
            }
            DomainSpec::Int { low, high, initial } => Self::IntRange { low, high, initial },
            DomainSpec::Choice { values } => Self::Choice { values },
            DomainSpec::Fixed { value } => Self::Fixed(value),
        }
    }
}

impl TryFrom<serde_json::Value> for FlagDomain {
    type Error = SwError;

    fn try_from(value: serde_json::Value) -> SwResult<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Err(config_error!("flag domain is unspecified")),
            Value::String(s) => s.parse(),
            Value::Array(items) => {
                let values = items
                    .into_iter()
                    .map(scalar_value)
                    .collect::<SwResult<Vec<_>>>()?;
                Ok(Self::Choice { values })
            }
            Value::Object(_) => {
                let spec: DomainSpec = serde_json::from_value(value)
                    .map_err(|e| config_error!("malformed flag domain: {e}"))?;
                Ok(spec.into())
            }
            scalar => Ok(Self::Fixed(scalar_value(scalar)?)),
        }
    }
}

fn scalar_value(value: serde_json::Value) -> SwResult<FlagValue> {
    use serde_json::Value;

    match value {
        Value::Bool(b) => Ok(FlagValue::Bool(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(FlagValue::Int(i)),
            None => n
                .as_f64()
                .map(FlagValue::Float)
                .ok_or_else(|| config_error!("unrepresentable number: {n}")),
        },
        Value::String(s) => Ok(FlagValue::Str(s)),
        other => Err(config_error!("expected a scalar flag value, got {other}")),
    }
}

impl FromStr for FlagDomain {
    type Err = SwError;

    /// Parses search-function syntax: `uniform[low:high]`,
    /// `loguniform[low:high]` or `[low:high]`, each with an optional
    /// `:initial` suffix. Anything else is a fixed string value.
    fn from_str(s: &str) -> SwResult<Self> {
        let trimmed = s.trim();
        let (func, args) = match (trimmed.find('['), trimmed.ends_with(']')) {
            (Some(open), true) => (&trimmed[..open], &trimmed[open + 1..trimmed.len() - 1]),
            _ => return Ok(Self::Fixed(FlagValue::Str(s.to_string()))),
        };

        if !matches!(func, "" | "uniform" | "loguniform") {
            return Ok(Self::Fixed(FlagValue::Str(s.to_string())));
        }

        let parts: Vec<&str> = args.split(':').map(str::trim).collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(config_error!(
                "search function '{trimmed}' expects [low:high] or [low:high:initial]"
            ));
        }

        if func.is_empty() {
            let ints: Option<Vec<i64>> = parts.iter().map(|p| p.parse().ok()).collect();
            if let Some(ints) = ints {
                return Ok(Self::IntRange {
                    low: ints[0],
                    high: ints[1],
                    initial: ints.get(2).copied(),
                });
            }
        }

        let floats = parts
            .iter()
            .map(|p| {
                p.parse::<f64>()
                    .map_err(|_| config_error!("invalid bound '{p}' in '{trimmed}'"))
            })
            .collect::<SwResult<Vec<f64>>>()?;
        let (low, high, initial) = (floats[0], floats[1], floats.get(2).copied());

        Ok(match func {
            "loguniform" => Self::LogUniform { low, high, initial },
            _ => Self::Uniform { low, high, initial },
        })
    }
}
