//! Search dimensions and the ordered search space.

use serde::{Deserialize, Serialize};

use crate::errors::SwResult;
use crate::flags::FlagValue;
use crate::config_error;

/// How a continuous dimension is sampled and modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Prior {
    Uniform,
    LogUniform,
}

/// The domain of a single search axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DimensionKind {
    Real { low: f64, high: f64, prior: Prior },
    Integer { low: i64, high: i64 },
    Categorical { choices: Vec<FlagValue> },
}

/// A named, validated search axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub kind: DimensionKind,
    /// Value to use for the very first trial, if declared.
    pub initial: Option<FlagValue>,
}

/// A point in the search space, positional against dimension order.
pub type Point = Vec<FlagValue>;

impl Dimension {
    pub fn real(name: impl Into<String>, low: f64, high: f64, prior: Prior) -> SwResult<Self> {
        Self::checked(name.into(), DimensionKind::Real { low, high, prior })
    }

    pub fn integer(name: impl Into<String>, low: i64, high: i64) -> SwResult<Self> {
        Self::checked(name.into(), DimensionKind::Integer { low, high })
    }

    pub fn categorical(name: impl Into<String>, choices: Vec<FlagValue>) -> SwResult<Self> {
        Self::checked(name.into(), DimensionKind::Categorical { choices })
    }

    fn checked(name: String, kind: DimensionKind) -> SwResult<Self> {
        let dimension = Self {
            name,
            kind,
            initial: None,
        };
        dimension.validate()?;
        Ok(dimension)
    }

    /// Check the domain invariants. Fields are public, so a dimension built
    /// by hand or deserialized must pass through here before it is searched.
    pub fn validate(&self) -> SwResult<()> {
        let name = &self.name;
        match &self.kind {
            DimensionKind::Real { low, high, prior } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(config_error!("dimension '{name}' has non-finite bounds"));
                }
                if low >= high {
                    return Err(config_error!(
                        "dimension '{name}' has inverted or empty range [{low}, {high}]"
                    ));
                }
                if *prior == Prior::LogUniform && *low <= 0.0 {
                    return Err(config_error!(
                        "dimension '{name}' is log-uniform but its lower bound {low} is not positive"
                    ));
                }
            }
            DimensionKind::Integer { low, high } => {
                if low >= high {
                    return Err(config_error!(
                        "dimension '{name}' has inverted or empty range [{low}, {high}]"
                    ));
                }
            }
            DimensionKind::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(config_error!("dimension '{name}' has no choices"));
                }
                for (i, a) in choices.iter().enumerate() {
                    if choices[..i].iter().any(|b| a.loosely_eq(b)) {
                        return Err(config_error!("dimension '{name}' lists choice '{a}' twice"));
                    }
                }
            }
        }
        if let Some(initial) = &self.initial {
            if !self.contains(initial) {
                return Err(config_error!(
                    "initial value '{initial}' is outside dimension '{name}'"
                ));
            }
        }
        Ok(())
    }

    /// Attach an initial value. It must lie inside the domain.
    pub fn with_initial(mut self, value: FlagValue) -> SwResult<Self> {
        let value = self.coerce(&value).ok_or_else(|| {
            config_error!("initial value '{value}' is outside dimension '{}'", self.name)
        })?;
        self.initial = Some(value);
        Ok(self)
    }

    /// Map `value` to this dimension's native representation, or `None` if
    /// it lies outside the domain.
    ///
    /// Integers are accepted for real dimensions and integral floats for
    /// integer dimensions. Categorical values resolve to the declared choice.
    pub fn coerce(&self, value: &FlagValue) -> Option<FlagValue> {
        match &self.kind {
            DimensionKind::Real { low, high, .. } => {
                let v = value.as_f64()?;
                (v.is_finite() && v >= *low && v <= *high).then_some(FlagValue::Float(v))
            }
            DimensionKind::Integer { low, high } => {
                let v = value.as_i64()?;
                (v >= *low && v <= *high).then_some(FlagValue::Int(v))
            }
            DimensionKind::Categorical { choices } => {
                choices.iter().find(|c| c.loosely_eq(value)).cloned()
            }
        }
    }

    pub fn contains(&self, value: &FlagValue) -> bool {
        self.coerce(value).is_some()
    }

}

/// The full search space: an ordered list of dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    dimensions: Vec<Dimension>,
}

impl SearchSpace {
    /// Build a space from dimensions. Each dimension is validated, names
    /// must be unique and at least one dimension is required.
    pub fn new(dimensions: Vec<Dimension>) -> SwResult<Self> {
        if dimensions.is_empty() {
            return Err(config_error!("search space has no dimensions"));
        }
        for (i, dim) in dimensions.iter().enumerate() {
            dim.validate()?;
            if dimensions[..i].iter().any(|d| d.name == dim.name) {
                return Err(config_error!("dimension '{}' is declared twice", dim.name));
            }
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    /// Whether `point` has one in-domain coordinate per dimension.
    pub fn contains(&self, point: &[FlagValue]) -> bool {
        point.len() == self.dimensions.len()
            && self
                .dimensions
                .iter()
                .zip(point)
                .all(|(dim, value)| dim.contains(value))
    }

    /// The declared initial point, if every dimension has an initial value.
    pub fn initial_point(&self) -> Option<Point> {
        self.dimensions
            .iter()
            .map(|d| d.initial.as_ref().and_then(|v| d.coerce(v)))
            .collect()
    }
}
