//! Mapping between search-space points and the unit-scaled vectors the
//! Gaussian process operates on.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use sw_types::{
    data_integrity_error, internal_error, DimensionKind, FlagValue, Point, Prior, SearchSpace,
    SwResult,
};

/// How one dimension is laid out in the model vector.
#[derive(Debug, Clone)]
enum Encoding {
    /// One column, `(v - low) / (high - low)`.
    Linear { low: f64, high: f64 },
    /// One column, linear in `ln v`. Bounds are kept in natural units.
    Log { low: f64, high: f64 },
    /// One column, rounded back to an integer on the way out.
    Integer { low: i64, high: i64 },
    /// No columns: a single-choice categorical is constant.
    Constant,
    /// One 0/1 column selecting between two choices.
    Binary,
    /// One column per choice.
    OneHot { n: usize },
}

impl Encoding {
    fn width(&self) -> usize {
        match self {
            Self::Constant => 0,
            Self::OneHot { n } => *n,
            _ => 1,
        }
    }
}

/// Bidirectional transform for a whole search space.
#[derive(Debug, Clone)]
pub struct SpaceTransform {
    space: SearchSpace,
    encodings: Vec<Encoding>,
    width: usize,
}

impl SpaceTransform {
    pub fn new(space: SearchSpace) -> Self {
        let encodings: Vec<Encoding> = space
            .dimensions()
            .iter()
            .map(|dim| match &dim.kind {
                DimensionKind::Real { low, high, prior: Prior::Uniform } => {
                    Encoding::Linear { low: *low, high: *high }
                }
                DimensionKind::Real { low, high, prior: Prior::LogUniform } => {
                    Encoding::Log { low: *low, high: *high }
                }
                DimensionKind::Integer { low, high } => Encoding::Integer {
                    low: *low,
                    high: *high,
                },
                DimensionKind::Categorical { choices } => match choices.len() {
                    0 | 1 => Encoding::Constant,
                    2 => Encoding::Binary,
                    n => Encoding::OneHot { n },
                },
            })
            .collect();
        let width = encodings.iter().map(Encoding::width).sum();

        Self { space, encodings, width }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Number of model columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Column indices that belong to real-valued dimensions.
    pub fn continuous_columns(&self) -> Vec<usize> {
        let mut columns = Vec::new();
        let mut offset = 0;
        for encoding in &self.encodings {
            if matches!(encoding, Encoding::Linear { .. } | Encoding::Log { .. }) {
                columns.push(offset);
            }
            offset += encoding.width();
        }
        columns
    }

    /// Encode a point. Every coordinate must lie inside its dimension.
    pub fn transform(&self, point: &[FlagValue]) -> SwResult<Vec<f64>> {
        if point.len() != self.encodings.len() {
            return Err(data_integrity_error!(
                "point has {} coordinates but the space has {} dimensions",
                point.len(),
                self.encodings.len()
            ));
        }

        let mut out = Vec::with_capacity(self.width);
        let dims = self.space.dimensions().iter().zip(&self.encodings);
        for ((dim, encoding), value) in dims.zip(point) {
            let value = dim.coerce(value).ok_or_else(|| {
                data_integrity_error!("value '{value}' is outside dimension '{}'", dim.name)
            })?;
            match encoding {
                Encoding::Linear { low, high } => {
                    out.push((value.as_f64().unwrap_or(*low) - low) / (high - low));
                }
                Encoding::Log { low, high } => {
                    let v = value.as_f64().unwrap_or(*low);
                    out.push((v.ln() - low.ln()) / (high.ln() - low.ln()));
                }
                Encoding::Integer { low, high } => {
                    let v = value.as_i64().unwrap_or(*low);
                    out.push((v as f64 - *low as f64) / (*high as f64 - *low as f64));
                }
                Encoding::Constant => {}
                Encoding::Binary | Encoding::OneHot { .. } => {
                    let index = choice_index(dim_choices(&dim.kind), &value);
                    if let Encoding::Binary = encoding {
                        out.push(index as f64);
                    } else {
                        let start = out.len();
                        out.resize(start + encoding.width(), 0.0);
                        out[start + index] = 1.0;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Decode a model vector back into a point, clamping into the domain.
    pub fn inverse(&self, x: &[f64]) -> SwResult<Point> {
        if x.len() != self.width {
            return Err(internal_error!(
                "model vector has {} columns, expected {}",
                x.len(),
                self.width
            ));
        }

        let mut point = Vec::with_capacity(self.encodings.len());
        let mut offset = 0;
        for (dim, encoding) in self.space.dimensions().iter().zip(&self.encodings) {
            let cols = &x[offset..offset + encoding.width()];
            offset += encoding.width();

            let value = match encoding {
                Encoding::Linear { low, high } => FlagValue::Float(snap(cols[0], *low, *high, |t| {
                    low + t * (high - low)
                })),
                Encoding::Log { low, high } => FlagValue::Float(snap(cols[0], *low, *high, |t| {
                    (low.ln() + t * (high.ln() - low.ln())).exp()
                })),
                Encoding::Integer { low, high } => {
                    let t = cols[0].clamp(0.0, 1.0);
                    // f64 span: `high - low` overflows i64 on very wide ranges.
                    let span = *high as f64 - *low as f64;
                    let v = (*low as f64 + t * span).round() as i64;
                    FlagValue::Int(v.clamp(*low, *high))
                }
                Encoding::Constant => dim_choices(&dim.kind)[0].clone(),
                Encoding::Binary => {
                    let index = usize::from(cols[0] >= 0.5);
                    dim_choices(&dim.kind)[index].clone()
                }
                Encoding::OneHot { .. } => {
                    let index = cols
                        .iter()
                        .enumerate()
                        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
                            if v > best.1 { (i, v) } else { best }
                        })
                        .0;
                    dim_choices(&dim.kind)[index].clone()
                }
            };
            point.push(value);
        }
        Ok(point)
    }

    /// Draw one point uniformly from the space (log-uniform dimensions
    /// uniformly in log-space).
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Point {
        self.space
            .dimensions()
            .iter()
            .map(|dim| match &dim.kind {
                DimensionKind::Real { low, high, prior } => {
                    let u: f64 = rng.random();
                    let v = match prior {
                        Prior::Uniform => low + u * (high - low),
                        Prior::LogUniform => (low.ln() + u * (high.ln() - low.ln())).exp(),
                    };
                    FlagValue::Float(v.clamp(*low, *high))
                }
                DimensionKind::Integer { low, high } => {
                    FlagValue::Int(rng.random_range(*low..=*high))
                }
                DimensionKind::Categorical { choices } => {
                    choices[rng.random_range(0..choices.len())].clone()
                }
            })
            .collect()
    }
}

/// Map a unit coordinate onto [low, high], returning the exact bounds at the
/// edges so log-space round-off never escapes the domain.
fn snap(t: f64, low: f64, high: f64, map: impl Fn(f64) -> f64) -> f64 {
    if t.is_nan() || t <= 0.0 {
        low
    } else if t >= 1.0 {
        high
    } else {
        map(t).clamp(low, high)
    }
}

fn dim_choices(kind: &DimensionKind) -> &[FlagValue] {
    match kind {
        DimensionKind::Categorical { choices } => choices,
        _ => &[],
    }
}

fn choice_index(choices: &[FlagValue], value: &FlagValue) -> usize {
    choices.iter().position(|c| c == value).unwrap_or(0)
}
