//! Maps declared flags onto an ordered search space.

use std::collections::BTreeMap;

use sw_types::{config_error, Dimension, FlagDomain, FlagValue, Prior, SearchSpace, SwResult};

/// Declared flags split into the searched dimensions and the constants that
/// ride along with every trial.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedFlags {
    pub space: SearchSpace,
    pub fixed: BTreeMap<String, FlagValue>,
}

/// Translate flag declarations into a search space ordered by flag name.
///
/// Fixed flags are set aside. Fails with a configuration error when a domain
/// is malformed or when no flag is searchable.
pub fn map_dimensions<'a, I>(flags: I) -> SwResult<MappedFlags>
where
    I: IntoIterator<Item = (&'a String, &'a FlagDomain)>,
{
    let mut flags: Vec<(&String, &FlagDomain)> = flags.into_iter().collect();
    flags.sort_by(|a, b| a.0.cmp(b.0));

    let mut dimensions = Vec::new();
    let mut fixed = BTreeMap::new();

    for (name, domain) in flags {
        let dimension = match domain {
            FlagDomain::Uniform { low, high, initial } => with_initial(
                Dimension::real(name, *low, *high, Prior::Uniform)?,
                initial.map(FlagValue::Float),
            )?,
            FlagDomain::LogUniform { low, high, initial } => with_initial(
                Dimension::real(name, *low, *high, Prior::LogUniform)?,
                initial.map(FlagValue::Float),
            )?,
            FlagDomain::IntRange { low, high, initial } => {
                with_initial(Dimension::integer(name, *low, *high)?, initial.map(FlagValue::Int))?
            }
            FlagDomain::Choice { values } => Dimension::categorical(name, values.clone())?,
            FlagDomain::Fixed(value) => {
                fixed.insert(name.clone(), value.clone());
                continue;
            }
        };
        dimensions.push(dimension);
    }

    if dimensions.is_empty() {
        return Err(config_error!("no search dimensions: every declared flag is fixed"));
    }

    Ok(MappedFlags {
        space: SearchSpace::new(dimensions)?,
        fixed,
    })
}

fn with_initial(dimension: Dimension, initial: Option<FlagValue>) -> SwResult<Dimension> {
    match initial {
        Some(value) => dimension.with_initial(value),
        None => Ok(dimension),
    }
}
