//! Experiment descriptors and their normalization.
//!
//! Callers name an experiment either by itself (`"checkout"`) or together
//! with the goals it tracks (`{"checkout": ["purchase", "signup"]}`). Both
//! shapes normalize to one `(identifier, goals)` pair.

use crate::{Error, Result};
use serde_json::Value;

/// How a caller describes an experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentSpec {
    /// Identifier only, no goals
    NamedOnly(String),
    /// Identifier plus the goals it tracks
    WithGoals(String, Vec<String>),
}

impl ExperimentSpec {
    /// The identifier as given, version suffix included.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::NamedOnly(name) | Self::WithGoals(name, _) => name,
        }
    }

    /// Split into `(identifier, goals)`.
    #[must_use]
    pub fn normalize(self) -> (String, Vec<String>) {
        match self {
            Self::NamedOnly(name) => (name, Vec::new()),
            Self::WithGoals(name, goals) => (name, goals),
        }
    }
}

/// Normalize any descriptor into `(identifier, goals)`. Pure, no I/O.
///
/// ```rust
/// use experiment_catalog::normalize_experiment;
///
/// assert_eq!(
///     normalize_experiment(("exp1", "goal1")),
///     ("exp1".to_string(), vec!["goal1".to_string()])
/// );
/// assert_eq!(normalize_experiment("exp1"), ("exp1".to_string(), vec![]));
/// ```
#[must_use]
pub fn normalize_experiment(descriptor: impl Into<ExperimentSpec>) -> (String, Vec<String>) {
    descriptor.into().normalize()
}

/// Canonical store name: the identifier up to its first `:`.
///
/// `"checkout:3"` and `"checkout"` address the same stored experiment.
#[must_use]
pub fn canonical_name(identifier: &str) -> &str {
    identifier.split(':').next().unwrap_or(identifier)
}

impl From<&str> for ExperimentSpec {
    fn from(name: &str) -> Self {
        Self::NamedOnly(name.to_string())
    }
}

impl From<String> for ExperimentSpec {
    fn from(name: String) -> Self {
        Self::NamedOnly(name)
    }
}

impl From<&String> for ExperimentSpec {
    fn from(name: &String) -> Self {
        Self::NamedOnly(name.clone())
    }
}

impl From<(&str, &str)> for ExperimentSpec {
    fn from((name, goal): (&str, &str)) -> Self {
        Self::WithGoals(name.to_string(), vec![goal.to_string()])
    }
}

impl<S: Into<String>> From<(&str, Option<S>)> for ExperimentSpec {
    fn from((name, goal): (&str, Option<S>)) -> Self {
        Self::WithGoals(name.to_string(), goal.map(Into::into).into_iter().collect())
    }
}

impl<S: Into<String>> From<(&str, Vec<S>)> for ExperimentSpec {
    fn from((name, goals): (&str, Vec<S>)) -> Self {
        Self::WithGoals(name.to_string(), goals.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> From<(String, Vec<S>)> for ExperimentSpec {
    fn from((name, goals): (String, Vec<S>)) -> Self {
        Self::WithGoals(name, goals.into_iter().map(Into::into).collect())
    }
}

impl<const N: usize> From<(&str, [&str; N])> for ExperimentSpec {
    fn from((name, goals): (&str, [&str; N])) -> Self {
        Self::WithGoals(
            name.to_string(),
            goals.iter().map(|goal| (*goal).to_string()).collect(),
        )
    }
}

/// Text of a JSON string, number or boolean; `None` for anything else.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

fn goals_from_json(name: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                scalar_text(item).ok_or_else(|| {
                    Error::InvalidDescriptor(format!(
                        "goal of '{name}' must be a scalar, got {item}"
                    ))
                })
            })
            .collect(),
        other => scalar_text(other).map(|goal| vec![goal]).ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "goals of '{name}' must be a scalar or a list, got {other}"
            ))
        }),
    }
}

impl TryFrom<&Value> for ExperimentSpec {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let Some((name, goals)) = map.iter().next() else {
                    return Err(Error::InvalidDescriptor("empty object".to_string()));
                };
                Ok(Self::WithGoals(name.clone(), goals_from_json(name, goals)?))
            }
            Value::Object(map) => Err(Error::InvalidDescriptor(format!(
                "expected a single experiment, got {} entries",
                map.len()
            ))),
            other => scalar_text(other).map(Self::NamedOnly).ok_or_else(|| {
                Error::InvalidDescriptor(format!(
                    "expected a name or {{name: goals}}, got {other}"
                ))
            }),
        }
    }
}
