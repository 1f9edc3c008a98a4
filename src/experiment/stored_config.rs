//! Stored config - field encoding of the per-experiment hash

use crate::kv::FieldSet;
use crate::{Error, Result};

pub(crate) const ALTERNATIVES: &str = "alternatives";
pub(crate) const GOALS: &str = "goals";
pub(crate) const RESETTABLE: &str = "resettable";
pub(crate) const VERSION: &str = "version";

/// Decoded contents of an experiment's config hash.
///
/// `alternatives` and `goals` are JSON string arrays; `resettable` is
/// `"true"`/`"false"`; `version` is a decimal counter. Only `alternatives`
/// is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredConfig {
    pub(crate) alternatives: Vec<String>,
    pub(crate) goals: Vec<String>,
    pub(crate) resettable: bool,
    pub(crate) version: u64,
}

fn corrupt(name: &str, reason: impl Into<String>) -> Error {
    Error::CorruptExperiment {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn string_list(name: &str, field: &str, raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| corrupt(name, format!("bad {field} field: {e}")))
}

impl StoredConfig {
    pub(crate) fn parse(name: &str, fields: &FieldSet) -> Result<Self> {
        if fields.is_empty() {
            return Err(corrupt(name, "no stored config"));
        }
        let alternatives = fields
            .get(ALTERNATIVES)
            .ok_or_else(|| corrupt(name, "missing alternatives field"))
            .and_then(|raw| string_list(name, ALTERNATIVES, raw))?;
        let goals = match fields.get(GOALS) {
            Some(raw) => string_list(name, GOALS, raw)?,
            None => Vec::new(),
        };
        let resettable = match fields.get(RESETTABLE).map(String::as_str) {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => return Err(corrupt(name, format!("bad resettable field: {other}"))),
        };
        let version = match fields.get(VERSION) {
            Some(raw) => raw
                .parse()
                .map_err(|e| corrupt(name, format!("bad version field: {e}")))?,
            None => 0,
        };
        Ok(Self {
            alternatives,
            goals,
            resettable,
            version,
        })
    }

    pub(crate) fn encode(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            (ALTERNATIVES, serde_json::to_string(&self.alternatives)?),
            (GOALS, serde_json::to_string(&self.goals)?),
            (RESETTABLE, self.resettable.to_string()),
            (VERSION, self.version.to_string()),
        ])
    }
}
