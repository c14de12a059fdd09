//! Field-keyed condition accumulation
//!
//! Batch operations append a [`Condition`] for every fallible sub-step instead of
//! returning early, then inspect the accumulator once to decide between abort and
//! partial success.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic, optionally tied to a configuration field or instance id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub severity: Severity,

    /// Field or instance id the condition refers to; `None` for generic failures
    pub key: Option<String>,

    pub message: String,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "({}) {}: {}", self.severity, key, self.message),
            None => write!(f, "({}) {}", self.severity, self.message),
        }
    }
}

/// Mutable collector of conditions
#[derive(Debug, Clone, Default)]
pub struct ConditionAccumulator {
    conditions: Vec<Condition>,
}

impl ConditionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, key: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Error, key, message.into());
    }

    pub fn add_warning(&mut self, key: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Warning, key, message.into());
    }

    fn push(&mut self, severity: Severity, key: Option<&str>, message: String) {
        self.conditions.push(Condition {
            severity,
            key: key.map(str::to_string),
            message,
        });
    }

    /// Append every condition from already-built details
    pub fn merge(&mut self, details: Details) {
        self.conditions.extend(details.conditions);
    }

    pub fn has_error(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn into_details(self) -> Details {
        Details {
            conditions: self.conditions,
        }
    }
}

/// Immutable, serializable set of conditions attached to a failure or outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub conditions: Vec<Condition>,
}

impl Details {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.severity == Severity::Error)
    }

    /// Conditions grouped by key, unkeyed conditions under `None`
    pub fn by_key(&self) -> BTreeMap<Option<&str>, Vec<&Condition>> {
        let mut grouped: BTreeMap<Option<&str>, Vec<&Condition>> = BTreeMap::new();
        for condition in &self.conditions {
            grouped
                .entry(condition.key.as_deref())
                .or_default()
                .push(condition);
        }
        grouped
    }

    /// Conditions recorded against a specific key
    pub fn for_key(&self, key: &str) -> Vec<&Condition> {
        self.conditions
            .iter()
            .filter(|c| c.key.as_deref() == Some(key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }
}

impl std::fmt::Display for Details {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", condition)?;
        }
        Ok(())
    }
}
