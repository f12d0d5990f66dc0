//! Structural comparison of configuration records
//!
//! Records are lowered to a [`ConfigValue`] tree and compared recursively.
//! Record keys and list elements are compared as sets, so neither key order
//! nor element order matters. `Absent` only ever equals `Absent`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::canonical::config::CanonicalConfig;

#[derive(Debug, Clone)]
pub enum ConfigValue {
    Absent,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<ConfigValue>),
    Record(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Lower any serializable value. Serialization failure yields `Absent`.
    pub fn from_serialize<T: Serialize>(value: &T) -> Self {
        serde_json::to_value(value)
            .map(Self::from)
            .unwrap_or(Self::Absent)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Record(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl PartialEq for ConfigValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Absent, Self::Absent) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => numbers_equal(a, b),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => same_elements(a, b),
            (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value == other))
            }
            _ => false,
        }
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_u64(), b.as_u64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
    }
}

/// Multiset comparison: every element pairs with exactly one equal element
fn same_elements(a: &[ConfigValue], b: &[ConfigValue]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        let found = b
            .iter()
            .enumerate()
            .find(|(i, candidate)| !used[*i] && item == *candidate)
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Structural equality of two canonical records; `true` means unchanged
pub fn reconcile(fresh: &CanonicalConfig, stored: &CanonicalConfig) -> bool {
    ConfigValue::from_serialize(fresh) == ConfigValue::from_serialize(stored)
}

/// Top-level keys whose values differ, in key order
pub fn changed_keys(fresh: &CanonicalConfig, stored: &CanonicalConfig) -> Vec<String> {
    let (ConfigValue::Record(a), ConfigValue::Record(b)) = (
        ConfigValue::from_serialize(fresh),
        ConfigValue::from_serialize(stored),
    ) else {
        return Vec::new();
    };
    let mut keys: Vec<String> = a
        .iter()
        .filter(|(key, value)| b.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    keys.extend(b.keys().filter(|key| !a.contains_key(*key)).cloned());
    keys.sort();
    keys
}
