//! Run-wide feature flags consulted by the preprocessor.

use std::collections::BTreeMap;

/// Flag name that keeps `injects` headers intact instead of demoting them to `extends`.
pub const INJECTIONS_FLAG: &str = "injections";

/// Immutable mapping of flag name to string value.
///
/// A flag is *defined* when present at all and *truthy* when its value is
/// non-empty and not `false`/`0` (case-insensitive). `#ifdef` and `#defined`
/// only ask whether a flag is defined; `#bool` and `#switch` ask whether it is
/// truthy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSet {
    values: BTreeMap<String, String>,
}

impl DefinitionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from settings values.
    ///
    /// Strings are kept verbatim, booleans become `true`/`false`, numbers their
    /// decimal text and `null` entries are dropped (treated as undefined).
    pub fn from_json_map(values: &BTreeMap<String, serde_json::Value>) -> Self {
        use serde_json::Value;

        values
            .iter()
            .filter_map(|(name, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                Some((name.clone(), text))
            })
            .collect()
    }

    /// Returns a copy of this set with one more flag.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(is_truthy_value)
    }

    /// Whether `injects` headers should be kept as-is.
    pub fn injections_enabled(&self) -> bool {
        self.is_defined(INJECTIONS_FLAG)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DefinitionSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn is_truthy_value(value: &str) -> bool {
    !(value.is_empty() || value.eq_ignore_ascii_case("false") || value == "0")
}
