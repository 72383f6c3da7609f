//! Template variable set.

use serde::Serialize;
use serde_json::{Map, Value};

/// Variables handed to the template engine.
///
/// During a request the set lives on
/// [`RequestContext::template_vars`](crate::RequestContext::template_vars) and
/// acts as an accumulator: subscribers add entries before rendering, and the
/// core merges the configuration-derived defaults underneath them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TemplateVars(Map<String, Value>);

impl TemplateVars {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns a variable by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if the variable is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a variable, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no variables are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Adds `defaults` underneath the current entries.
    ///
    /// Keys already present are kept, so values contributed before the merge
    /// override the defaults. Nothing is ever dropped.
    pub fn merge_defaults(&mut self, defaults: TemplateVars) {
        for (key, value) in defaults.0 {
            self.0.entry(key).or_insert(value);
        }
    }

    /// Adds `other` on top of the current entries, overriding on collision.
    pub fn extend(&mut self, other: TemplateVars) {
        self.0.extend(other.0);
    }

    /// Returns the variables as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Consumes the set, returning the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TemplateVars {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TemplateVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
