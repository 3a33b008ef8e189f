//! Call parameters and path template expansion.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A model instance as exchanged with the backend.
pub type Entity = Map<String, Value>;

/// Named parameters of an action call.
///
/// Parameters that match a `:name` placeholder of the path template are
/// substituted into the path; everything else is sent as a query parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ id }`.
    pub fn id(id: impl Into<Value>) -> Self {
        Self::new().with("id", id)
    }

    /// `{ filter }`, JSON-encoded into the query string.
    pub fn filter(filter: Value) -> Self {
        Self::new().with("filter", filter)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expands `template` and returns the path plus leftover query pairs.
    ///
    /// A placeholder without a value (or with `null`) drops its whole segment,
    /// so `/MyModels/:id` with no `id` becomes `/MyModels`.
    pub fn expand(&self, template: &str) -> (String, Vec<(String, String)>) {
        let mut used = Vec::new();
        let mut segments = Vec::new();
        for segment in template.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix(':') {
                Some(name) => {
                    if let Some(value) = self.0.get(name).and_then(param_to_string) {
                        segments.push(urlencoding::encode(&value).into_owned());
                    }
                    used.push(name);
                }
                None => segments.push(segment.to_string()),
            }
        }
        let path = format!("/{}", segments.join("/"));

        let query = self
            .0
            .iter()
            .filter(|(name, _)| !used.contains(&name.as_str()))
            .filter_map(|(name, value)| param_to_string(value).map(|v| (name.clone(), v)))
            .collect();
        (path, query)
    }
}

impl From<BTreeMap<String, Value>> for Params {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// Strings go as-is, `null` is omitted, everything else is JSON-encoded.
fn param_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Stringified `id` of an entity, accepting numeric and string ids.
pub fn entity_id(entity: &Entity) -> Option<String> {
    entity.get("id").and_then(param_to_string)
}
