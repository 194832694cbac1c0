//! Open key/value record exported for every accepted page

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An exported page record
///
/// Keys keep insertion order, so the first record of a batch decides the CSV
/// column order. Values are JSON values that every writer coerces to text the
/// same way (see [`value_to_text`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportRecord(Map<String, Value>);

impl ExportRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a field, keeping the original position of an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field coerced to text
    pub fn text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(value_to_text)
    }

    /// Field as a number, if it is numeric or a numeric string
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String items of an array field; missing or non-array fields yield nothing
    pub fn text_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Copies every field of `other` into this record, overwriting duplicates
    pub fn merge(&mut self, other: ExportRecord) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every field value as text, serialized as one JSON object
    ///
    /// Two records with identical fields and values share a key.
    pub fn row_key(&self) -> String {
        let text: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value_to_text(value))))
            .collect();
        Value::Object(text).to_string()
    }
}

impl From<Map<String, Value>> for ExportRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ExportRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Coerces a JSON value to the text stored in CSV cells and SQLite columns
///
/// Strings are taken verbatim, `null` becomes empty, everything else uses its
/// compact JSON form.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
