//! Request parameter namespace: query string merged with a JSON body.

use crate::domain::coerce::RawValue;
use serde_json::{Map, Value};

/// Untrusted request fields, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    fields: Map<String, Value>,
}

impl RequestParams {
    /// Merge query pairs and an optional JSON object body; body fields win.
    pub fn from_parts(query: Vec<(String, String)>, body: Option<Map<String, Value>>) -> Self {
        let mut fields = Map::new();
        for (key, value) in query {
            fields.insert(key, Value::String(value));
        }
        if let Some(body) = body {
            fields.extend(body);
        }
        Self { fields }
    }

    /// A field is present when it exists and is neither null nor empty text.
    pub fn is_present(&self, name: &str) -> bool {
        match self.fields.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Raw value of a present field
    pub fn raw(&self, name: &str) -> Option<RawValue> {
        if self.is_present(name) {
            self.fields.get(name).map(RawValue::from)
        } else {
            None
        }
    }

    /// Whether every named field is present
    pub fn all_present(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.is_present(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Value> for RequestParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}
