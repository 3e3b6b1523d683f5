use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level messages from a rejected write, keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Flattens a validation body into `field -> messages`.
    ///
    /// Nested serializer errors become dotted paths (`rents.0.amount`); a
    /// top-level `detail` or a bare string/array body lands under
    /// [`NON_FIELD_ERRORS`].
    pub fn from_body(body: &Value) -> Self {
        let mut errors = Self::default();
        match body {
            Value::Object(map) => {
                for (key, value) in map {
                    if key == "detail" {
                        errors.collect(NON_FIELD_ERRORS, value);
                    } else {
                        errors.collect(key, value);
                    }
                }
            }
            Value::Null => {}
            other => errors.collect(NON_FIELD_ERRORS, other),
        }
        errors
    }

    fn collect(&mut self, path: &str, value: &Value) {
        match value {
            Value::Null => {}
            Value::String(message) => self.push(path, message.clone()),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(_) => self.collect(&format!("{path}.{index}"), item),
                        _ => self.collect(path, item),
                    }
                }
            }
            Value::Object(map) => {
                for (key, nested) in map {
                    self.collect(&format!("{path}.{key}"), nested);
                }
            }
            other => self.push(path, other.to_string()),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// First message, used as the summary line of a failure.
    pub fn first_message(&self) -> Option<String> {
        self.0
            .iter()
            .find_map(|(field, messages)| messages.first().map(|m| format!("{field}: {m}")))
    }
}

/// Server-declared field metadata used to drive generic forms.
///
/// Stored exactly as the server sent it; [`Attributes::field`] gives a typed
/// reading of one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Extracts attributes from an `OPTIONS` response body.
    pub fn from_options_body(body: &Value) -> Self {
        let post = body
            .get("actions")
            .and_then(|actions| actions.get("POST"))
            .and_then(Value::as_object);
        match (post, body.as_object()) {
            (Some(post), _) => Self(post.clone()),
            (None, Some(map)) => Self(map.clone()),
            (None, None) => Self::default(),
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<FieldAttribute> {
        self.0.get(name).map(FieldAttribute::from_value)
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: Value,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttribute {
    pub field_type: Option<String>,
    pub required: bool,
    pub read_only: bool,
    pub label: Option<String>,
    pub max_length: Option<u64>,
    pub choices: Vec<Choice>,
}

impl FieldAttribute {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        let choices = value
            .get("choices")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(Choice {
                            value: item.get("value")?.clone(),
                            display_name: item
                                .get("display_name")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            field_type: text("type"),
            required: flag("required"),
            read_only: flag("read_only"),
            label: text("label"),
            max_length: value.get("max_length").and_then(Value::as_u64),
            choices,
        }
    }
}

/// Paginated list envelope returned by collection endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<Value>,
}

impl ListPage {
    /// Reads a list body. Unpaginated endpoints answer with a bare array.
    pub fn from_body(body: &Value) -> Self {
        match body {
            Value::Array(items) => Self {
                count: items.len() as u64,
                next: None,
                previous: None,
                results: items.clone(),
            },
            Value::Object(_) => serde_json::from_value(body.clone()).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Collection bodies come back either bare or wrapped in a list envelope.
pub fn results_of(body: &Value) -> Vec<Value> {
    ListPage::from_body(body).results
}

/// Reads the numeric `id` of a server record.
pub fn id_of(entity: &Value) -> Option<i64> {
    entity.get("id").and_then(Value::as_i64)
}
