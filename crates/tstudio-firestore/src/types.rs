//! Firestore REST API types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }
}

impl Value {
    /// Convert a JSON value into its Firestore representation.
    ///
    /// Integral JSON numbers become `integerValue`, all other numbers `doubleValue`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::NullValue(()),
            Json::Bool(b) => Value::BooleanValue(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::IntegerValue(i.to_string()),
                None => Value::DoubleValue(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::StringValue(s.clone()),
            Json::Array(items) => Value::ArrayValue(ArrayValue {
                values: Some(items.iter().map(Value::from_json).collect()),
            }),
            Json::Object(map) => Value::MapValue(MapValue {
                fields: Some(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                ),
            }),
        }
    }

    /// Convert back into plain JSON. Timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::NullValue(()) => Json::Null,
            Value::BooleanValue(b) => Json::Bool(*b),
            Value::IntegerValue(s) => s
                .parse::<i64>()
                .map(Json::from)
                .unwrap_or_else(|_| Json::String(s.clone())),
            Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::TimestampValue(s) | Value::StringValue(s) => Json::String(s.clone()),
            Value::ArrayValue(array) => Json::Array(
                array
                    .values
                    .as_ref()
                    .map(|values| values.iter().map(Value::to_json).collect())
                    .unwrap_or_default(),
            ),
            Value::MapValue(map) => Json::Object(
                map.fields
                    .as_ref()
                    .map(|fields| {
                        fields
                            .iter()
                            .map(|(k, v)| (k.clone(), v.to_json()))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let value = Value::IntegerValue("42".to_string());
        assert_eq!(serde_json::to_value(&value).unwrap(), json!({"integerValue": "42"}));

        let null = Value::NullValue(());
        assert_eq!(serde_json::to_value(&null).unwrap(), json!({"nullValue": null}));
    }

    #[test]
    fn test_json_conversion_keeps_number_kinds() {
        let source = json!({
            "start": 10.0,
            "speaker": 2,
            "words": [{"text": "hi"}],
            "done": true,
            "note": null,
        });
        let value = Value::from_json(&source);

        let Value::MapValue(map) = &value else {
            panic!("expected map");
        };
        let fields = map.fields.as_ref().unwrap();
        assert_eq!(fields["start"], Value::DoubleValue(10.0));
        assert_eq!(fields["speaker"], Value::IntegerValue("2".to_string()));

        assert_eq!(value.to_json(), source);
    }
}
