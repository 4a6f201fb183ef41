use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

/// A single environment variable.
///
/// On the wire a pair is a two-element sequence, `["NAME", "value"]`,
/// not an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct KeyValue {
    name: String,
    value: String,
}

impl KeyValue {
    pub fn new<K, V>(name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl From<(String, String)> for KeyValue {
    fn from((name, value): (String, String)) -> Self {
        Self { name, value }
    }
}

impl From<KeyValue> for (String, String) {
    fn from(kv: KeyValue) -> Self {
        (kv.name, kv.value)
    }
}

impl From<(&str, &str)> for KeyValue {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(name, value)
    }
}
