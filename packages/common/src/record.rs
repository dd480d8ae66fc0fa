use serde::{Deserialize, Deserializer, Serialize};
use crate::result::CommonResult;
use serde_json::Value;
use std::path::Path;

/// How many layers of JSON-in-a-string `parsed_data` will peel
const MAX_DATA_DECODE_DEPTH: usize = 3;

/// A stored component: markup, stylesheet, script and data payload
///
/// Serialized with the store's field names (`html`, `css`, `js`). The
/// identifier may be stored as a number or a string; it is always a string
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(deserialize_with = "string_or_number", default)]
    pub id: String,

    #[serde(rename = "html", default)]
    pub markup: String,

    #[serde(rename = "css", default)]
    pub style: String,

    #[serde(rename = "js", default)]
    pub script: String,

    #[serde(default)]
    pub data: Value,
}

impl ComponentRecord {
    pub fn new(id: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            markup: markup.into(),
            style: String::new(),
            script: String::new(),
            data: Value::Null,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// The data payload with JSON-encoded strings decoded
    ///
    /// Payloads are sometimes stored as a JSON string, or a JSON string
    /// holding another JSON string. Strings that do not parse are returned
    /// as-is.
    pub fn parsed_data(&self) -> Value {
        decode_payload(&self.data)
    }

    /// Read a record from a JSON file, naming it after the file stem when
    /// the record carries no id
    pub fn from_file(path: &Path) -> CommonResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut record: ComponentRecord = serde_json::from_str(&contents)?;
        if record.id.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                record.id = stem.to_string();
            }
        }
        Ok(record)
    }
}

/// Peel JSON-in-a-string encoding off a payload
pub fn decode_payload(data: &Value) -> Value {
    let mut current = data.clone();
    for _ in 0..MAX_DATA_DECODE_DEPTH {
        let Value::String(text) = &current else {
            break;
        };
        let trimmed = text.trim();
        let looks_encoded = trimmed.starts_with('{')
            || trimmed.starts_with('[')
            || (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2);
        if !looks_encoded {
            break;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(decoded) => current = decoded,
            Err(_) => break,
        }
    }
    current
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
