use crate::errors::InputError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

const RESERVED_PATH_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// A flat record produced by the normalizer: a stable id, the owner it was
/// filed under (vehicles only) and the source fields in their original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: String,
    pub owner_id: Option<String>,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: &Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            owner_id: None,
            fields: fields.clone(),
        }
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Textual form of a scalar field; `None` for missing, null, empty or
    /// non-scalar values.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(scalar_text)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(truthy)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        if let Some(owner_id) = &self.owner_id {
            map.serialize_entry("ownerId", owner_id)?;
        }
        for (key, value) in &self.fields {
            if key == "id" || (key == "ownerId" && self.owner_id.is_some()) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Loose truthiness used by the store's untyped fields.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyCompanyId);
        }
        if trimmed.contains(RESERVED_PATH_CHARS) {
            return Err(InputError::InvalidCompanyId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: String,
    pub name: Option<String>,
}

impl Company {
    /// `None` when the snapshot is absent or not an object (unknown company).
    pub fn from_snapshot(id: &str, snapshot: Option<&Value>) -> Option<Self> {
        let fields = snapshot?.as_object()?;
        Some(Self {
            id: id.to_string(),
            name: fields.get("name").and_then(scalar_text),
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Company")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DriverStats {
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStats {
    pub total: usize,
    pub type_count: usize,
    pub owner_count: usize,
}
