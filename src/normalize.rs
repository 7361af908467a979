//! Flattens realtime snapshots into ordered record lists.
//!
//! The store hands back whatever was written at a path: objects keyed by
//! identifiers, arrays when the keys happened to be dense integers, or nothing
//! at all. Every function here is total: malformed leaves are skipped, and an
//! absent snapshot is an empty result with `found == false`.

use crate::models::{Record, scalar_text};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Flat by license, or nested one level under an arbitrary key.
    Driver,
    /// Two levels: owner id, then vehicle id.
    Vehicle,
    /// Single level keyed by record id (routes, dispatched routes).
    Flat,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub found: bool,
}

impl Normalized {
    fn missing() -> Self {
        Self::default()
    }
}

pub fn normalize(shape: Shape, snapshot: Option<&Value>) -> Normalized {
    match shape {
        Shape::Driver => normalize_drivers(snapshot),
        Shape::Vehicle => normalize_vehicles(snapshot),
        Shape::Flat => normalize_flat(snapshot),
    }
}

/// The two layouts drivers have been written in, decided by looking one level
/// into the entry.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DriverEntry<'a> {
    Flat {
        id: &'a str,
        fields: &'a Map<String, Value>,
    },
    Nested {
        id: &'a str,
        fields: &'a Map<String, Value>,
    },
}

impl<'a> DriverEntry<'a> {
    fn classify(key: &'a str, item: &'a Value) -> Option<Self> {
        let outer = item.as_object()?;
        match outer.iter().next() {
            Some((inner_key, Value::Object(inner))) => Some(Self::Nested {
                id: inner_key,
                fields: inner,
            }),
            _ => Some(Self::Flat { id: key, fields: outer }),
        }
    }

    fn into_record(self, position: usize) -> Record {
        let (id, fields) = match self {
            Self::Flat { id, fields } | Self::Nested { id, fields } => (id, fields),
        };
        Record::new(stable_id(id, fields, position), fields)
    }
}

pub fn normalize_drivers(snapshot: Option<&Value>) -> Normalized {
    let Some(entries) = entries(snapshot) else {
        return Normalized::missing();
    };
    let records = entries
        .iter()
        .filter_map(|(key, item)| DriverEntry::classify(key, item))
        .enumerate()
        .map(|(position, entry)| entry.into_record(position))
        .collect();
    Normalized {
        records,
        found: true,
    }
}

pub fn normalize_vehicles(snapshot: Option<&Value>) -> Normalized {
    let Some(owners) = entries(snapshot) else {
        return Normalized::missing();
    };
    let mut records = Vec::new();
    for (owner_id, vehicles) in &owners {
        push_owned(&mut records, owner_id, Some(*vehicles), |_| true);
    }
    Normalized {
        records,
        found: true,
    }
}

/// Normalizes a single owner's vehicle map (`vehicles/{owner}`), annotating
/// every record with that owner.
pub fn normalize_owner_vehicles(owner_id: &str, snapshot: Option<&Value>) -> Normalized {
    if entries(snapshot).is_none() {
        return Normalized::missing();
    }
    let mut records = Vec::new();
    push_owned(&mut records, owner_id, snapshot, |_| true);
    Normalized {
        records,
        found: true,
    }
}

/// Scans the full vehicle tree for entries filed under `company_id` or
/// carrying it in their own `companyId` field.
pub fn filter_company_vehicles(company_id: &str, tree: Option<&Value>) -> Normalized {
    let Some(owners) = entries(tree) else {
        return Normalized::missing();
    };
    let mut records = Vec::new();
    for (owner_id, vehicles) in &owners {
        let filed_under_company = owner_id == company_id;
        push_owned(&mut records, owner_id, Some(*vehicles), |fields| {
            filed_under_company
                || fields
                    .get("companyId")
                    .and_then(Value::as_str)
                    .is_some_and(|id| id == company_id)
        });
    }
    Normalized {
        records,
        found: true,
    }
}

pub fn normalize_flat(snapshot: Option<&Value>) -> Normalized {
    let Some(entries) = entries(snapshot) else {
        return Normalized::missing();
    };
    let records = entries
        .iter()
        .filter_map(|(key, item)| Some((key, item.as_object()?)))
        .enumerate()
        .map(|(position, (key, fields))| Record::new(stable_id(key, fields, position), fields))
        .collect();
    Normalized {
        records,
        found: true,
    }
}

fn push_owned(
    records: &mut Vec<Record>,
    owner_id: &str,
    vehicles: Option<&Value>,
    keep: impl Fn(&Map<String, Value>) -> bool,
) {
    let Some(vehicles) = entries(vehicles) else {
        return;
    };
    for (key, item) in &vehicles {
        let Some(fields) = item.as_object() else {
            continue;
        };
        if keep(fields) {
            let id = stable_id(key, fields, records.len());
            records.push(Record::new(id, fields).with_owner(owner_id));
        }
    }
}

/// Key/value pairs of a container snapshot, in source order. `None` when the
/// snapshot is absent, scalar or empty.
fn entries(snapshot: Option<&Value>) -> Option<Vec<(String, &Value)>> {
    let pairs: Vec<(String, &Value)> = match snapshot? {
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index.to_string(), value))
            .collect(),
        _ => return None,
    };
    if pairs.is_empty() { None } else { Some(pairs) }
}

fn stable_id(key: &str, fields: &Map<String, Value>, position: usize) -> String {
    if !key.is_empty() {
        return key.to_string();
    }
    ["licenseNumber", "number"]
        .iter()
        .find_map(|name| fields.get(*name).and_then(scalar_text))
        .unwrap_or_else(|| format!("#{position}"))
}
