use crate::models::{Record, scalar_text};
use crate::normalize::normalize_flat;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub nature: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Node {
    fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        Some(Self {
            nature: fields.get("nature").and_then(scalar_text),
            kind: fields.get("type").and_then(scalar_text),
            latitude: fields.get("latitude").and_then(coordinate),
            longitude: fields.get("longitude").and_then(coordinate),
        })
    }
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub route_name: Option<String>,
    pub vehicle_id: Option<String>,
    pub nodes: Vec<Node>,
}

impl From<&Record> for Route {
    fn from(record: &Record) -> Self {
        let nodes = match record.field("nodes") {
            Some(Value::Array(items)) => items.iter().filter_map(Node::from_value).collect(),
            Some(Value::Object(items)) => items.values().filter_map(Node::from_value).collect(),
            _ => Vec::new(),
        };
        Self {
            id: record.id.clone(),
            route_name: record.text("routeName"),
            vehicle_id: record.text("vehicleId"),
            nodes,
        }
    }
}

/// Routes under one company, as stored at `routes/{id}` or `departed/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBoard {
    pub company_id: String,
    pub routes: Vec<Route>,
    pub found: bool,
}

impl RouteBoard {
    pub fn empty(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            ..Self::default()
        }
    }

    pub fn from_snapshot(company_id: &str, snapshot: Option<&Value>) -> Self {
        let normalized = normalize_flat(snapshot);
        Self {
            company_id: company_id.to_string(),
            routes: normalized.records.iter().map(Route::from).collect(),
            found: normalized.found,
        }
    }

    pub fn node_count(&self) -> usize {
        self.routes.iter().map(|route| route.nodes.len()).sum()
    }
}
