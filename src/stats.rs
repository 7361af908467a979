use crate::models::{DriverStats, Record, VehicleStats, scalar_text, truthy};
use serde::Serialize;

pub const AVAILABLE: &str = "Available";
pub const UNAVAILABLE: &str = "Unavailable";
pub const UNSPECIFIED: &str = "Unspecified";
pub const UNNAMED: &str = "#";
pub const UNASSIGNED: &str = "Unassigned";
pub const OWNER_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
}

/// Label -> count table in first-seen label order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct BucketTable {
    buckets: Vec<Bucket>,
}

impl BucketTable {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            buckets: labels
                .iter()
                .map(|label| Bucket {
                    label: (*label).to_string(),
                    count: 0,
                })
                .collect(),
        }
    }

    pub fn increment(&mut self, label: &str) {
        match self.buckets.iter_mut().find(|bucket| bucket.label == label) {
            Some(bucket) => bucket.count = bucket.count.saturating_add(1),
            None => self.buckets.push(Bucket {
                label: label.to_string(),
                count: 1,
            }),
        }
    }

    pub fn sorted(mut self) -> Self {
        self.buckets.sort_by(|a, b| a.label.cmp(&b.label));
        self
    }

    pub fn get(&self, label: &str) -> u64 {
        self.buckets
            .iter()
            .find(|bucket| bucket.label == label)
            .map_or(0, |bucket| bucket.count)
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.buckets.iter().map(|bucket| bucket.label.as_str()).collect()
    }
}

fn tally<'a>(records: &'a [Record], label: impl Fn(&'a Record) -> String) -> BucketTable {
    let mut table = BucketTable::default();
    for record in records {
        table.increment(&label(record));
    }
    table
}

pub fn availability(records: &[Record]) -> BucketTable {
    let mut table = BucketTable::with_labels(&[AVAILABLE, UNAVAILABLE]);
    for record in records {
        table.increment(if record.flag("isAvailable") {
            AVAILABLE
        } else {
            UNAVAILABLE
        });
    }
    table
}

pub fn name_initials(records: &[Record]) -> BucketTable {
    tally(records, |record| {
        record
            .text("name")
            .and_then(|name| name.trim().chars().next())
            .map_or_else(|| UNNAMED.to_string(), |first| first.to_uppercase().collect())
    })
    .sorted()
}

pub fn vehicle_types(records: &[Record]) -> BucketTable {
    tally(records, |record| {
        record
            .field("type")
            .filter(|kind| truthy(kind))
            .and_then(scalar_text)
            .unwrap_or_else(|| UNSPECIFIED.to_string())
    })
}

pub fn owner_prefixes(records: &[Record]) -> BucketTable {
    tally(records, |record| {
        record
            .owner_id
            .as_deref()
            .filter(|owner| !owner.is_empty())
            .map_or_else(|| UNASSIGNED.to_string(), owner_prefix)
    })
}

/// First eight characters of an owner id, cut on a char boundary.
pub fn owner_prefix(owner_id: &str) -> String {
    owner_id.chars().take(OWNER_PREFIX_LEN).collect()
}

pub fn driver_stats(records: &[Record]) -> DriverStats {
    let available = records.iter().filter(|record| record.flag("isAvailable")).count();
    DriverStats {
        total: records.len(),
        available,
        unavailable: records.len() - available,
    }
}

pub fn vehicle_stats(records: &[Record], types: &BucketTable, owners: &BucketTable) -> VehicleStats {
    VehicleStats {
        total: records.len(),
        type_count: types.len(),
        owner_count: owners.len(),
    }
}
