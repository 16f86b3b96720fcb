//! Occupancy snapshots and reconciliation.
//!
//! A snapshot is the full per-region occupied/empty map for one analysis
//! pass. It is replaced wholesale, never partially mutated; reconciliation
//! reduces a fresh snapshot to the minimal set of changes worth pushing to
//! the backend store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Full per-region occupancy for one analysis pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub slot_status: BTreeMap<String, bool>,
    pub vehicles_detected: usize,
    /// ISO-8601 capture timestamp; `None` before the first analysis.
    pub timestamp: Option<String>,
}

impl OccupancySnapshot {
    pub fn new(
        slot_status: BTreeMap<String, bool>,
        vehicles_detected: usize,
        timestamp: String,
    ) -> Self {
        Self {
            slot_status,
            vehicles_detected,
            timestamp: Some(timestamp),
        }
    }
}

/// Regions whose occupancy differs between `new` and `last_known`, in key
/// order. Regions absent from `last_known` count as changed from unknown.
///
/// `diff_occupancy(s, s)` is empty for every `s`.
pub fn diff_occupancy(
    new: &BTreeMap<String, bool>,
    last_known: &BTreeMap<String, bool>,
) -> Vec<(String, bool)> {
    let mut changed = Vec::new();
    for (code, value) in new {
        if last_known.get(code) != Some(value) {
            changed.push((code.clone(), *value));
        }
    }
    changed
}
