//! Snapshot diffing
//!
//! Pure comparison of two consecutive snapshots of the same device. Only
//! the designated status metric participates; counters and descriptions
//! may churn freely without producing changes.

use crate::Snapshot;

/// A detected status transition at one row position.
///
/// `prior == None` marks a first observation; such a change must never
/// fire an alert downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange {
    pub row: usize,
    pub prior: Option<String>,
    pub new: String,
}

/// Compare `new` against the previously stored snapshot of the same device.
///
/// Rows are aligned by index position. Rows present in only one of the two
/// snapshots have no counterpart to compare against and are not reported;
/// when the device's row cardinality changes between polls (interface added
/// or removed), the unmatched tail is dropped silently. Values are compared
/// as opaque strings - exact mismatch is the only trigger.
///
/// With no prior snapshot the result is empty: the first observation only
/// establishes the baseline.
#[must_use]
pub fn diff(prior: Option<&Snapshot>, new: &Snapshot, status_metric: &str) -> Vec<RowChange> {
    let Some(prior) = prior else {
        return Vec::new();
    };

    let mut changes = Vec::new();
    let compared = prior.row_count().min(new.row_count());

    for row in 0..compared {
        let (Some(prior_status), Some(new_status)) = (
            prior.value(row, status_metric),
            new.value(row, status_metric),
        ) else {
            continue;
        };

        if prior_status != new_status {
            changes.push(RowChange {
                row,
                prior: Some(prior_status.to_string()),
                new: new_status.to_string(),
            });
        }
    }

    changes
}
