//! Snapshot store - latest successful snapshot per device
//!
//! Process-lifetime state only: empty at startup, advanced after every
//! successful poll, never persisted.
//!
//! Each device key owns its own async mutex. The scheduler holds that lock
//! across its whole read-diff-react-write sequence, so two overlapping
//! cycles for the same device serialize end-to-end while distinct devices
//! never contend beyond the brief map access.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::{DeviceIdentity, Snapshot};

/// Per-device cell; `None` until the device's first successful poll.
pub type SnapshotCell = Arc<Mutex<Option<Snapshot>>>;

#[derive(Default)]
pub struct SnapshotStore {
    entries: RwLock<HashMap<DeviceIdentity, SnapshotCell>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `identity`, created empty on first access.
    ///
    /// Callers lock the returned cell for the full duration of their
    /// read-diff-react-write sequence.
    pub async fn entry(&self, identity: &DeviceIdentity) -> SnapshotCell {
        if let Some(cell) = self.entries.read().await.get(identity) {
            return cell.clone();
        }

        self.entries
            .write()
            .await
            .entry(identity.clone())
            .or_default()
            .clone()
    }

    /// Clone of the latest stored snapshot, if any. Inspection only; the
    /// poll path goes through [`SnapshotStore::entry`] instead.
    pub async fn latest(&self, identity: &DeviceIdentity) -> Option<Snapshot> {
        let cell = {
            let entries = self.entries.read().await;
            entries.get(identity)?.clone()
        };
        let guard = cell.lock().await;
        guard.clone()
    }

    /// Number of devices that have a cell (observed at least one poll
    /// attempt reaching the store).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
