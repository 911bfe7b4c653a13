//! In-memory device store keeping every committed version of each record.

use crate::{DeviceRecord, DeviceSelector, DeviceStore, StoreError};
use lhraft_types::NodeId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe in-memory [`DeviceStore`].
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    /// device id → versions, oldest first. Never holds an empty vector.
    history: Mutex<BTreeMap<NodeId, Vec<DeviceRecord>>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct devices stored.
    pub fn len(&self) -> usize {
        self.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<NodeId, Vec<DeviceRecord>>>, StoreError> {
        self.history
            .lock()
            .map_err(|_| StoreError::Backend("device store lock poisoned".into()))
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn get_device(&self, id: &NodeId) -> Result<Option<DeviceRecord>, StoreError> {
        Ok(self.lock()?.get(id).and_then(|v| v.last()).cloned())
    }

    fn put_device(&self, record: &DeviceRecord) -> Result<(), StoreError> {
        self.lock()?
            .entry(record.id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn device_history(&self, id: &NodeId) -> Result<Vec<DeviceRecord>, StoreError> {
        Ok(self.lock()?.get(id).cloned().unwrap_or_default())
    }

    fn query_devices(&self, selector: &DeviceSelector) -> Result<Vec<DeviceRecord>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter_map(|versions| versions.last())
            .filter(|record| selector.matches(record))
            .cloned()
            .collect())
    }
}
