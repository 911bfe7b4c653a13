//! Nullable store: in-memory ledger with injectable write failures.

use lhraft_store::{DeviceRecord, DeviceSelector, DeviceStore, MemoryDeviceStore, StoreError};
use lhraft_types::NodeId;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a [`MemoryDeviceStore`] and fails a scripted number of writes.
///
/// A failed write leaves the stored record untouched.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryDeviceStore,
    failing_writes: AtomicUsize,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `put_device` fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryDeviceStore {
        &self.inner
    }

    fn take_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DeviceStore for FlakyStore {
    fn get_device(&self, id: &NodeId) -> Result<Option<DeviceRecord>, StoreError> {
        self.inner.get_device(id)
    }

    fn put_device(&self, record: &DeviceRecord) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(StoreError::Backend(format!("injected write failure for {}", record.id)));
        }
        self.inner.put_device(record)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn device_history(&self, id: &NodeId) -> Result<Vec<DeviceRecord>, StoreError> {
        self.inner.device_history(id)
    }

    fn query_devices(&self, selector: &DeviceSelector) -> Result<Vec<DeviceRecord>, StoreError> {
        self.inner.query_devices(selector)
    }
}
