//! Device ledger storage for LH-Raft.
//!
//! The consensus core implements no storage itself. It reads and writes
//! whole [`DeviceRecord`]s through the [`DeviceStore`] trait: point get/put,
//! an ordered history per device and a selector query. Writes replace the
//! whole record; there are no partial updates.
//!
//! [`MemoryDeviceStore`] is the in-process backend used by the daemon and
//! the test suites.

pub mod device;
pub mod error;
pub mod memory;

pub use device::{DeviceRecord, DeviceSelector, DeviceStatus};
pub use error::StoreError;
pub use memory::MemoryDeviceStore;

use lhraft_types::NodeId;

/// Ledger collaborator consumed by the request layer.
pub trait DeviceStore: Send + Sync {
    /// Latest record for `id`, or `None` if the device was never written.
    fn get_device(&self, id: &NodeId) -> Result<Option<DeviceRecord>, StoreError>;

    /// Replace the whole record keyed by `record.id`.
    fn put_device(&self, record: &DeviceRecord) -> Result<(), StoreError>;

    /// Every committed version of the record, oldest first.
    fn device_history(&self, id: &NodeId) -> Result<Vec<DeviceRecord>, StoreError>;

    /// Latest records matching `selector`, ordered by device id.
    fn query_devices(&self, selector: &DeviceSelector) -> Result<Vec<DeviceRecord>, StoreError>;

    fn exists(&self, id: &NodeId) -> Result<bool, StoreError> {
        self.get_device(id).map(|r| r.is_some())
    }
}
