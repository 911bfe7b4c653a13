//! Device records as persisted in the ledger.

use lhraft_types::{NodeId, Timestamp, ZoneId, DEFAULT_REPUTATION};
use serde::{Deserialize, Serialize};

/// Operational status of a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
    Maintenance,
}

/// Ledger record of a device.
///
/// `reputation` here is the ledger trust: set directly by reputation updates
/// or recomputed cumulatively by recorded transactions. It is not the value
/// elections read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: NodeId,
    pub location: String,
    pub zone_id: ZoneId,
    pub reputation: f64,
    pub status: DeviceStatus,
    pub last_update: Timestamp,
    pub transaction_count: u64,
    #[serde(rename = "successfulTransactions")]
    pub successful_tx: u64,
    #[serde(rename = "failedTransactions")]
    pub failed_tx: u64,
}

impl DeviceRecord {
    /// A freshly registered, active device with full trust and no history.
    pub fn new(id: NodeId, location: impl Into<String>, zone_id: ZoneId, now: Timestamp) -> Self {
        Self {
            id,
            location: location.into(),
            zone_id,
            reputation: DEFAULT_REPUTATION,
            status: DeviceStatus::Active,
            last_update: now,
            transaction_count: 0,
            successful_tx: 0,
            failed_tx: 0,
        }
    }

    /// Count one transaction outcome.
    pub fn record_outcome(&mut self, success: bool) {
        self.transaction_count += 1;
        if success {
            self.successful_tx += 1;
        } else {
            self.failed_tx += 1;
        }
    }
}

/// Predicate for [`crate::DeviceStore::query_devices`]. Unset fields match
/// everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSelector {
    pub zone: Option<ZoneId>,
    pub status: Option<DeviceStatus>,
}

impl DeviceSelector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_zone(zone: ZoneId) -> Self {
        Self {
            zone: Some(zone),
            status: None,
        }
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &DeviceRecord) -> bool {
        self.zone.as_ref().map_or(true, |z| *z == record.zone_id)
            && self.status.map_or(true, |s| s == record.status)
    }
}
