use lhraft_types::ZoneId;
use serde::{Deserialize, Serialize};

/// An opaque payload addressed to a zone. The core never persists it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub zone: ZoneId,
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(zone: ZoneId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            zone,
            payload: payload.into(),
        }
    }
}
