// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thelma_racks::RackPosition;

/// Move of a single tube between rack positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TubeTransfer {
    pub tube_barcode: String,
    pub source_rack: String,
    pub source_position: RackPosition,
    pub target_rack: String,
    pub target_position: RackPosition,
}

impl TubeTransfer {
    pub fn new(
        tube_barcode: impl Into<String>,
        source: (&str, RackPosition),
        target: (&str, RackPosition),
    ) -> Self {
        TubeTransfer {
            tube_barcode: tube_barcode.into(),
            source_rack: source.0.to_string(),
            source_position: source.1,
            target_rack: target.0.to_string(),
            target_position: target.1,
        }
    }
}

/// Record of an executed batch of tube transfers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeTransferWorklist {
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub transfers: Vec<TubeTransfer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklist_record_json() {
        let record = TubeTransferWorklist {
            user: "it".to_string(),
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            transfers: vec![TubeTransfer::new(
                "1001",
                ("09000001", RackPosition::from_label("A1").unwrap()),
                ("09000002", RackPosition::from_label("H12").unwrap()),
            )],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        assert_eq!(json["transfers"][0]["target_position"], "H12");
        let back: TubeTransferWorklist = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
