// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use thelma_racks::RackPosition;

use crate::rack::{TubeRack, TubeRackStore};
use crate::transfer::{TubeTransfer, TubeTransferWorklist};
use crate::{Error, Result};

type Slot = (String, RackPosition);

fn rack_mut<'s, S: TubeRackStore>(store: &'s mut S, barcode: &str) -> Result<&'s mut TubeRack> {
    store
        .rack_mut(barcode)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown rack {barcode}.")))
}

fn describe(slots: &BTreeSet<Slot>) -> String {
    slots
        .iter()
        .map(|(rack, position)| format!("{rack} {position}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Applies a batch of tube transfers to the rack store.
///
/// All transfers are checked before the first tube is moved: either every
/// transfer is applied or the store is left untouched.
pub struct TubeTransferExecutor<'a, S> {
    store: &'a mut S,
    transfers: Vec<TubeTransfer>,
    user: String,
    timestamp: Option<DateTime<Utc>>,
    executed: bool,
}

impl<'a, S: TubeRackStore> TubeTransferExecutor<'a, S> {
    pub fn new(store: &'a mut S, transfers: Vec<TubeTransfer>, user: impl Into<String>) -> Self {
        TubeTransferExecutor {
            store,
            transfers,
            user: user.into(),
            timestamp: None,
            executed: false,
        }
    }

    /// Timestamp of the worklist record, e.g. the time reported by the tube
    /// handler. Defaults to the time of execution.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn execute(&mut self) -> Result<TubeTransferWorklist> {
        if self.executed {
            return Err(Error::State(
                "The tube transfers have already been executed.".to_string(),
            ));
        }
        self.check()?;
        for transfer in &self.transfers {
            rack_mut(self.store, &transfer.source_rack)?.remove_tube(&transfer.source_position)?;
        }
        for transfer in &self.transfers {
            rack_mut(self.store, &transfer.target_rack)?
                .add_tube(transfer.target_position, transfer.tube_barcode.clone())?;
        }
        self.executed = true;
        thelma_log::info!(
            "Executed {} tube transfers for {}.",
            self.transfers.len(),
            self.user
        );
        Ok(TubeTransferWorklist {
            user: self.user.clone(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            transfers: self.transfers.clone(),
        })
    }

    fn check(&self) -> Result<()> {
        if self.transfers.is_empty() {
            return Err(Error::InvalidInput(
                "There are no tube transfers to execute.".to_string(),
            ));
        }
        let mut unknown_racks = BTreeSet::new();
        let mut duplicate_tubes = BTreeSet::new();
        let mut missing: BTreeMap<String, Slot> = BTreeMap::new();
        let mut occupied: BTreeSet<Slot> = BTreeSet::new();
        let mut tubes = BTreeSet::new();
        let mut targets = BTreeSet::new();
        let vacated: BTreeSet<Slot> = self
            .transfers
            .iter()
            .map(|t| (t.source_rack.clone(), t.source_position))
            .collect();

        for transfer in &self.transfers {
            if !tubes.insert(transfer.tube_barcode.as_str()) {
                duplicate_tubes.insert(transfer.tube_barcode.clone());
            }
            match self.store.rack(&transfer.source_rack) {
                Some(rack) => {
                    if rack.tube_at(&transfer.source_position) != Some(transfer.tube_barcode.as_str())
                    {
                        missing.insert(
                            transfer.tube_barcode.clone(),
                            (transfer.source_rack.clone(), transfer.source_position),
                        );
                    }
                }
                None => {
                    unknown_racks.insert(transfer.source_rack.clone());
                }
            }
            let target: Slot = (transfer.target_rack.clone(), transfer.target_position);
            match self.store.rack(&transfer.target_rack) {
                Some(rack) => {
                    rack.shape().check_contains(&transfer.target_position)?;
                    let blocked = rack.tube_at(&transfer.target_position).is_some()
                        && !vacated.contains(&target);
                    if blocked || !targets.insert(target.clone()) {
                        occupied.insert(target);
                    }
                }
                None => {
                    unknown_racks.insert(transfer.target_rack.clone());
                }
            }
        }

        if !unknown_racks.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Unknown racks: {}.",
                unknown_racks.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }
        if !duplicate_tubes.is_empty() {
            return Err(Error::InvalidInput(format!(
                "The following tubes are transferred more than once: {}.",
                duplicate_tubes.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }
        if !missing.is_empty() {
            let details: Vec<String> = missing
                .iter()
                .map(|(tube, (rack, position))| format!("{tube} (expected at {rack} {position})"))
                .collect();
            return Err(Error::MissingSample(format!(
                "Some tubes are not at their expected source positions: {}.",
                details.join(", ")
            )));
        }
        if !occupied.is_empty() {
            return Err(Error::OccupiedSlot(format!(
                "Some transfer target positions are not empty: {}.",
                describe(&occupied)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rack::RackInventory;
    use proptest::prelude::*;
    use thelma_racks::RackShape;

    fn pos(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    fn rack(barcode: &str, tubes: &[(&str, &str)]) -> TubeRack {
        let mut rack = TubeRack::new(barcode, RackShape::SHAPE_96);
        for (label, tube) in tubes {
            rack.add_tube(pos(label), *tube).unwrap();
        }
        rack
    }

    #[test]
    fn test_occupied_target_leaves_store_unchanged() {
        let mut store = RackInventory::new()
            .with_rack(rack("R1", &[("A1", "T")]))
            .with_rack(rack("R2", &[("A1", "U")]));
        let before = store.clone();
        let transfers = vec![TubeTransfer::new("T", ("R1", pos("A1")), ("R2", pos("A1")))];
        let err = TubeTransferExecutor::new(&mut store, transfers, "it")
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::OccupiedSlot(_)));
        assert_eq!(
            err.to_string(),
            "Some transfer target positions are not empty: R2 A1."
        );
        assert_eq!(store, before);
    }

    #[test]
    fn test_missing_tube() {
        let mut store = RackInventory::new()
            .with_rack(rack("R1", &[("A1", "T")]))
            .with_rack(rack("R2", &[]));
        let transfers = vec![TubeTransfer::new("X", ("R1", pos("A1")), ("R2", pos("B1")))];
        let err = TubeTransferExecutor::new(&mut store, transfers, "it")
            .execute()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Some tubes are not at their expected source positions: X (expected at R1 A1)."
        );
    }

    #[test]
    fn test_swap_and_second_execution() {
        let mut store = RackInventory::new().with_rack(rack("R1", &[("A1", "T"), ("A2", "U")]));
        let transfers = vec![
            TubeTransfer::new("T", ("R1", pos("A1")), ("R1", pos("A2"))),
            TubeTransfer::new("U", ("R1", pos("A2")), ("R1", pos("A1"))),
        ];
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut executor =
            TubeTransferExecutor::new(&mut store, transfers.clone(), "it").with_timestamp(timestamp);
        let worklist = executor.execute().unwrap();
        assert_eq!(worklist.user, "it");
        assert_eq!(worklist.timestamp, timestamp);
        assert_eq!(worklist.transfers, transfers);
        assert!(matches!(executor.execute(), Err(Error::State(_))));
        let rack = store.rack("R1").unwrap();
        assert_eq!(rack.tube_at(&pos("A1")), Some("U"));
        assert_eq!(rack.tube_at(&pos("A2")), Some("T"));
    }

    #[test]
    fn test_two_tubes_into_one_target() {
        let mut store = RackInventory::new()
            .with_rack(rack("R1", &[("A1", "T"), ("A2", "U")]))
            .with_rack(rack("R2", &[]));
        let transfers = vec![
            TubeTransfer::new("T", ("R1", pos("A1")), ("R2", pos("C3"))),
            TubeTransfer::new("U", ("R1", pos("A2")), ("R2", pos("C3"))),
        ];
        let err = TubeTransferExecutor::new(&mut store, transfers, "it")
            .execute()
            .unwrap_err();
        assert!(matches!(err, Error::OccupiedSlot(_)));
    }

    fn triples(store: &RackInventory) -> BTreeSet<(String, String, RackPosition)> {
        store
            .rack_barcodes()
            .into_iter()
            .flat_map(|barcode| {
                let rack = store.rack(&barcode).unwrap();
                rack.tubes()
                    .map(|(position, tube)| (tube.to_string(), barcode.clone(), position))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_execution_applies_every_transfer_or_none(
            moves in proptest::collection::vec((0u16..6, 0u16..12), 1..6),
        ) {
            // Tubes T0..Tn start in row A of R1 and move to row `r` of R2.
            let mut source = TubeRack::new("R1", RackShape::SHAPE_96);
            let mut target = TubeRack::new("R2", RackShape::SHAPE_96);
            target.add_tube(RackPosition::from_indices(0, 0), "BLOCK").unwrap();
            let mut transfers = Vec::new();
            for (i, (row, column)) in moves.iter().enumerate() {
                let tube = format!("T{i}");
                let origin = RackPosition::from_indices(0, i as u16);
                source.add_tube(origin, tube.as_str()).unwrap();
                transfers.push(TubeTransfer::new(
                    tube,
                    ("R1", origin),
                    ("R2", RackPosition::from_indices(*row, *column)),
                ));
            }
            let mut store = RackInventory::new().with_rack(source).with_rack(target);
            let before = triples(&store);
            let result = TubeTransferExecutor::new(&mut store, transfers.clone(), "it").execute();
            let after = triples(&store);
            match result {
                Ok(_) => {
                    let mut expected = before.clone();
                    for t in &transfers {
                        prop_assert!(expected.remove(&(
                            t.tube_barcode.clone(),
                            t.source_rack.clone(),
                            t.source_position
                        )));
                        expected.insert((t.tube_barcode.clone(), t.target_rack.clone(), t.target_position));
                    }
                    prop_assert_eq!(after, expected);
                }
                Err(_) => prop_assert_eq!(after, before),
            }
        }
    }
}
