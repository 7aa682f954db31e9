// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thelma_racks::{PipettingSpecsKind, RackPosition};
use thelma_sectors::SectorIndex;
use thelma_units::{Microliters, Volume};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    SampleDilution,
    SampleTransfer,
    RackSampleTransfer,
}

impl Display for TransferType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferType::SampleDilution => "sample dilution",
            TransferType::SampleTransfer => "sample transfer",
            TransferType::RackSampleTransfer => "rack sample transfer",
        };
        write!(f, "{name}")
    }
}

/// A single planned pipetting step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlannedLiquidTransfer {
    /// Add diluent (buffer, medium, reagent) to a well.
    SampleDilution {
        volume: Volume<Microliters>,
        target_position: RackPosition,
        diluent_info: String,
    },
    SampleTransfer {
        volume: Volume<Microliters>,
        source_position: RackPosition,
        target_position: RackPosition,
    },
    /// Parallel transfer of all wells of a sector.
    RackSampleTransfer {
        volume: Volume<Microliters>,
        number_sectors: u16,
        source_sector_index: SectorIndex,
        target_sector_index: SectorIndex,
    },
}

impl PlannedLiquidTransfer {
    pub fn transfer_type(&self) -> TransferType {
        match self {
            PlannedLiquidTransfer::SampleDilution { .. } => TransferType::SampleDilution,
            PlannedLiquidTransfer::SampleTransfer { .. } => TransferType::SampleTransfer,
            PlannedLiquidTransfer::RackSampleTransfer { .. } => TransferType::RackSampleTransfer,
        }
    }

    pub fn volume(&self) -> Volume<Microliters> {
        match self {
            PlannedLiquidTransfer::SampleDilution { volume, .. }
            | PlannedLiquidTransfer::SampleTransfer { volume, .. }
            | PlannedLiquidTransfer::RackSampleTransfer { volume, .. } => *volume,
        }
    }

    pub fn target_position(&self) -> Option<RackPosition> {
        match self {
            PlannedLiquidTransfer::SampleDilution {
                target_position, ..
            }
            | PlannedLiquidTransfer::SampleTransfer {
                target_position, ..
            } => Some(*target_position),
            PlannedLiquidTransfer::RackSampleTransfer { .. } => None,
        }
    }
}

/// An ordered list of planned transfers of a single type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWorklist {
    label: String,
    transfer_type: TransferType,
    pipetting_specs: PipettingSpecsKind,
    transfers: Vec<PlannedLiquidTransfer>,
}

impl PlannedWorklist {
    pub fn new(
        label: impl Into<String>,
        transfer_type: TransferType,
        pipetting_specs: PipettingSpecsKind,
    ) -> Self {
        PlannedWorklist {
            label: label.into(),
            transfer_type,
            pipetting_specs,
            transfers: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn pipetting_specs(&self) -> PipettingSpecsKind {
        self.pipetting_specs
    }

    pub fn transfers(&self) -> &[PlannedLiquidTransfer] {
        &self.transfers
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Append a transfer. The transfer must match the worklist type and its
    /// volume must not be below the minimum of the pipetting specs.
    pub fn add_transfer(&mut self, transfer: PlannedLiquidTransfer) -> Result<()> {
        if transfer.transfer_type() != self.transfer_type {
            return Err(Error::InvalidInput(format!(
                "Worklist {} only accepts {} transfers, got a {} transfer.",
                self.label,
                self.transfer_type,
                transfer.transfer_type()
            )));
        }
        let specs = self.pipetting_specs.specs();
        if transfer.volume().is_smaller_than(specs.min_transfer_volume) {
            let position = transfer
                .target_position()
                .map(|p| format!(" for position {p}"))
                .unwrap_or_default();
            return Err(Error::VolumeConcentration(format!(
                "The transfer volume {}{position} in worklist {} is below the minimum \
                 transfer volume of the {} ({}).",
                transfer.volume(),
                self.label,
                specs.name,
                specs.min_transfer_volume
            )));
        }
        self.transfers.push(transfer);
        Ok(())
    }
}

/// Worklists indexed by their position in the execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorklistSeries {
    worklists: BTreeMap<u32, PlannedWorklist>,
}

impl WorklistSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a worklist. Attached worklists are not modified anymore.
    pub fn add_worklist(&mut self, index: u32, worklist: PlannedWorklist) -> Result<()> {
        if let Some(existing) = self.worklists.get(&index) {
            return Err(Error::State(format!(
                "Index {index} of the worklist series is already used by worklist {}.",
                existing.label()
            )));
        }
        self.worklists.insert(index, worklist);
        Ok(())
    }

    pub fn get(&self, index: u32) -> Option<&PlannedWorklist> {
        self.worklists.get(&index)
    }

    /// Worklists in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PlannedWorklist)> {
        self.worklists.iter().map(|(index, worklist)| (*index, worklist))
    }

    pub fn find(&self, label: &str) -> Option<&PlannedWorklist> {
        self.worklists.values().find(|w| w.label() == label)
    }

    pub fn len(&self) -> usize {
        self.worklists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worklists.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::new(format!("Cannot serialize series: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("Invalid worklist series: {e}.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thelma_units::microliters;

    fn pos(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    fn dilution(volume: f64, label: &str) -> PlannedLiquidTransfer {
        PlannedLiquidTransfer::SampleDilution {
            volume: microliters(volume),
            target_position: pos(label),
            diluent_info: "optimem".to_string(),
        }
    }

    #[test]
    fn test_minimum_volume_boundary() {
        let mut worklist =
            PlannedWorklist::new("exp_optimem", TransferType::SampleDilution, PipettingSpecsKind::Biomek);
        worklist.add_transfer(dilution(2.0, "A1")).unwrap();
        let err = worklist.add_transfer(dilution(2.0 - 1e-3, "A2")).unwrap_err();
        assert!(matches!(err, Error::VolumeConcentration(_)));
        assert_eq!(
            err.to_string(),
            "The transfer volume 1.999 ul for position A2 in worklist exp_optimem is below \
             the minimum transfer volume of the BioMek (2 ul)."
        );
        assert_eq!(worklist.len(), 1);
    }

    #[test]
    fn test_transfer_type_must_match() {
        let mut worklist =
            PlannedWorklist::new("exp_transfer", TransferType::SampleTransfer, PipettingSpecsKind::Biomek);
        assert!(matches!(
            worklist.add_transfer(dilution(5.0, "A1")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_series_indices_are_unique() {
        let mut series = WorklistSeries::new();
        let worklist =
            PlannedWorklist::new("a", TransferType::SampleDilution, PipettingSpecsKind::Biomek);
        series.add_worklist(1, worklist.clone()).unwrap();
        series.add_worklist(0, worklist.clone()).unwrap();
        assert!(matches!(series.add_worklist(1, worklist), Err(Error::State(_))));
        assert_eq!(series.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_series_json_round_trip() {
        let mut dilutions =
            PlannedWorklist::new("exp_optimem", TransferType::SampleDilution, PipettingSpecsKind::Biomek);
        dilutions.add_transfer(dilution(9.6, "B3")).unwrap();
        dilutions.add_transfer(dilution(3.0, "B2")).unwrap();
        let mut transfers = PlannedWorklist::new(
            "exp_cybio_transfer",
            TransferType::RackSampleTransfer,
            PipettingSpecsKind::CyBio,
        );
        transfers
            .add_transfer(PlannedLiquidTransfer::RackSampleTransfer {
                volume: microliters(5.0),
                number_sectors: 1,
                source_sector_index: 0,
                target_sector_index: 0,
            })
            .unwrap();
        let mut series = WorklistSeries::new();
        series.add_worklist(0, dilutions).unwrap();
        series.add_worklist(2, transfers).unwrap();

        let json = series.to_json().unwrap();
        assert!(json.contains("\"type\":\"sample_dilution\""));
        let reloaded = WorklistSeries::from_json(&json).unwrap();
        assert_eq!(reloaded, series);
        assert_eq!(
            reloaded.get(0).unwrap().transfers()[0].target_position(),
            Some(pos("B3"))
        );
    }
}
