// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use thelma_layouts::TransfectionLayout;
use thelma_racks::PipettingSpecsKind;

use super::{GeneratorContext, WorklistRole};
use crate::worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType};
use crate::{Error, Result};

/// Transfer the mastermix from each ISO position to the cell plate wells of
/// one design rack.
///
/// `association` holds the ISO positions used by the design rack, each with
/// its target wells.
pub fn biomek_transfer_worklist(
    context: &GeneratorContext<'_>,
    design_rack: &str,
    association: &TransfectionLayout,
) -> Result<PlannedWorklist> {
    let label = context.label(Some(design_rack), WorklistRole::BiomekTransfer);
    let mut worklist = PlannedWorklist::new(
        label.as_str(),
        TransferType::SampleTransfer,
        PipettingSpecsKind::Biomek,
    );
    for position in association.iter() {
        for target in &position.cell_plate_positions {
            worklist.add_transfer(PlannedLiquidTransfer::SampleTransfer {
                volume: context.settings.transfer_volume,
                source_position: position.rack_position,
                target_position: *target,
            })?;
        }
    }
    if worklist.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Unable to generate worklist {label}, design rack {design_rack} has no target wells."
        )));
    }
    Ok(worklist)
}
