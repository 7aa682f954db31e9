// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use thelma_racks::{PipettingSpecsKind, RackPosition};

use super::{GeneratorContext, WorklistRole};
use crate::worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType};
use crate::{Error, Result};

pub const CELL_SUSPENSION_DILUENT: &str = "cellsuspension";

/// Add cell suspension to every target well of an experiment rack.
pub fn cell_suspension_worklist(
    context: &GeneratorContext<'_>,
    design_rack: Option<&str>,
    target_wells: impl IntoIterator<Item = RackPosition>,
) -> Result<PlannedWorklist> {
    let label = context.label(design_rack, WorklistRole::CellSuspension);
    let mut worklist = PlannedWorklist::new(
        label.as_str(),
        TransferType::SampleDilution,
        PipettingSpecsKind::Biomek,
    );
    for target in target_wells {
        worklist.add_transfer(PlannedLiquidTransfer::SampleDilution {
            volume: context.settings.cell_suspension_volume,
            target_position: target,
            diluent_info: CELL_SUSPENSION_DILUENT.to_string(),
        })?;
    }
    if worklist.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Unable to generate worklist {label}, there are no target wells."
        )));
    }
    Ok(worklist)
}
