// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use thelma_layouts::{Frozen, TransfectionLayout};
use thelma_racks::PipettingSpecsKind;

use super::{GeneratorContext, WorklistRole, iso_volumes, optimem_dil_factor};
use crate::Result;
use crate::worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType};

pub const OPTIMEM_DILUENT: &str = "optimem";

/// Dilute every ISO position with OptiMem.
pub fn optimem_worklist(
    context: &GeneratorContext<'_>,
    layout: &Frozen<TransfectionLayout>,
) -> Result<PlannedWorklist> {
    let label = context.label(None, WorklistRole::Optimem);
    let mut worklist = PlannedWorklist::new(
        label.as_str(),
        TransferType::SampleDilution,
        PipettingSpecsKind::Biomek,
    );
    for (position, iso_volume) in iso_volumes(layout, &label)? {
        let dil_factor = optimem_dil_factor(layout, position)?;
        worklist.add_transfer(PlannedLiquidTransfer::SampleDilution {
            volume: iso_volume * (dil_factor - 1.0),
            target_position: position.rack_position,
            diluent_info: OPTIMEM_DILUENT.to_string(),
        })?;
    }
    Ok(worklist)
}
