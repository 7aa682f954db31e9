// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use thelma_racks::PipettingSpecsKind;

use super::{GeneratorContext, WorklistRole};
use crate::Result;
use crate::worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType};

/// Stamp the whole ISO plate onto the cell plate in a single CyBio step.
pub fn cybio_transfer_worklist(context: &GeneratorContext<'_>) -> Result<PlannedWorklist> {
    let mut worklist = PlannedWorklist::new(
        context.label(None, WorklistRole::CybioTransfer),
        TransferType::RackSampleTransfer,
        PipettingSpecsKind::CyBio,
    );
    worklist.add_transfer(PlannedLiquidTransfer::RackSampleTransfer {
        volume: context.settings.transfer_volume,
        number_sectors: 1,
        source_sector_index: 0,
        target_sector_index: 0,
    })?;
    Ok(worklist)
}
