// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use thelma_layouts::{Frozen, TransfectionLayout};
use thelma_racks::{PipettingSpecsKind, RackPosition, join_labels};
use thelma_units::format_number;

use super::{GeneratorContext, WorklistRole, iso_volumes, optimem_dil_factor};
use crate::settings::PlannerSettings;
use crate::worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType};
use crate::{Error, Result};

/// Dilution factor of the reagent stock before it enters the mastermix.
pub fn initial_reagent_dilution_factor(settings: &PlannerSettings, reagent_dil_factor: f64) -> f64 {
    reagent_dil_factor / (settings.reagent_mastermix_dilution_factor * settings.cell_dilution_factor())
}

/// Add the diluted transfection reagent to every OptiMem-diluted ISO
/// position.
pub fn reagent_worklist(
    context: &GeneratorContext<'_>,
    layout: &Frozen<TransfectionLayout>,
) -> Result<PlannedWorklist> {
    let settings = context.settings;
    let label = context.label(None, WorklistRole::Reagent);
    let mut worklist = PlannedWorklist::new(
        label.as_str(),
        TransferType::SampleDilution,
        PipettingSpecsKind::Biomek,
    );
    let mastermix_dil_factor = settings.reagent_mastermix_dilution_factor;
    let mut missing_reagent = BTreeSet::<RackPosition>::new();
    let mut invalid_dil_factor = BTreeSet::<RackPosition>::new();
    let mut transfers = Vec::new();
    for (position, iso_volume) in iso_volumes(layout, &label)? {
        let (Some(name), Some(reagent_dil_factor)) =
            (position.reagent_name(), position.reagent_dil_factor())
        else {
            missing_reagent.insert(position.rack_position);
            continue;
        };
        let initial = initial_reagent_dilution_factor(settings, reagent_dil_factor);
        if initial < 1.0 {
            invalid_dil_factor.insert(position.rack_position);
            continue;
        }
        let optimem_volume = iso_volume * (optimem_dil_factor(layout, position)? - 1.0);
        transfers.push(PlannedLiquidTransfer::SampleDilution {
            volume: (optimem_volume + iso_volume) * (mastermix_dil_factor - 1.0)
                / mastermix_dil_factor,
            target_position: position.rack_position,
            diluent_info: format!("{name} ({})", format_number(reagent_dil_factor)),
        });
    }
    if !missing_reagent.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Unable to generate worklist {label}, the reagent name or dilution factor is \
             missing for the following positions: {}.",
            join_labels(&missing_reagent)
        )));
    }
    if !invalid_dil_factor.is_empty() {
        return Err(Error::VolumeConcentration(format!(
            "Invalid reagent dilution factor for the following positions (the reagent would \
             have to be concentrated): {}.",
            join_labels(&invalid_dil_factor)
        )));
    }
    for transfer in transfers {
        worklist.add_transfer(transfer)?;
    }
    Ok(worklist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::{layout, sample};
    use thelma_units::microliters;

    #[test]
    fn test_reagent_volume_and_diluent() {
        let settings = PlannerSettings::default();
        let context = GeneratorContext {
            experiment_label: "exp",
            settings: &settings,
        };
        let layout = layout(vec![sample("B2", 4.0)]).freeze();
        let worklist = reagent_worklist(&context, &layout).unwrap();
        assert_eq!(worklist.label(), "exp_reagent");
        assert_eq!(
            worklist.transfers(),
            &[PlannedLiquidTransfer::SampleDilution {
                volume: microliters(8.0),
                target_position: RackPosition::from_label("B2").unwrap(),
                diluent_info: "RNAi Mix (140)".to_string(),
            }]
        );
    }

    #[test]
    fn test_reagent_that_would_be_concentrated_is_rejected() {
        let settings = PlannerSettings::default();
        let context = GeneratorContext {
            experiment_label: "exp",
            settings: &settings,
        };
        let layout = layout(vec![sample("B2", 4.0).with_reagent("RNAi Mix", 10.0)]).freeze();
        let err = reagent_worklist(&context, &layout).unwrap_err();
        assert!(matches!(err, Error::VolumeConcentration(_)));
        assert!(err.to_string().ends_with("B2."));
    }

    #[test]
    fn test_initial_dilution_factor() {
        let settings = PlannerSettings::default();
        assert_eq!(initial_reagent_dilution_factor(&settings, 1400.0), 100.0);
    }

    #[test]
    fn test_diluent_names_the_reagent_dilution_factor() {
        let settings = PlannerSettings::default();
        let context = GeneratorContext {
            experiment_label: "exp",
            settings: &settings,
        };
        let layout = layout(vec![sample("B2", 4.0).with_reagent("RNAi Mix", 1400.0)]).freeze();
        let worklist = reagent_worklist(&context, &layout).unwrap();
        assert!(matches!(
            &worklist.transfers()[0],
            PlannedLiquidTransfer::SampleDilution { diluent_info, .. }
                if diluent_info == "RNAi Mix (1400)"
        ));
    }
}
