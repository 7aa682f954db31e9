// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thelma_layouts::{Frozen, TransfectionLayout, WorkingPosition};

use super::{
    GeneratorContext, biomek_transfer_worklist, cell_suspension_worklist,
    cybio_transfer_worklist, optimem_worklist, reagent_worklist,
};
use crate::settings::PlannerSettings;
use crate::well_associator::WellAssociation;
use crate::worklist::WorklistSeries;
use crate::{Error, Result};

const OPTIMEM_INDEX: u32 = 0;
const REAGENT_INDEX: u32 = 1;
const TRANSFER_INDEX: u32 = 2;
const CELL_SUSPENSION_INDEX: u32 = 3;

const RACK_TRANSFER_INDEX: u32 = 0;
const RACK_CELL_SUSPENSION_INDEX: u32 = 1;

/// Worklist series keyed by `<experiment>` (ISO plate) or
/// `<experiment>-<design rack>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSeries {
    pub series: IndexMap<String, WorklistSeries>,
    pub warnings: Vec<String>,
}

/// Builds the ordered worklist series of an experiment from the frozen ISO
/// layout.
pub struct SeriesGenerator<'a> {
    context: GeneratorContext<'a>,
    iso_layout: &'a Frozen<TransfectionLayout>,
    supports_mastermix: bool,
}

impl<'a> SeriesGenerator<'a> {
    pub fn new(
        experiment_label: &'a str,
        settings: &'a PlannerSettings,
        iso_layout: &'a Frozen<TransfectionLayout>,
        supports_mastermix: bool,
    ) -> Self {
        SeriesGenerator {
            context: GeneratorContext {
                experiment_label,
                settings,
            },
            iso_layout,
            supports_mastermix,
        }
    }

    /// OptiMem and reagent dilutions, unless the mastermix is not supported.
    fn add_mastermix_worklists(
        &self,
        series: &mut WorklistSeries,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        if !self.supports_mastermix {
            warnings.push(
                "The ISO layout does not support a mastermix. The OptiMem and reagent \
                 worklists are not generated."
                    .to_string(),
            );
            return Ok(());
        }
        series.add_worklist(OPTIMEM_INDEX, optimem_worklist(&self.context, self.iso_layout)?)?;
        series.add_worklist(REAGENT_INDEX, reagent_worklist(&self.context, self.iso_layout)?)?;
        Ok(())
    }

    /// One series for the ISO plate and one per design rack with the BioMek
    /// transfer and the cell suspension.
    pub fn optimisation(
        &self,
        association: &WellAssociation,
        design_racks: &BTreeMap<String, TransfectionLayout>,
    ) -> Result<GeneratedSeries> {
        let mut generated = GeneratedSeries::default();
        let mut source_series = WorklistSeries::new();
        self.add_mastermix_worklists(&mut source_series, &mut generated.warnings)?;
        if !source_series.is_empty() {
            generated
                .series
                .insert(self.context.experiment_label.to_string(), source_series);
        }

        for (rack, targets) in design_racks {
            let sources = association.design_rack_layouts.get(rack).ok_or_else(|| {
                Error::State(format!("Design rack {rack} has not been associated."))
            })?;
            let mut series = WorklistSeries::new();
            series.add_worklist(
                RACK_TRANSFER_INDEX,
                biomek_transfer_worklist(&self.context, rack, sources)?,
            )?;
            let wells = targets
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.rack_position);
            series.add_worklist(
                RACK_CELL_SUSPENSION_INDEX,
                cell_suspension_worklist(&self.context, Some(rack), wells)?,
            )?;
            generated.series.insert(
                format!("{}-{rack}", self.context.experiment_label),
                series,
            );
        }
        Ok(generated)
    }

    /// A single series: OptiMem, reagent, CyBio transfer and cell suspension.
    pub fn screening(&self) -> Result<GeneratedSeries> {
        let mut generated = GeneratedSeries::default();
        let mut series = WorklistSeries::new();
        self.add_mastermix_worklists(&mut series, &mut generated.warnings)?;
        series.add_worklist(TRANSFER_INDEX, cybio_transfer_worklist(&self.context)?)?;
        let wells = self
            .iso_layout
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.rack_position);
        series.add_worklist(
            CELL_SUSPENSION_INDEX,
            cell_suspension_worklist(&self.context, None, wells)?,
        )?;
        generated
            .series
            .insert(self.context.experiment_label.to_string(), series);
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::test_support::{layout, pos, sample};
    use crate::worklist::TransferType;
    use thelma_layouts::{PoolValue, TransfectionPosition};

    fn iso_layout() -> Frozen<TransfectionLayout> {
        layout(vec![
            sample("B2", 4.0),
            sample("B3", 4.0),
            TransfectionPosition::new(pos("B4"), PoolValue::Untreated),
        ])
        .freeze()
    }

    #[test]
    fn test_screening_series_order() {
        let settings = PlannerSettings::default();
        let iso = iso_layout();
        let generated = SeriesGenerator::new("exp", &settings, &iso, true)
            .screening()
            .unwrap();
        let series = &generated.series["exp"];
        let labels: Vec<_> = series.iter().map(|(i, w)| (i, w.label().to_string())).collect();
        assert_eq!(
            labels,
            vec![
                (0, "exp_optimem".to_string()),
                (1, "exp_reagent".to_string()),
                (2, "exp_cybio_transfer".to_string()),
                (3, "exp_cellsuspension".to_string()),
            ]
        );
        // Untreated wells receive cells but no transfection.
        assert_eq!(series.get(0).unwrap().len(), 2);
        assert_eq!(series.get(3).unwrap().len(), 3);
        assert!(generated.warnings.is_empty());
    }

    #[test]
    fn test_without_mastermix_the_dilutions_are_omitted() {
        let settings = PlannerSettings::default();
        let iso = iso_layout();
        let generated = SeriesGenerator::new("exp", &settings, &iso, false)
            .screening()
            .unwrap();
        let series = &generated.series["exp"];
        assert!(series.get(0).is_none());
        assert_eq!(
            series.get(2).unwrap().transfer_type(),
            TransferType::RackSampleTransfer
        );
        assert_eq!(generated.warnings.len(), 1);
    }

    #[test]
    fn test_optimisation_series() {
        let settings = PlannerSettings::default();
        let iso = iso_layout();
        let mut sources = layout(vec![sample("B2", 4.0)]);
        sources
            .get_mut(&pos("B2"))
            .unwrap()
            .unwrap()
            .cell_plate_positions = [pos("C3"), pos("C4")].into();
        let association = WellAssociation {
            design_rack_layouts: BTreeMap::from([("1".to_string(), sources)]),
            final_concentrations: BTreeMap::new(),
        };
        let targets = BTreeMap::from([(
            "1".to_string(),
            layout(vec![
                sample("C3", 4.0),
                sample("C4", 4.0),
                TransfectionPosition::new(pos("C5"), PoolValue::Untreated),
            ]),
        )]);
        let generated = SeriesGenerator::new("exp", &settings, &iso, true)
            .optimisation(&association, &targets)
            .unwrap();
        let keys: Vec<_> = generated.series.keys().cloned().collect();
        assert_eq!(keys, vec!["exp", "exp-1"]);
        let rack_series = &generated.series["exp-1"];
        assert_eq!(rack_series.get(0).unwrap().label(), "exp-1_biomek_transfer");
        assert_eq!(rack_series.get(0).unwrap().len(), 2);
        assert_eq!(rack_series.get(1).unwrap().len(), 3);
        assert_eq!(generated.series["exp"].len(), 2);
    }
}
