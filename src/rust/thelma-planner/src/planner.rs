// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thelma_layouts::{
    Frozen, MoleculeType, PoolCatalog, RackLayout, Scenario, TagPosition, TransfectionLayout,
    TransfectionLayoutConverter, TransfectionParameter, WorkingLayout,
};
use thelma_racks::ReservoirSpecsKind;
use thelma_sectors::AssociationData;
use thelma_units::{Concentration, Nanomolar};

use crate::generators::{GeneratedSeries, SeriesGenerator};
use crate::robot_support::{LibraryParameters, RobotSupportDeterminer};
use crate::settings::PlannerSettings;
use crate::well_associator::{WellAssociation, WellAssociator};
use crate::worklist::WorklistSeries;
use crate::{Error, Result};

/// Creator of the tagged position sets written by the planner.
pub const PLANNER_CREATOR: &str = "thelma planner";

/// Everything planned for one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentPlan {
    /// Design rack layouts carrying the factor and the transfection tags.
    pub experiment_design: BTreeMap<String, RackLayout>,
    /// The ISO layout with the computed ISO volumes and concentrations.
    pub iso_layout: Option<Frozen<TransfectionLayout>>,
    pub supports_mastermix: bool,
    pub reservoir_specs: Option<ReservoirSpecsKind>,
    pub sector_association: Option<AssociationData>,
    pub well_association: Option<WellAssociation>,
    pub worklist_series: IndexMap<String, WorklistSeries>,
    pub warnings: Vec<String>,
}

impl ExperimentPlan {
    /// ISO layout as rack layout, e.g. for persisting the ISO request.
    pub fn iso_rack_layout(&self) -> Result<Option<RackLayout>> {
        Ok(self
            .iso_layout
            .as_ref()
            .map(|layout| layout.create_rack_layout(PLANNER_CREATOR))
            .transpose()?)
    }
}

/// Plans an experiment: scenario validation, well and sector association,
/// robot support and worklist generation.
///
/// Either the full plan is returned or an error; warnings are collected on
/// the plan.
pub struct ExperimentPlanner<'a, C> {
    label: String,
    scenario: Scenario,
    catalog: &'a C,
    iso_layout: Option<&'a RackLayout>,
    design_racks: BTreeMap<String, &'a RackLayout>,
    number_replicates: usize,
    settings: PlannerSettings,
    library: Option<LibraryParameters>,
    floating_pools: Option<(MoleculeType, Concentration<Nanomolar>)>,
}

impl<'a, C: PoolCatalog> ExperimentPlanner<'a, C> {
    pub fn new(label: impl Into<String>, scenario: Scenario, catalog: &'a C) -> Self {
        ExperimentPlanner {
            label: label.into(),
            scenario,
            catalog,
            iso_layout: None,
            design_racks: BTreeMap::new(),
            number_replicates: 1,
            settings: PlannerSettings::default(),
            library: None,
            floating_pools: None,
        }
    }

    pub fn with_iso_layout(mut self, layout: &'a RackLayout) -> Self {
        self.iso_layout = Some(layout);
        self
    }

    pub fn with_design_rack(mut self, name: impl Into<String>, layout: &'a RackLayout) -> Self {
        self.design_racks.insert(name.into(), layout);
        self
    }

    pub fn with_number_replicates(mut self, number_replicates: usize) -> Self {
        self.number_replicates = number_replicates;
        self
    }

    pub fn with_settings(mut self, settings: PlannerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_library(mut self, library: LibraryParameters) -> Self {
        self.library = Some(library);
        self
    }

    /// Molecule type and stock concentration of floating and library
    /// positions.
    pub fn with_floating_pools(
        mut self,
        molecule_type: MoleculeType,
        stock_concentration: Concentration<Nanomolar>,
    ) -> Self {
        self.floating_pools = Some((molecule_type, stock_concentration));
        self
    }

    fn convert(&self, rack_layout: &RackLayout) -> Result<TransfectionLayout> {
        let converter = TransfectionLayoutConverter::new(rack_layout, self.catalog);
        let converter = match self.floating_pools {
            Some((molecule_type, stock)) => converter.with_floating_pools(molecule_type, stock),
            None => converter,
        };
        Ok(converter.convert()?)
    }

    pub fn plan(mut self) -> Result<ExperimentPlan> {
        if self.number_replicates == 0 {
            return Err(Error::InvalidInput(
                "The number of replicates must be at least 1.".to_string(),
            ));
        }
        let mut warnings: Vec<String> = self
            .settings
            .sanitize()?
            .into_iter()
            .map(|change| {
                format!(
                    "The setting {} has been changed from {} to {}. {}",
                    change.field, change.original, change.sanitized, change.reason
                )
            })
            .collect();
        thelma_log::info!(
            "Planning experiment {} ({} scenario, {} design racks).",
            self.label,
            self.scenario,
            self.design_racks.len()
        );

        let mut design_layouts: BTreeMap<String, TransfectionLayout> = BTreeMap::new();
        for (name, rack_layout) in &self.design_racks {
            let layout = self.convert(rack_layout)?;
            self.scenario.validate_design_layout(&layout)?;
            design_layouts.insert(name.clone(), layout);
        }

        let mut iso_layout = match (self.scenario, self.iso_layout) {
            (Scenario::IsoLess, Some(_)) => {
                warnings.push(format!(
                    "The ISO layout is ignored for the {} scenario.",
                    self.scenario
                ));
                None
            }
            (Scenario::IsoLess, None) => None,
            (_, Some(rack_layout)) => Some(self.convert(rack_layout)?),
            (_, None) => {
                return Err(Error::InvalidInput(format!(
                    "The {} scenario requires an ISO layout.",
                    self.scenario
                )));
            }
        };
        if iso_layout
            .as_ref()
            .is_some_and(|layout| !layout.iter().any(|p| p.is_sample()))
        {
            return Err(Error::InvalidInput(
                "The ISO layout does not contain any sample positions.".to_string(),
            ));
        }

        let mut plan = ExperimentPlan {
            experiment_design: BTreeMap::new(),
            iso_layout: None,
            supports_mastermix: false,
            reservoir_specs: None,
            sector_association: None,
            well_association: None,
            worklist_series: IndexMap::new(),
            warnings: Vec::new(),
        };

        if let Some(layout) = iso_layout.as_mut() {
            let well_association = match self.scenario {
                Scenario::Optimisation => Some(
                    WellAssociator::new(layout, &mut design_layouts).associate_optimisation()?,
                ),
                Scenario::Manual => {
                    Some(WellAssociator::new(layout, &mut design_layouts).associate_manual()?)
                }
                _ => None,
            };

            let determiner = RobotSupportDeterminer::new(
                layout,
                self.scenario,
                &self.settings,
                self.number_replicates,
            );
            let determiner = match (&well_association, self.scenario) {
                (Some(association), _) => {
                    determiner.with_target_well_counts(association.target_well_counts())
                }
                (None, Scenario::Screening | Scenario::Library) => {
                    determiner.with_uniform_target_well_count(self.design_racks.len())
                }
                _ => determiner,
            };
            let determiner = match self.library {
                Some(library) => determiner.with_library(library),
                None => determiner,
            };
            let support = determiner.run()?;
            warnings.extend(support.warnings);
            plan.supports_mastermix = support.supports_mastermix;
            plan.reservoir_specs = Some(support.reservoir_specs);
            plan.sector_association = support.association;
            plan.well_association = well_association;
        }

        let iso_layout = iso_layout.map(TransfectionLayout::freeze);
        if let Some(layout) = &iso_layout {
            let generator = SeriesGenerator::new(
                &self.label,
                &self.settings,
                layout,
                plan.supports_mastermix,
            );
            let generated = match (self.scenario, &plan.well_association) {
                (Scenario::Optimisation, Some(association)) => {
                    generator.optimisation(association, &design_layouts)?
                }
                (Scenario::Screening | Scenario::Library, _) => generator.screening()?,
                _ => GeneratedSeries::default(),
            };
            warnings.extend(generated.warnings);
            plan.worklist_series = generated.series;
        }

        for (name, rack_layout) in &self.design_racks {
            let transfection = match self.scenario {
                Scenario::Optimisation | Scenario::Manual => design_layouts
                    .get(name)
                    .map(|layout| layout.create_rack_layout(PLANNER_CREATOR))
                    .transpose()?,
                Scenario::Screening | Scenario::Library => iso_layout
                    .as_ref()
                    .map(|layout| layout.create_rack_layout(PLANNER_CREATOR))
                    .transpose()?,
                Scenario::OrderOnly | Scenario::IsoLess => None,
            };
            let design = match transfection {
                Some(transfection) => merge_design_layout(name, rack_layout, &transfection)?,
                None => (*rack_layout).clone(),
            };
            plan.experiment_design.insert(name.clone(), design);
        }

        for warning in &warnings {
            thelma_log::warn!("{}", warning);
        }
        plan.iso_layout = iso_layout;
        plan.warnings = warnings;
        Ok(plan)
    }
}

/// Replace the transfection tags of a design rack by the given ones, keeping
/// the experimental factor tags.
fn merge_design_layout(
    name: &str,
    design_rack: &RackLayout,
    transfection: &RackLayout,
) -> Result<RackLayout> {
    if design_rack.shape() != transfection.shape() {
        return Err(Error::LayoutInconsistency(format!(
            "Design rack {name} has shape {}, but the transfection layout has shape {}.",
            design_rack.shape(),
            transfection.shape()
        )));
    }
    let mut tag_map = design_rack.tag_map();
    for tags in tag_map.values_mut() {
        tags.retain(|tag| TransfectionParameter::from_alias(&tag.predicate).is_none());
    }
    for (rack_position, tags) in transfection.tag_map() {
        tag_map.entry(rack_position).or_default().extend(tags);
    }
    let mut layout = WorkingLayout::new(design_rack.shape());
    for (rack_position, tags) in tag_map {
        layout.add_position(TagPosition {
            rack_position,
            tags,
        })?;
    }
    Ok(layout.create_rack_layout(PLANNER_CREATOR)?)
}
