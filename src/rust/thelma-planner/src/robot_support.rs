// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use thelma_layouts::transfection::distinct_values;
use thelma_layouts::{FactorValue, Scenario, TransfectionLayout};
use thelma_racks::{PipettingSpecsKind, RackPosition, ReservoirSpecsKind, join_labels};
use thelma_sectors::{
    AssociationData, ConcentrationKind, RackSectorTranslator, SectorIndex, TranslationBehaviour,
    sector_index,
};
use thelma_units::{
    Concentration, Microliters, Nanomolar, TOLERANCE, Volume, format_number, microliters,
};

use crate::settings::PlannerSettings;
use crate::{Error, Result};

/// ISO volume and concentration of the plates of a screening library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LibraryParameters {
    pub iso_volume: Volume<Microliters>,
    pub iso_concentration: Concentration<Nanomolar>,
    pub reservoir_specs: ReservoirSpecsKind,
}

/// Outcome of the robot-support determination.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotSupport {
    pub supports_mastermix: bool,
    pub reservoir_specs: ReservoirSpecsKind,
    /// Sector association of screening layouts.
    pub association: Option<AssociationData>,
    pub warnings: Vec<String>,
}

fn relatively_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE * b.abs().max(1.0)
}

/// Decides whether the ISO layout admits a mastermix workflow and fills in
/// missing ISO volumes and concentrations.
///
/// Running the determiner on its own output makes no further changes.
pub struct RobotSupportDeterminer<'a> {
    layout: &'a mut TransfectionLayout,
    scenario: Scenario,
    settings: &'a PlannerSettings,
    number_replicates: usize,
    target_well_counts: BTreeMap<RackPosition, usize>,
    library: Option<LibraryParameters>,
    warnings: Vec<String>,
    supports_mastermix: bool,
}

#[derive(Default)]
struct PositionUpdate {
    iso_volume: Option<Volume<Microliters>>,
    iso_concentration: Option<Concentration<Nanomolar>>,
    optimem_dil_factor: Option<f64>,
}

impl<'a> RobotSupportDeterminer<'a> {
    pub fn new(
        layout: &'a mut TransfectionLayout,
        scenario: Scenario,
        settings: &'a PlannerSettings,
        number_replicates: usize,
    ) -> Self {
        RobotSupportDeterminer {
            layout,
            scenario,
            settings,
            number_replicates,
            target_well_counts: BTreeMap::new(),
            library: None,
            warnings: Vec::new(),
            supports_mastermix: true,
        }
    }

    /// Number of cell plate wells (over all design racks, without
    /// replicates) supplied by each ISO position.
    pub fn with_target_well_counts(mut self, counts: BTreeMap<RackPosition, usize>) -> Self {
        self.target_well_counts = counts;
        self
    }

    /// Every ISO position supplies the same number of cell plate wells.
    pub fn with_uniform_target_well_count(mut self, count: usize) -> Self {
        self.target_well_counts = self
            .layout
            .liquid_positions()
            .map(|p| (p.rack_position, count))
            .collect();
        self
    }

    pub fn with_library(mut self, library: LibraryParameters) -> Self {
        self.library = Some(library);
        self
    }

    pub fn run(mut self) -> Result<RobotSupport> {
        let default_reservoir = if self.layout.shape().size() > 96 {
            ReservoirSpecsKind::Standard384
        } else {
            ReservoirSpecsKind::Standard96
        };
        if !self.scenario.traits().supports_robot {
            return Ok(RobotSupport {
                supports_mastermix: false,
                reservoir_specs: default_reservoir,
                association: None,
                warnings: Vec::new(),
            });
        }
        if !self.layout.iter().any(|p| p.is_sample()) {
            return Err(Error::InvalidInput(
                "The ISO layout does not contain any sample positions.".to_string(),
            ));
        }

        let mut association = None;
        let reservoir_specs = match self.scenario {
            Scenario::Library => self.check_library()?,
            Scenario::Screening => {
                let factors = self.layout.optimem_dil_factors();
                if factors.len() > 1 {
                    let factors: Vec<String> = factors.into_iter().map(format_number).collect();
                    return Err(Error::LayoutInconsistency(format!(
                        "Screening layouts must use a single OptiMem dilution factor, found: {}.",
                        factors.join(", ")
                    )));
                }
                if self.layout.shape().size() > 96 {
                    association = Some(AssociationData::new(&*self.layout, ConcentrationKind::Final)?);
                }
                self.check_mastermix(
                    PipettingSpecsKind::CyBio,
                    default_reservoir,
                    association.as_ref(),
                )?
            }
            _ => self.check_mastermix(PipettingSpecsKind::Biomek, default_reservoir, None)?,
        };

        for warning in &self.warnings {
            thelma_log::warn!("{}", warning);
        }
        thelma_log::diagnostic!(
            "Robot support for the {} scenario: mastermix {}, reservoir {}.",
            self.scenario,
            self.supports_mastermix,
            reservoir_specs
        );
        Ok(RobotSupport {
            supports_mastermix: self.supports_mastermix,
            reservoir_specs,
            association,
            warnings: self.warnings,
        })
    }

    fn disable(&mut self, reason: String) {
        self.warnings.push(format!("{reason} Robot support is disabled."));
        self.supports_mastermix = false;
    }

    fn target_well_count(&self, position: &RackPosition) -> usize {
        self.target_well_counts.get(position).copied().unwrap_or(0)
    }

    /// Smallest ISO volume that yields enough mastermix for all target
    /// wells, raised to the pipetting minimum.
    fn expected_iso_volume(
        &self,
        target_wells: usize,
        optimem_dil_factor: f64,
        specs: PipettingSpecsKind,
    ) -> Volume<Microliters> {
        let settings = self.settings;
        let required = (target_wells * self.number_replicates) as f64 * settings.transfer_volume.value();
        let volume = required
            / (optimem_dil_factor
                * settings.reagent_mastermix_dilution_factor
                * settings.mastermix_dead_factor);
        let volume = microliters(volume).round_up(1);
        let minimum = specs.specs().min_transfer_volume;
        if volume.is_smaller_than(minimum) {
            minimum
        } else {
            volume
        }
    }

    /// Expected ISO volume of every liquid position.
    ///
    /// With a sector association, a sector with a parent is prepared by
    /// diluting the parent position of the same quadrant, so the parent
    /// volume includes the volume transferred to its children.
    fn expected_iso_volumes(
        &self,
        specs: PipettingSpecsKind,
        association: Option<&AssociationData>,
    ) -> Result<BTreeMap<RackPosition, Volume<Microliters>>> {
        let layout: &TransfectionLayout = &*self.layout;
        let mut volumes = BTreeMap::new();
        for position in layout.liquid_positions() {
            if let Some(optimem_dil_factor) = layout.optimem_dil_factor(position) {
                let volume = self.expected_iso_volume(
                    self.target_well_count(&position.rack_position),
                    optimem_dil_factor,
                    specs,
                );
                volumes.insert(position.rack_position, volume);
            }
        }
        let Some(association) = association else {
            return Ok(volumes);
        };

        let number_sectors = association.number_sectors();
        let depth = |sector: SectorIndex| {
            let mut depth = 0;
            let mut current = sector;
            while let Some(parent) = association.parent_sector(current) {
                if depth >= number_sectors {
                    break;
                }
                depth += 1;
                current = parent;
            }
            depth
        };
        let mut children: Vec<SectorIndex> = association
            .occupied_sectors()
            .filter(|sector| association.parent_sector(*sector).is_some())
            .collect();
        children.sort_by_key(|sector| (std::cmp::Reverse(depth(*sector)), *sector));

        let minimum = specs.specs().min_transfer_volume;
        for child in children {
            let Some(parent) = association.parent_sector(child) else {
                continue;
            };
            let (Some(child_concentration), Some(parent_concentration)) = (
                association.sector_concentration(child),
                association.sector_concentration(parent),
            ) else {
                continue;
            };
            let translator = RackSectorTranslator::new(
                number_sectors,
                child,
                parent,
                Some(TranslationBehaviour::ManyToMany),
            )?;
            let child_positions: Vec<RackPosition> = layout
                .iter()
                .filter(|p| p.is_sample())
                .map(|p| p.rack_position)
                .filter(|rack_position| {
                    sector_index(*rack_position, number_sectors).is_ok_and(|s| s == child)
                })
                .collect();
            for child_position in child_positions {
                let Some(child_volume) = volumes.get(&child_position).copied() else {
                    continue;
                };
                let parent_position = translator
                    .translate(child_position)
                    .map_err(thelma_sectors::Error::from)?;
                let Some(parent_volume) = volumes.get_mut(&parent_position) else {
                    continue;
                };
                let transfer = (child_volume * child_concentration.value()
                    / parent_concentration.value())
                .round_up(1);
                let transfer = if transfer.is_smaller_than(minimum) {
                    minimum
                } else {
                    transfer
                };
                *parent_volume = (*parent_volume + transfer).round_up(1);
            }
        }
        Ok(volumes)
    }

    fn check_mastermix(
        &mut self,
        specs: PipettingSpecsKind,
        default_reservoir: ReservoirSpecsKind,
        association: Option<&AssociationData>,
    ) -> Result<ReservoirSpecsKind> {
        let expected_volumes = self.expected_iso_volumes(specs, association)?;
        let layout: &TransfectionLayout = &*self.layout;
        let minimum = specs.specs().min_transfer_volume;
        let mut updates: BTreeMap<RackPosition, PositionUpdate> = BTreeMap::new();
        let mut mismatching = BTreeSet::new();
        let mut missing_final = BTreeSet::new();
        let mut above_stock = BTreeSet::new();
        let mut below_minimum = BTreeSet::new();
        let mut insufficient = BTreeSet::new();
        let mut mastermix_volume = microliters(0.0);

        for position in layout.liquid_positions() {
            let rack_position = position.rack_position;
            let Some(optimem_dil_factor) = layout.optimem_dil_factor(position) else {
                continue;
            };
            let mut update = PositionUpdate::default();

            if position.is_sample() {
                let sector_concentration = match association {
                    Some(association) => association.sector_concentration(sector_index(
                        rack_position,
                        association.number_sectors(),
                    )?),
                    None => None,
                };
                match sector_concentration.or(position.final_concentration()) {
                    Some(final_concentration) => {
                        let expected = final_concentration
                            * self.settings.total_dilution_factor(optimem_dil_factor);
                        let iso_concentration = match position.iso_concentration() {
                            Some(actual) => {
                                if !relatively_close(actual.value(), expected.value()) {
                                    mismatching.insert(rack_position);
                                }
                                actual
                            }
                            None => {
                                update.iso_concentration = Some(expected);
                                expected
                            }
                        };
                        if layout
                            .stock_concentration(position)
                            .is_some_and(|stock| iso_concentration.is_larger_than(stock))
                        {
                            above_stock.insert(rack_position);
                        }
                    }
                    None => {
                        if position.iso_concentration().is_none() {
                            missing_final.insert(rack_position);
                        }
                    }
                }
            }

            let Some(expected) = expected_volumes.get(&rack_position).copied() else {
                continue;
            };
            let iso_volume = match position.iso_volume() {
                Some(actual) if actual.is_smaller_than(minimum) => {
                    below_minimum.insert(rack_position);
                    actual
                }
                Some(actual) => {
                    if actual.is_smaller_than(expected) {
                        insufficient.insert(rack_position);
                    }
                    actual
                }
                None => {
                    update.iso_volume = Some(expected);
                    expected
                }
            };
            let volume = iso_volume
                * optimem_dil_factor
                * self.settings.reagent_mastermix_dilution_factor;
            if volume > mastermix_volume {
                mastermix_volume = volume;
            }
            if update.iso_volume.is_some() || update.iso_concentration.is_some() {
                updates.insert(rack_position, update);
            }
        }

        if !above_stock.is_empty() {
            return Err(Error::VolumeConcentration(format!(
                "The ISO concentration exceeds the stock concentration for the following \
                 positions: {}.",
                join_labels(&above_stock)
            )));
        }
        if !below_minimum.is_empty() {
            return Err(Error::VolumeConcentration(format!(
                "The ISO volume is below the minimum transfer volume of the {} ({}) for the \
                 following positions: {}.",
                specs.specs().name,
                minimum,
                join_labels(&below_minimum)
            )));
        }
        if !mismatching.is_empty() {
            self.disable(format!(
                "The ISO concentrations of the following positions do not match the \
                 mastermix recipe: {}.",
                join_labels(&mismatching)
            ));
        }
        if !missing_final.is_empty() {
            self.disable(format!(
                "The final concentration is missing for the following positions: {}.",
                join_labels(&missing_final)
            ));
        }
        if !insufficient.is_empty() {
            self.disable(format!(
                "The ISO volume is not sufficient for a mastermix for the following \
                 positions: {}.",
                join_labels(&insufficient)
            ));
        }

        self.apply(updates)?;
        Ok(self.select_reservoir(default_reservoir, mastermix_volume))
    }

    fn select_reservoir(
        &mut self,
        default_reservoir: ReservoirSpecsKind,
        mastermix_volume: Volume<Microliters>,
    ) -> ReservoirSpecsKind {
        let mut reservoir = default_reservoir;
        if reservoir == ReservoirSpecsKind::Standard96
            && mastermix_volume.is_larger_than(reservoir.specs().max_volume)
        {
            self.warnings.push(format!(
                "The mastermix volume ({mastermix_volume}) exceeds the maximum volume of a {} \
                 plate. The ISO plate is switched to {}.",
                ReservoirSpecsKind::Standard96,
                ReservoirSpecsKind::Deep96
            ));
            reservoir = ReservoirSpecsKind::Deep96;
        }
        if mastermix_volume.is_larger_than(reservoir.specs().max_volume) {
            self.disable(format!(
                "The mastermix volume ({mastermix_volume}) exceeds the maximum volume of a {reservoir} plate."
            ));
        }
        reservoir
    }

    fn check_library(&mut self) -> Result<ReservoirSpecsKind> {
        let library = self.library.ok_or_else(|| {
            Error::InvalidInput("The library ISO volume and concentration are missing.".to_string())
        })?;
        let settings = self.settings;
        let layout: &TransfectionLayout = &*self.layout;
        let max_volume = library.reservoir_specs.specs().max_volume;
        let maximum_optimem_dil_factor = max_volume.value()
            / (library.iso_volume.value() * settings.reagent_mastermix_dilution_factor);
        let minimum_optimem_dil_factor = settings.minimum_optimem_dilution_factor;

        let mut too_large: BTreeMap<String, BTreeSet<RackPosition>> = BTreeMap::new();
        let mut too_small: BTreeMap<String, BTreeSet<RackPosition>> = BTreeMap::new();
        let mut missing_final = BTreeSet::new();
        let mut insufficient = BTreeSet::new();
        let mut sample_factors = Vec::new();
        let mut updates: BTreeMap<RackPosition, PositionUpdate> = BTreeMap::new();

        for position in layout.iter().filter(|p| p.is_sample()) {
            let rack_position = position.rack_position;
            let Some(final_concentration) = position.final_concentration() else {
                missing_final.insert(rack_position);
                continue;
            };
            let optimem_dil_factor = library.iso_concentration.value()
                / final_concentration.value()
                / (settings.reagent_mastermix_dilution_factor * settings.cell_dilution_factor());
            if optimem_dil_factor < minimum_optimem_dil_factor - TOLERANCE {
                too_large
                    .entry(format_number(optimem_dil_factor))
                    .or_default()
                    .insert(rack_position);
                continue;
            }
            if optimem_dil_factor > maximum_optimem_dil_factor + TOLERANCE {
                too_small
                    .entry(format_number(optimem_dil_factor))
                    .or_default()
                    .insert(rack_position);
                continue;
            }
            let required = (self.target_well_count(&rack_position) * self.number_replicates)
                as f64
                * settings.transfer_volume.value();
            let usable = library.iso_volume.value()
                * optimem_dil_factor
                * settings.reagent_mastermix_dilution_factor
                * settings.mastermix_dead_factor;
            if usable < required - TOLERANCE {
                insufficient.insert(rack_position);
            }
            sample_factors.push(optimem_dil_factor);
            updates.insert(
                rack_position,
                PositionUpdate {
                    iso_volume: position
                        .iso_volume
                        .is_unset()
                        .then_some(library.iso_volume),
                    iso_concentration: position
                        .iso_concentration
                        .is_unset()
                        .then_some(library.iso_concentration),
                    optimem_dil_factor: position
                        .optimem_dil_factor
                        .is_unset()
                        .then_some(optimem_dil_factor),
                },
            );
        }

        let describe = |problems: &BTreeMap<String, BTreeSet<RackPosition>>| {
            problems
                .iter()
                .map(|(factor, positions)| format!("{} ({factor})", join_labels(positions)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        if !too_large.is_empty() {
            return Err(Error::VolumeConcentration(format!(
                "Unable to use the library, final concentration too large for the following \
                 positions (required OptiMem dilution factor in brackets, minimum {}): {}.",
                format_number(minimum_optimem_dil_factor),
                describe(&too_large)
            )));
        }
        if !too_small.is_empty() {
            return Err(Error::VolumeConcentration(format!(
                "Unable to use the library, final concentration too small for the following \
                 positions (required OptiMem dilution factor in brackets, maximum {}): {}.",
                format_number(maximum_optimem_dil_factor),
                describe(&too_small)
            )));
        }
        if !missing_final.is_empty() {
            return Err(Error::LayoutInconsistency(format!(
                "The final concentration is missing for the following positions: {}.",
                join_labels(&missing_final)
            )));
        }
        if !insufficient.is_empty() {
            return Err(Error::VolumeConcentration(format!(
                "The library ISO volume ({}) is not sufficient for the following positions: {}.",
                library.iso_volume,
                join_labels(&insufficient)
            )));
        }

        let mock_factor = match distinct_values(sample_factors.into_iter()).as_slice() {
            [factor] => Some(*factor),
            _ => None,
        };
        for position in layout.iter().filter(|p| p.is_mock()) {
            updates.insert(
                position.rack_position,
                PositionUpdate {
                    iso_volume: position
                        .iso_volume
                        .is_unset()
                        .then_some(library.iso_volume),
                    iso_concentration: None,
                    optimem_dil_factor: mock_factor
                        .filter(|_| position.optimem_dil_factor.is_unset()),
                },
            );
        }
        self.apply(updates)?;
        Ok(library.reservoir_specs)
    }

    fn apply(&mut self, updates: BTreeMap<RackPosition, PositionUpdate>) -> Result<()> {
        for (rack_position, update) in updates {
            let Some(position) = self.layout.get_mut(&rack_position)? else {
                continue;
            };
            if let Some(volume) = update.iso_volume {
                position.iso_volume = FactorValue::Set(volume);
            }
            if let Some(concentration) = update.iso_concentration {
                position.iso_concentration = FactorValue::Set(concentration);
            }
            if let Some(factor) = update.optimem_dil_factor {
                position.optimem_dil_factor = FactorValue::Set(factor);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thelma_layouts::{
        MoleculeDesignPool, MoleculeType, PoolValue, TransfectionPosition,
    };
    use thelma_racks::RackShape;
    use thelma_units::nanomolar;

    fn pos(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    fn pool(id: u64, molecule_type: MoleculeType, stock: f64) -> PoolValue {
        PoolValue::Fixed(MoleculeDesignPool {
            id,
            molecule_type,
            stock_concentration: nanomolar(stock),
        })
    }

    fn sample(label: &str, final_concentration: f64) -> TransfectionPosition {
        TransfectionPosition::new(pos(label), pool(205200, MoleculeType::Sirna, 50000.0))
            .with_reagent("RNAi Mix", 140.0)
            .with_final_concentration(nanomolar(final_concentration))
    }

    fn mock(label: &str) -> TransfectionPosition {
        TransfectionPosition::new(pos(label), PoolValue::Mock).with_reagent("RNAi Mix", 140.0)
    }

    fn optimisation_layout() -> TransfectionLayout {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        for position in [sample("B2", 10.0), sample("B3", 20.0), sample("B4", 30.0), mock("B5")] {
            layout.add_position(position).unwrap();
        }
        layout
    }

    fn counts(entries: &[(&str, usize)]) -> BTreeMap<RackPosition, usize> {
        entries.iter().map(|(l, c)| (pos(l), *c)).collect()
    }

    fn optimisation_counts() -> BTreeMap<RackPosition, usize> {
        counts(&[("B2", 2), ("B3", 2), ("B4", 4), ("B5", 2)])
    }

    #[test]
    fn test_optimisation_fills_iso_values() {
        let settings = PlannerSettings::default();
        let mut layout = optimisation_layout();
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(optimisation_counts())
            .run()
            .unwrap();
        assert!(support.supports_mastermix);
        assert_eq!(support.reservoir_specs, ReservoirSpecsKind::Standard96);
        assert!(support.warnings.is_empty());
        let get = |label: &str| layout.get(&pos(label)).unwrap();
        assert_eq!(get("B2").iso_volume(), Some(microliters(3.2)));
        assert_eq!(get("B4").iso_volume(), Some(microliters(6.3)));
        assert_eq!(get("B5").iso_volume(), Some(microliters(3.2)));
        assert_eq!(get("B2").iso_concentration(), Some(nanomolar(560.0)));
        assert_eq!(get("B4").iso_concentration(), Some(nanomolar(1680.0)));
        assert_eq!(get("B5").iso_concentration(), None);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let settings = PlannerSettings::default();
        let mut layout = optimisation_layout();
        let first = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(optimisation_counts())
            .run()
            .unwrap();
        let after_first = layout.clone();
        let second = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(optimisation_counts())
            .run()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(layout, after_first);
    }

    #[test]
    fn test_large_mastermix_switches_to_deep_well_plate() {
        let settings = PlannerSettings::default();
        let mut layout = optimisation_layout();
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(counts(&[("B2", 40)]))
            .run()
            .unwrap();
        assert_eq!(support.reservoir_specs, ReservoirSpecsKind::Deep96);
        assert!(support.supports_mastermix);
        assert_eq!(support.warnings.len(), 1);
        assert_eq!(
            layout.get(&pos("B2")).unwrap().iso_volume(),
            Some(microliters(62.5))
        );
    }

    #[test]
    fn test_iso_concentration_above_stock_is_an_error() {
        let settings = PlannerSettings::default();
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout
            .add_position(
                TransfectionPosition::new(pos("A1"), pool(1, MoleculeType::Sirna, 500.0))
                    .with_final_concentration(nanomolar(10.0)),
            )
            .unwrap();
        let err = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 1)
            .run()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The ISO concentration exceeds the stock concentration for the following positions: A1."
        );
    }

    #[test]
    fn test_minimum_volume_boundary() {
        let settings = PlannerSettings::default();
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout
            .add_position(sample("A1", 10.0).with_iso_volume(microliters(2.0)))
            .unwrap();
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(counts(&[("A1", 1)]))
            .run()
            .unwrap();
        assert!(support.supports_mastermix);

        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout
            .add_position(sample("A1", 10.0).with_iso_volume(microliters(2.0 - 1e-3)))
            .unwrap();
        let err = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(counts(&[("A1", 1)]))
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::VolumeConcentration(_)));
    }

    #[test]
    fn test_mismatches_disable_mastermix() {
        let settings = PlannerSettings::default();
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout
            .add_position(
                sample("A1", 10.0)
                    .with_iso_concentration(nanomolar(600.0))
                    .with_iso_volume(microliters(2.0)),
            )
            .unwrap();
        let before = layout.clone();
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Optimisation, &settings, 2)
            .with_target_well_counts(counts(&[("A1", 4)]))
            .run()
            .unwrap();
        assert!(!support.supports_mastermix);
        assert_eq!(support.warnings.len(), 2);
        assert!(support.warnings[0].starts_with("The ISO concentrations"));
        assert!(support.warnings[1].starts_with("The ISO volume is not sufficient"));
        assert_eq!(layout, before);
    }

    #[test]
    fn test_scenarios_without_robot_support() {
        let settings = PlannerSettings::default();
        for scenario in [Scenario::Manual, Scenario::OrderOnly, Scenario::IsoLess] {
            let mut layout = optimisation_layout();
            let support = RobotSupportDeterminer::new(&mut layout, scenario, &settings, 2)
                .run()
                .unwrap();
            assert!(!support.supports_mastermix);
            assert_eq!(layout, optimisation_layout());
        }
    }

    fn screening_layout() -> TransfectionLayout {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_384);
        for (label, id, concentration) in [
            ("A1", 205200, 10.0),
            ("B1", 205200, 10.0),
            ("A2", 205201, 20.0),
            ("B2", 205201, 20.0),
        ] {
            layout
                .add_position(
                    TransfectionPosition::new(pos(label), pool(id, MoleculeType::Sirna, 50000.0))
                        .with_final_concentration(nanomolar(concentration)),
                )
                .unwrap();
        }
        layout
    }

    #[test]
    fn test_screening_uses_sector_association() {
        let settings = PlannerSettings::default();
        let mut layout = screening_layout();
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Screening, &settings, 2)
            .with_uniform_target_well_count(2)
            .run()
            .unwrap();
        assert!(support.supports_mastermix);
        assert_eq!(support.reservoir_specs, ReservoirSpecsKind::Standard384);
        let association = support.association.unwrap();
        assert_eq!(association.associated_sectors().len(), 2);
        assert_eq!(association.parent_sector(2), Some(0));
        assert_eq!(association.parent_sector(3), Some(1));
        for (label, volume) in [("A1", 6.4), ("A2", 6.4), ("B1", 3.2), ("B2", 3.2)] {
            assert_eq!(
                layout.get(&pos(label)).unwrap().iso_volume(),
                Some(microliters(volume)),
                "{label}"
            );
        }
    }

    #[test]
    fn test_screening_cascade_volumes() {
        let settings = PlannerSettings::default();
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_384);
        for (label, concentration) in [("A1", 40.0), ("A2", 20.0), ("B1", 10.0), ("B2", 5.0)] {
            layout
                .add_position(
                    TransfectionPosition::new(pos(label), pool(205200, MoleculeType::Sirna, 50000.0))
                        .with_final_concentration(nanomolar(concentration)),
                )
                .unwrap();
        }
        let support = RobotSupportDeterminer::new(&mut layout, Scenario::Screening, &settings, 2)
            .with_uniform_target_well_count(2)
            .run()
            .unwrap();
        assert!(support.supports_mastermix);
        let association = support.association.unwrap();
        assert_eq!(association.parent_sector(1), Some(0));
        assert_eq!(association.parent_sector(2), Some(1));
        assert_eq!(association.parent_sector(3), Some(2));
        for (label, volume, concentration) in [
            ("A1", 6.0, 2240.0),
            ("A2", 5.6, 1120.0),
            ("B1", 4.8, 560.0),
            ("B2", 3.2, 280.0),
        ] {
            let position = layout.get(&pos(label)).unwrap();
            assert_eq!(position.iso_volume(), Some(microliters(volume)), "{label}");
            assert_eq!(
                position.iso_concentration(),
                Some(nanomolar(concentration)),
                "{label}"
            );
        }

        let before = layout.clone();
        RobotSupportDeterminer::new(&mut layout, Scenario::Screening, &settings, 2)
            .with_uniform_target_well_count(2)
            .run()
            .unwrap();
        assert_eq!(layout, before);
    }

    #[test]
    fn test_screening_requires_single_optimem_dilution_factor() {
        let settings = PlannerSettings::default();
        let mut layout = screening_layout();
        layout
            .add_position(
                TransfectionPosition::new(pos("C1"), pool(7, MoleculeType::MirnaMimic, 50000.0))
                    .with_final_concentration(nanomolar(10.0)),
            )
            .unwrap();
        let err = RobotSupportDeterminer::new(&mut layout, Scenario::Screening, &settings, 2)
            .with_uniform_target_well_count(2)
            .run()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Screening layouts must use a single OptiMem dilution factor, found: 3, 4."
        );
    }

    fn library_layout(final_concentration: f64) -> TransfectionLayout {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_384);
        layout
            .add_position(
                TransfectionPosition::new(pos("A1"), PoolValue::Library)
                    .with_final_concentration(nanomolar(final_concentration)),
            )
            .unwrap();
        layout
            .add_position(TransfectionPosition::new(pos("A2"), PoolValue::Mock))
            .unwrap();
        layout
    }

    fn library() -> LibraryParameters {
        LibraryParameters {
            iso_volume: microliters(4.0),
            iso_concentration: nanomolar(3500.0),
            reservoir_specs: ReservoirSpecsKind::Standard384,
        }
    }

    fn run_library(layout: &mut TransfectionLayout) -> Result<RobotSupport> {
        let settings = PlannerSettings::default();
        RobotSupportDeterminer::new(layout, Scenario::Library, &settings, 2)
            .with_uniform_target_well_count(2)
            .with_library(library())
            .run()
    }

    #[test]
    fn test_library_final_concentration_too_large() {
        let mut layout = library_layout(100.0);
        let err = run_library(&mut layout).unwrap_err();
        assert!(matches!(err, Error::VolumeConcentration(_)));
        assert!(err.to_string().contains("final concentration too large"));
        assert!(err.to_string().contains("A1 (2.5)"));
    }

    #[test]
    fn test_library_final_concentration_too_small() {
        let mut layout = library_layout(10.0);
        let err = run_library(&mut layout).unwrap_err();
        assert!(err.to_string().contains("final concentration too small"));
    }

    #[test]
    fn test_library_fills_optimem_dilution_factor() {
        let mut layout = library_layout(40.0);
        let support = run_library(&mut layout).unwrap();
        assert!(support.supports_mastermix);
        assert_eq!(support.reservoir_specs, ReservoirSpecsKind::Standard384);
        let sample = layout.get(&pos("A1")).unwrap();
        assert_eq!(sample.optimem_dil_factor.get(), Some(6.25));
        assert_eq!(sample.iso_volume(), Some(microliters(4.0)));
        assert_eq!(sample.iso_concentration(), Some(nanomolar(3500.0)));
        let mock = layout.get(&pos("A2")).unwrap();
        assert_eq!(mock.optimem_dil_factor.get(), Some(6.25));
        assert_eq!(mock.iso_volume(), Some(microliters(4.0)));
        let after_first = layout.clone();
        run_library(&mut layout).unwrap();
        assert_eq!(layout, after_first);
    }
}
