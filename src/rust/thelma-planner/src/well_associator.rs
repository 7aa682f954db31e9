// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thelma_layouts::{FactorValue, TransfectionLayout, TransfectionPosition};
use thelma_racks::{RackPosition, join_labels};
use thelma_units::{Concentration, Nanomolar, format_number};

use crate::{Error, Result};

/// Source wells bound to the target wells of each design rack.
#[derive(Debug, Clone, PartialEq)]
pub struct WellAssociation {
    /// Per design rack: the source positions in use, each carrying the
    /// target wells it supplies in `cell_plate_positions`.
    pub design_rack_layouts: BTreeMap<String, TransfectionLayout>,
    /// Per design rack: final concentration of every target well.
    pub final_concentrations: BTreeMap<String, BTreeMap<RackPosition, Concentration<Nanomolar>>>,
}

impl WellAssociation {
    /// Number of target wells per source position over all design racks.
    pub fn target_well_counts(&self) -> BTreeMap<RackPosition, usize> {
        let mut counts = BTreeMap::new();
        for layout in self.design_rack_layouts.values() {
            for position in layout.iter() {
                *counts.entry(position.rack_position).or_insert(0) +=
                    position.cell_plate_positions.len();
            }
        }
        counts
    }
}

/// Binds the target wells of the design racks to source wells of the ISO
/// layout.
///
/// The optimisation variant matches by full hash (falling back to the partial
/// hash when the ISO layout has no final concentrations); the manual variant
/// matches by pool only.
pub struct WellAssociator<'a> {
    source: &'a mut TransfectionLayout,
    design_racks: &'a mut BTreeMap<String, TransfectionLayout>,
}

#[derive(Default)]
struct Collector {
    layouts: BTreeMap<String, BTreeMap<RackPosition, BTreeSet<RackPosition>>>,
    final_concentrations: BTreeMap<String, BTreeMap<RackPosition, Concentration<Nanomolar>>>,
    unmatched: BTreeMap<String, BTreeSet<RackPosition>>,
}

impl Collector {
    fn bind(&mut self, rack: &str, source: RackPosition, target: &TransfectionPosition) {
        self.layouts
            .entry(rack.to_string())
            .or_default()
            .entry(source)
            .or_default()
            .insert(target.rack_position);
        if let Some(concentration) = target.final_concentration() {
            self.final_concentrations
                .entry(rack.to_string())
                .or_default()
                .insert(target.rack_position, concentration);
        }
    }

    fn unmatched(&mut self, rack: &str, target: RackPosition) {
        self.unmatched
            .entry(rack.to_string())
            .or_default()
            .insert(target);
    }

    fn finish(
        self,
        source: &TransfectionLayout,
        design_racks: &BTreeMap<String, TransfectionLayout>,
    ) -> Result<WellAssociation> {
        if !self.unmatched.is_empty() {
            let details: Vec<String> = self
                .unmatched
                .iter()
                .map(|(rack, positions)| format!("design rack {rack} ({})", join_labels(positions)))
                .collect();
            return Err(Error::LayoutInconsistency(format!(
                "Could not find a matching ISO position for the following target positions: {}.",
                details.join(", ")
            )));
        }
        let mut design_rack_layouts = BTreeMap::new();
        for rack in design_racks.keys() {
            let mut layout = TransfectionLayout::new(source.shape());
            layout.floating_molecule_type = source.floating_molecule_type;
            layout.floating_stock_concentration = source.floating_stock_concentration;
            if let Some(bindings) = self.layouts.get(rack) {
                for (source_position, targets) in bindings {
                    let Some(position) = source.get(source_position) else {
                        continue;
                    };
                    let mut position = position.clone();
                    position.cell_plate_positions = targets.clone();
                    layout.add_position(position)?;
                }
            }
            design_rack_layouts.insert(rack.clone(), layout);
        }
        Ok(WellAssociation {
            design_rack_layouts,
            final_concentrations: self.final_concentrations,
        })
    }
}

impl<'a> WellAssociator<'a> {
    pub fn new(
        source: &'a mut TransfectionLayout,
        design_racks: &'a mut BTreeMap<String, TransfectionLayout>,
    ) -> Self {
        WellAssociator {
            source,
            design_racks,
        }
    }

    pub fn associate_optimisation(mut self) -> Result<WellAssociation> {
        self.broadcast_reagent_values()?;
        let source_has_finals = self.source.has_final_concentrations();

        let mut full_hashes: BTreeMap<String, RackPosition> = BTreeMap::new();
        let mut spares: BTreeMap<String, VecDeque<RackPosition>> = BTreeMap::new();
        for position in self.source.liquid_positions() {
            if source_has_finals {
                // First occurrence in (row, column) order wins.
                full_hashes
                    .entry(position.full_hash())
                    .or_insert(position.rack_position);
            } else {
                spares
                    .entry(position.partial_hash())
                    .or_default()
                    .push_back(position.rack_position);
            }
        }

        let mut collector = Collector::default();
        let mut assigned_finals: BTreeMap<RackPosition, Concentration<Nanomolar>> =
            BTreeMap::new();
        for (rack, layout) in self.design_racks.iter() {
            for target in layout.liquid_positions() {
                let full_hash = target.full_hash();
                if let Some(source) = full_hashes.get(&full_hash) {
                    collector.bind(rack, *source, target);
                    continue;
                }
                if source_has_finals {
                    collector.unmatched(rack, target.rack_position);
                    continue;
                }
                match spares
                    .get_mut(&target.partial_hash())
                    .and_then(VecDeque::pop_front)
                {
                    Some(source) => {
                        if let Some(concentration) = target.final_concentration() {
                            assigned_finals.insert(source, concentration);
                        }
                        full_hashes.insert(full_hash, source);
                        collector.bind(rack, source, target);
                    }
                    None => collector.unmatched(rack, target.rack_position),
                }
            }
        }

        for (rack_position, concentration) in assigned_finals {
            if let Some(position) = self.source.get_mut(&rack_position)? {
                position.final_concentration = FactorValue::Set(concentration);
            }
        }
        thelma_log::debug!(
            "Associated {} design racks with {} ISO positions.",
            self.design_racks.len(),
            full_hashes.len()
        );
        collector.finish(self.source, self.design_racks)
    }

    pub fn associate_manual(self) -> Result<WellAssociation> {
        let mut by_pool: BTreeMap<String, RackPosition> = BTreeMap::new();
        for position in self.source.iter().filter(|p| p.is_sample()) {
            by_pool
                .entry(position.pool.tag_value())
                .or_insert(position.rack_position);
        }

        let mut collector = Collector::default();
        for (rack, layout) in self.design_racks.iter() {
            for target in layout.iter().filter(|p| p.is_sample()) {
                match by_pool.get(&target.pool.tag_value()) {
                    Some(source) => collector.bind(rack, *source, target),
                    None => collector.unmatched(rack, target.rack_position),
                }
            }
        }
        collector.finish(self.source, self.design_racks)
    }

    /// Copy a unique reagent name or dilution factor of the ISO layout to
    /// design rack positions that omit it.
    fn broadcast_reagent_values(&mut self) -> Result<()> {
        let names = self.source.reagent_names();
        let name = match names.len() {
            1 => names.into_iter().next(),
            _ => None,
        };
        let dil_factor = match self.source.reagent_dil_factors().as_slice() {
            [df] => Some(*df),
            _ => None,
        };

        let mut mismatches: BTreeMap<String, BTreeSet<RackPosition>> = BTreeMap::new();
        for (rack, layout) in self.design_racks.iter_mut() {
            for position in layout.iter_mut()? {
                if !position.needs_liquid() {
                    continue;
                }
                if let Some(name) = &name {
                    match position.reagent_name().map(str::to_string) {
                        None => position.reagent_name = FactorValue::Set(name.clone()),
                        Some(actual) if actual != *name => {
                            mismatches
                                .entry(format!("reagent name of design rack {rack} (expected {name})"))
                                .or_default()
                                .insert(position.rack_position);
                        }
                        Some(_) => {}
                    }
                }
                if let Some(df) = dil_factor {
                    match position.reagent_dil_factor() {
                        None => position.reagent_dil_factor = FactorValue::Set(df),
                        Some(actual) if (actual - df).abs() > thelma_units::TOLERANCE => {
                            mismatches
                                .entry(format!(
                                    "reagent dilution factor of design rack {rack} (expected {})",
                                    format_number(df)
                                ))
                                .or_default()
                                .insert(position.rack_position);
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        if mismatches.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = mismatches
            .iter()
            .map(|(what, positions)| format!("{what}: {}", join_labels(positions)))
            .collect();
        Err(Error::LayoutInconsistency(format!(
            "The following design rack values do not match the ISO layout. {}.",
            details.join("; ")
        )))
    }
}
