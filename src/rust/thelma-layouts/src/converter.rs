// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use thelma_racks::{RackPosition, join_labels};
use thelma_units::{Concentration, Nanomolar, microliters, nanomolar};

use crate::factor::{FactorValue, NOT_APPLICABLE_VALUE};
use crate::parameters::TransfectionParameter;
use crate::pool::{MoleculeType, PoolCatalog, PoolId, PoolValue};
use crate::rack_layout::RackLayout;
use crate::transfection::{TransfectionLayout, TransfectionPosition};
use crate::{Error, Result};

/// Turns a parsed rack layout into a [`TransfectionLayout`].
///
/// Tags are matched to transfection parameters by predicate or alias; tags
/// of other predicates (e.g. experimental factors) are ignored. All invalid
/// positions are collected and reported together.
pub struct TransfectionLayoutConverter<'a, C> {
    rack_layout: &'a RackLayout,
    catalog: &'a C,
    floating_molecule_type: Option<MoleculeType>,
    floating_stock_concentration: Option<Concentration<Nanomolar>>,
}

#[derive(Default)]
struct Problems(BTreeMap<String, BTreeSet<RackPosition>>);

impl Problems {
    fn record(&mut self, problem: impl Into<String>, position: RackPosition) {
        self.0.entry(problem.into()).or_default().insert(position);
    }

    fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|(problem, positions)| {
                format!(
                    "{problem} for the following positions: {}.",
                    join_labels(positions)
                )
            })
            .collect();
        Err(Error::InvalidInput(messages.join(" ")))
    }
}

fn parse_number<T>(
    value: Option<&String>,
    to_value: impl Fn(f64) -> T,
) -> std::result::Result<FactorValue<T>, ()> {
    let Some(value) = value else {
        return Ok(FactorValue::Unset);
    };
    let value = value.trim();
    if value.eq_ignore_ascii_case(NOT_APPLICABLE_VALUE) {
        return Ok(FactorValue::NotApplicable);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| FactorValue::Set(to_value(v)))
        .ok_or(())
}

impl<'a, C: PoolCatalog> TransfectionLayoutConverter<'a, C> {
    pub fn new(rack_layout: &'a RackLayout, catalog: &'a C) -> Self {
        TransfectionLayoutConverter {
            rack_layout,
            catalog,
            floating_molecule_type: None,
            floating_stock_concentration: None,
        }
    }

    /// Molecule type and stock concentration assumed for floating and
    /// library positions.
    pub fn with_floating_pools(
        mut self,
        molecule_type: MoleculeType,
        stock_concentration: Concentration<Nanomolar>,
    ) -> Self {
        self.floating_molecule_type = Some(molecule_type);
        self.floating_stock_concentration = Some(stock_concentration);
        self
    }

    pub fn convert(&self) -> Result<TransfectionLayout> {
        let mut layout = TransfectionLayout::new(self.rack_layout.shape());
        layout.floating_molecule_type = self.floating_molecule_type;
        layout.floating_stock_concentration = self.floating_stock_concentration;
        let mut problems = Problems::default();

        for (rack_position, tags) in self.rack_layout.tag_map() {
            let mut values: BTreeMap<TransfectionParameter, String> = BTreeMap::new();
            for tag in &tags {
                let Some(parameter) = TransfectionParameter::from_alias(&tag.predicate) else {
                    continue;
                };
                match values.get(&parameter) {
                    Some(existing) if existing != &tag.value => {
                        problems.record(format!("Multiple values for the {parameter}"), rack_position);
                    }
                    _ => {
                        values.insert(parameter, tag.value.clone());
                    }
                }
            }
            if values.is_empty() {
                continue;
            }
            if let Some(position) = self.convert_position(rack_position, &values, &mut problems) {
                layout.add_position(position)?;
            }
        }

        problems.into_result()?;
        thelma_log::debug!(
            "Converted rack layout into a transfection layout with {} positions.",
            layout.len()
        );
        Ok(layout)
    }

    fn convert_position(
        &self,
        rack_position: RackPosition,
        values: &BTreeMap<TransfectionParameter, String>,
        problems: &mut Problems,
    ) -> Option<TransfectionPosition> {
        let Some(pool_value) = values.get(&TransfectionParameter::MoleculeDesignPool) else {
            problems.record("Missing molecule design pool", rack_position);
            return None;
        };
        let pool = match PoolValue::parse(pool_value, self.catalog) {
            Some(PoolValue::Empty) => return None,
            Some(pool) => pool,
            None if pool_value.trim().parse::<PoolId>().is_ok() => {
                problems.record(
                    format!("Unknown molecule design pool {}", pool_value.trim()),
                    rack_position,
                );
                return None;
            }
            None => {
                problems.record("Invalid molecule design pool", rack_position);
                return None;
            }
        };

        let mut position = TransfectionPosition::new(rack_position, pool);
        let number = |parameter: TransfectionParameter| values.get(&parameter);
        let mut invalid = |parameter: TransfectionParameter| {
            problems.record(format!("Invalid {parameter}"), rack_position);
        };

        match parse_number(number(TransfectionParameter::IsoVolume), microliters) {
            Ok(value) => position.iso_volume = value,
            Err(()) => invalid(TransfectionParameter::IsoVolume),
        }
        match parse_number(number(TransfectionParameter::IsoConcentration), nanomolar) {
            Ok(value) => position.iso_concentration = value,
            Err(()) => invalid(TransfectionParameter::IsoConcentration),
        }
        match parse_number(number(TransfectionParameter::FinalConcentration), nanomolar) {
            Ok(value) => position.final_concentration = value,
            Err(()) => invalid(TransfectionParameter::FinalConcentration),
        }
        match parse_number(number(TransfectionParameter::ReagentDilutionFactor), |v| v) {
            Ok(value) => position.reagent_dil_factor = value,
            Err(()) => invalid(TransfectionParameter::ReagentDilutionFactor),
        }
        match parse_number(number(TransfectionParameter::OptimemDilutionFactor), |v| v) {
            Ok(value) => position.optimem_dil_factor = value,
            Err(()) => invalid(TransfectionParameter::OptimemDilutionFactor),
        }
        position.reagent_name = match number(TransfectionParameter::ReagentName) {
            None => FactorValue::Unset,
            Some(name) if name.trim().eq_ignore_ascii_case(NOT_APPLICABLE_VALUE) => {
                FactorValue::NotApplicable
            }
            Some(name) => FactorValue::Set(name.trim().to_string()),
        };

        for problem in position.invalid_values() {
            problems.record(format!("Invalid {problem}"), rack_position);
        }
        Some(position)
    }
}
