// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use thelma_racks::{RackPosition, RackShape};
use thelma_units::{Concentration, Microliters, Nanomolar, Volume, format_number};

use crate::factor::{FactorValue, NOT_APPLICABLE_VALUE};
use crate::parameters::{TRANSFECTION_DOMAIN, TransfectionParameter};
use crate::pool::{MoleculeType, PoolValue, PositionType};
use crate::tag::Tag;
use crate::working_layout::{Frozen, WorkingLayout, WorkingPosition};

/// Used for mock positions and floating positions of unknown molecule type.
const FALLBACK_OPTIMEM_DILUTION_FACTOR: f64 = 4.0;

/// A well of an ISO plate or design rack together with its transfection
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransfectionPosition {
    pub rack_position: RackPosition,
    pub pool: PoolValue,
    pub iso_volume: FactorValue<Volume<Microliters>>,
    pub iso_concentration: FactorValue<Concentration<Nanomolar>>,
    pub final_concentration: FactorValue<Concentration<Nanomolar>>,
    pub reagent_name: FactorValue<String>,
    pub reagent_dil_factor: FactorValue<f64>,
    pub optimem_dil_factor: FactorValue<f64>,
    /// Cell plate wells supplied by this position. Only set on source
    /// positions after well association.
    pub cell_plate_positions: BTreeSet<RackPosition>,
}

impl TransfectionPosition {
    pub fn new(rack_position: RackPosition, pool: PoolValue) -> Self {
        TransfectionPosition {
            rack_position,
            pool,
            iso_volume: FactorValue::Unset,
            iso_concentration: FactorValue::Unset,
            final_concentration: FactorValue::Unset,
            reagent_name: FactorValue::Unset,
            reagent_dil_factor: FactorValue::Unset,
            optimem_dil_factor: FactorValue::Unset,
            cell_plate_positions: BTreeSet::new(),
        }
    }

    pub fn with_iso_volume(mut self, volume: Volume<Microliters>) -> Self {
        self.iso_volume = FactorValue::Set(volume);
        self
    }

    pub fn with_iso_concentration(mut self, concentration: Concentration<Nanomolar>) -> Self {
        self.iso_concentration = FactorValue::Set(concentration);
        self
    }

    pub fn with_final_concentration(mut self, concentration: Concentration<Nanomolar>) -> Self {
        self.final_concentration = FactorValue::Set(concentration);
        self
    }

    pub fn with_reagent(mut self, name: impl Into<String>, dilution_factor: f64) -> Self {
        self.reagent_name = FactorValue::Set(name.into());
        self.reagent_dil_factor = FactorValue::Set(dilution_factor);
        self
    }

    pub fn with_optimem_dil_factor(mut self, dilution_factor: f64) -> Self {
        self.optimem_dil_factor = FactorValue::Set(dilution_factor);
        self
    }

    pub fn position_type(&self) -> PositionType {
        self.pool.position_type()
    }

    pub fn is_mock(&self) -> bool {
        self.pool == PoolValue::Mock
    }

    pub fn is_untreated(&self) -> bool {
        self.pool == PoolValue::Untreated
    }

    pub fn is_sample(&self) -> bool {
        self.pool.is_sample()
    }

    /// True for positions that take part in liquid transfers, i.e. samples
    /// and mocks.
    pub fn needs_liquid(&self) -> bool {
        self.is_sample() || self.is_mock()
    }

    pub fn iso_volume(&self) -> Option<Volume<Microliters>> {
        self.iso_volume.get()
    }

    pub fn iso_concentration(&self) -> Option<Concentration<Nanomolar>> {
        self.iso_concentration.get()
    }

    pub fn final_concentration(&self) -> Option<Concentration<Nanomolar>> {
        self.final_concentration.get()
    }

    pub fn reagent_name(&self) -> Option<&str> {
        self.reagent_name.value().map(String::as_str)
    }

    pub fn reagent_dil_factor(&self) -> Option<f64> {
        self.reagent_dil_factor.get()
    }

    /// Key of pool, reagent name and reagent dilution factor.
    pub fn partial_hash(&self) -> String {
        format!(
            "{};{};{}",
            self.pool.tag_value(),
            self.reagent_name().unwrap_or(NOT_APPLICABLE_VALUE),
            self.reagent_dil_factor()
                .map(format_number)
                .unwrap_or_else(|| NOT_APPLICABLE_VALUE.to_string())
        )
    }

    /// The partial hash extended by the final concentration.
    pub fn full_hash(&self) -> String {
        format!(
            "{};{}",
            self.partial_hash(),
            self.final_concentration()
                .map(|c| format_number(c.value()))
                .unwrap_or_else(|| NOT_APPLICABLE_VALUE.to_string())
        )
    }

    /// Describe every parameter value that violates its constraints.
    pub fn invalid_values(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if self.iso_volume().is_some_and(|v| v.value() <= 0.0) {
            problems.push("ISO volume");
        }
        if self.iso_concentration().is_some_and(|c| c.value() <= 0.0) {
            problems.push("ISO concentration");
        }
        if self.final_concentration().is_some_and(|c| c.value() <= 0.0) {
            problems.push("final concentration");
        }
        if self.reagent_name().is_some_and(|name| name.trim().len() < 2) {
            problems.push("reagent name");
        }
        if self.reagent_dil_factor().is_some_and(|df| df <= 1.0) {
            problems.push("reagent dilution factor");
        }
        if self.optimem_dil_factor.get().is_some_and(|df| df <= 0.0) {
            problems.push("OptiMem dilution factor");
        }
        if (self.is_mock() || self.is_untreated())
            && (self.iso_concentration.is_set() || self.final_concentration.is_set())
        {
            problems.push("concentration for mock or untreated position");
        }
        problems
    }

    fn parameter_tag(parameter: TransfectionParameter, value: String) -> Tag {
        Tag::new(TRANSFECTION_DOMAIN, parameter.predicate(), value)
    }
}

fn push_factor_tag<T>(
    tags: &mut BTreeSet<Tag>,
    parameter: TransfectionParameter,
    value: &FactorValue<T>,
    render: impl Fn(&T) -> String,
) {
    match value {
        FactorValue::Unset => {}
        FactorValue::NotApplicable => {
            tags.insert(TransfectionPosition::parameter_tag(
                parameter,
                NOT_APPLICABLE_VALUE.to_string(),
            ));
        }
        FactorValue::Set(value) => {
            tags.insert(TransfectionPosition::parameter_tag(parameter, render(value)));
        }
    }
}

impl WorkingPosition for TransfectionPosition {
    fn rack_position(&self) -> RackPosition {
        self.rack_position
    }

    fn tags(&self) -> BTreeSet<Tag> {
        let mut tags = BTreeSet::new();
        if self.pool != PoolValue::Empty {
            tags.insert(Self::parameter_tag(
                TransfectionParameter::MoleculeDesignPool,
                self.pool.tag_value(),
            ));
        }
        push_factor_tag(
            &mut tags,
            TransfectionParameter::IsoVolume,
            &self.iso_volume,
            |v| format_number(v.value()),
        );
        push_factor_tag(
            &mut tags,
            TransfectionParameter::IsoConcentration,
            &self.iso_concentration,
            |c| format_number(c.value()),
        );
        push_factor_tag(
            &mut tags,
            TransfectionParameter::FinalConcentration,
            &self.final_concentration,
            |c| format_number(c.value()),
        );
        push_factor_tag(
            &mut tags,
            TransfectionParameter::ReagentName,
            &self.reagent_name,
            |name| name.clone(),
        );
        push_factor_tag(
            &mut tags,
            TransfectionParameter::ReagentDilutionFactor,
            &self.reagent_dil_factor,
            |df| format_number(*df),
        );
        push_factor_tag(
            &mut tags,
            TransfectionParameter::OptimemDilutionFactor,
            &self.optimem_dil_factor,
            |df| format_number(*df),
        );
        tags
    }

    fn is_empty(&self) -> bool {
        self.pool == PoolValue::Empty
    }
}

/// A working layout of transfection positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TransfectionLayout {
    layout: WorkingLayout<TransfectionPosition>,
    pub floating_molecule_type: Option<MoleculeType>,
    pub floating_stock_concentration: Option<Concentration<Nanomolar>>,
}

impl TransfectionLayout {
    pub fn new(shape: &'static RackShape) -> Self {
        TransfectionLayout {
            layout: WorkingLayout::new(shape),
            floating_molecule_type: None,
            floating_stock_concentration: None,
        }
    }

    /// Close the layout and hand out a read-only view.
    pub fn freeze(mut self) -> Frozen<TransfectionLayout> {
        self.layout.close();
        Frozen::new(self)
    }

    /// Positions that take part in liquid transfers (samples and mocks).
    pub fn liquid_positions(&self) -> impl Iterator<Item = &TransfectionPosition> {
        self.layout.iter().filter(|p| p.needs_liquid())
    }

    pub fn has_iso_volumes(&self) -> bool {
        self.layout.iter().any(|p| p.iso_volume.is_set())
    }

    pub fn has_iso_concentrations(&self) -> bool {
        self.layout.iter().any(|p| p.iso_concentration.is_set())
    }

    pub fn has_final_concentrations(&self) -> bool {
        self.layout.iter().any(|p| p.final_concentration.is_set())
    }

    pub fn reagent_names(&self) -> BTreeSet<String> {
        self.layout
            .iter()
            .filter_map(|p| p.reagent_name().map(str::to_string))
            .collect()
    }

    /// Distinct reagent dilution factors in ascending order.
    pub fn reagent_dil_factors(&self) -> Vec<f64> {
        distinct_values(self.layout.iter().filter_map(|p| p.reagent_dil_factor()))
    }

    /// Distinct OptiMem dilution factors of the liquid positions.
    pub fn optimem_dil_factors(&self) -> Vec<f64> {
        distinct_values(
            self.liquid_positions()
                .filter_map(|p| self.optimem_dil_factor(p)),
        )
    }

    /// OptiMem dilution factor of a position: the explicit value or the
    /// default of the molecule type. Mock positions take the factor of the
    /// samples if all samples agree.
    pub fn optimem_dil_factor(&self, position: &TransfectionPosition) -> Option<f64> {
        if let Some(df) = position.optimem_dil_factor.get() {
            return Some(df);
        }
        match &position.pool {
            PoolValue::Fixed(pool) => Some(pool.molecule_type.default_optimem_dilution_factor()),
            PoolValue::Floating(_) | PoolValue::Library => Some(
                self.floating_molecule_type
                    .map(|t| t.default_optimem_dilution_factor())
                    .unwrap_or(FALLBACK_OPTIMEM_DILUTION_FACTOR),
            ),
            PoolValue::Mock => {
                let sample_factors = distinct_values(
                    self.layout
                        .iter()
                        .filter(|p| p.is_sample())
                        .filter_map(|p| self.optimem_dil_factor(p)),
                );
                match sample_factors.as_slice() {
                    [df] => Some(*df),
                    _ => Some(FALLBACK_OPTIMEM_DILUTION_FACTOR),
                }
            }
            PoolValue::Untreated | PoolValue::Empty => None,
        }
    }

    /// Stock concentration of the pool of a position, if known.
    pub fn stock_concentration(
        &self,
        position: &TransfectionPosition,
    ) -> Option<Concentration<Nanomolar>> {
        match &position.pool {
            PoolValue::Fixed(pool) => Some(pool.stock_concentration),
            PoolValue::Floating(_) | PoolValue::Library => self.floating_stock_concentration,
            _ => None,
        }
    }
}

/// Sorted values with duplicates (within tolerance) removed.
pub fn distinct_values(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= thelma_units::TOLERANCE);
    values
}

impl Deref for TransfectionLayout {
    type Target = WorkingLayout<TransfectionPosition>;

    fn deref(&self) -> &Self::Target {
        &self.layout
    }
}

impl DerefMut for TransfectionLayout {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.layout
    }
}
