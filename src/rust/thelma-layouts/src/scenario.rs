// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thelma_racks::{PipettingSpecsKind, RackPosition, RackPositionSet, join_labels};

use crate::parameters::TransfectionParameter;
use crate::transfection::{TransfectionLayout, TransfectionPosition};
use crate::{Error, Result};

/// The experiment scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    OrderOnly,
    Manual,
    Optimisation,
    Screening,
    Library,
    IsoLess,
}

/// Static properties of a scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioTraits {
    pub name: &'static str,
    /// Parameters every sample position of the design layout must define.
    pub mandatory: &'static [TransfectionParameter],
    /// Parameters the design layout must not define at all.
    pub forbidden: &'static [TransfectionParameter],
    pub has_transfection_sheet: bool,
    pub pipetting_specs: PipettingSpecsKind,
    /// Robot support (mastermix) can be determined.
    pub supports_robot: bool,
}

const ORDER_ONLY_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "order only",
    mandatory: &[TransfectionParameter::MoleculeDesignPool],
    forbidden: &[TransfectionParameter::FinalConcentration],
    has_transfection_sheet: false,
    pipetting_specs: PipettingSpecsKind::Manual,
    supports_robot: false,
};

const MANUAL_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "manual optimisation",
    mandatory: &[
        TransfectionParameter::MoleculeDesignPool,
        TransfectionParameter::ReagentName,
        TransfectionParameter::ReagentDilutionFactor,
        TransfectionParameter::FinalConcentration,
    ],
    forbidden: &[],
    has_transfection_sheet: true,
    pipetting_specs: PipettingSpecsKind::Manual,
    supports_robot: false,
};

const OPTIMISATION_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "robot optimisation",
    mandatory: &[
        TransfectionParameter::MoleculeDesignPool,
        TransfectionParameter::FinalConcentration,
    ],
    forbidden: &[],
    has_transfection_sheet: true,
    pipetting_specs: PipettingSpecsKind::Biomek,
    supports_robot: true,
};

const SCREENING_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "screening",
    mandatory: &[],
    forbidden: &TransfectionParameter::FACTORS,
    has_transfection_sheet: false,
    pipetting_specs: PipettingSpecsKind::CyBio,
    supports_robot: true,
};

const LIBRARY_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "library screening",
    mandatory: &[],
    forbidden: &TransfectionParameter::FACTORS,
    has_transfection_sheet: false,
    pipetting_specs: PipettingSpecsKind::CyBio,
    supports_robot: true,
};

const ISO_LESS_TRAITS: ScenarioTraits = ScenarioTraits {
    name: "ISO-less screening",
    mandatory: &[],
    forbidden: &TransfectionParameter::FACTORS,
    has_transfection_sheet: false,
    pipetting_specs: PipettingSpecsKind::CyBio,
    supports_robot: false,
};

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::OrderOnly,
        Scenario::Manual,
        Scenario::Optimisation,
        Scenario::Screening,
        Scenario::Library,
        Scenario::IsoLess,
    ];

    pub fn traits(&self) -> &'static ScenarioTraits {
        match self {
            Scenario::OrderOnly => &ORDER_ONLY_TRAITS,
            Scenario::Manual => &MANUAL_TRAITS,
            Scenario::Optimisation => &OPTIMISATION_TRAITS,
            Scenario::Screening => &SCREENING_TRAITS,
            Scenario::Library => &LIBRARY_TRAITS,
            Scenario::IsoLess => &ISO_LESS_TRAITS,
        }
    }

    pub fn from_name(name: &str) -> Option<Scenario> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.traits().name.eq_ignore_ascii_case(name.trim()))
    }

    /// Check the design layout against the parameters the scenario requires
    /// and forbids.
    ///
    /// Mandatory parameters apply to sample positions only; mock positions
    /// may declare concentrations as not applicable.
    pub fn validate_design_layout(&self, layout: &TransfectionLayout) -> Result<()> {
        let traits = self.traits();
        let mut missing: BTreeMap<TransfectionParameter, RackPositionSet> = BTreeMap::new();
        let mut forbidden: BTreeMap<TransfectionParameter, RackPositionSet> = BTreeMap::new();

        for position in layout.iter() {
            for parameter in traits.forbidden {
                if !is_unset(position, *parameter) {
                    forbidden
                        .entry(*parameter)
                        .or_default()
                        .insert(position.rack_position);
                }
            }
            if !position.is_sample() {
                continue;
            }
            for parameter in traits.mandatory {
                if !is_set(position, *parameter) {
                    missing
                        .entry(*parameter)
                        .or_default()
                        .insert(position.rack_position);
                }
            }
        }

        let mut messages = Vec::new();
        if !missing.is_empty() {
            messages.push(format!(
                "The following parameters are missing for a {} scenario: {}.",
                traits.name,
                describe(&missing)
            ));
        }
        if !forbidden.is_empty() {
            messages.push(format!(
                "The following parameters must not be specified for a {} scenario: {}.",
                traits.name,
                describe(&forbidden)
            ));
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(Error::LayoutInconsistency(messages.join(" ")))
        }
    }
}

fn describe(problems: &BTreeMap<TransfectionParameter, RackPositionSet>) -> String {
    problems
        .iter()
        .map(|(parameter, positions)| {
            let positions: Vec<&RackPosition> = positions.iter().collect();
            format!("{parameter} ({})", join_labels(positions))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_set(position: &TransfectionPosition, parameter: TransfectionParameter) -> bool {
    match parameter {
        TransfectionParameter::MoleculeDesignPool => position.is_sample() || position.is_mock(),
        TransfectionParameter::IsoVolume => position.iso_volume.is_set(),
        TransfectionParameter::IsoConcentration => position.iso_concentration.is_set(),
        TransfectionParameter::FinalConcentration => position.final_concentration.is_set(),
        TransfectionParameter::ReagentName => position.reagent_name.is_set(),
        TransfectionParameter::ReagentDilutionFactor => position.reagent_dil_factor.is_set(),
        TransfectionParameter::OptimemDilutionFactor => position.optimem_dil_factor.is_set(),
    }
}

fn is_unset(position: &TransfectionPosition, parameter: TransfectionParameter) -> bool {
    match parameter {
        TransfectionParameter::MoleculeDesignPool => false,
        TransfectionParameter::IsoVolume => position.iso_volume.is_unset(),
        TransfectionParameter::IsoConcentration => position.iso_concentration.is_unset(),
        TransfectionParameter::FinalConcentration => position.final_concentration.is_unset(),
        TransfectionParameter::ReagentName => position.reagent_name.is_unset(),
        TransfectionParameter::ReagentDilutionFactor => position.reagent_dil_factor.is_unset(),
        TransfectionParameter::OptimemDilutionFactor => position.optimem_dil_factor.is_unset(),
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.traits().name)
    }
}
