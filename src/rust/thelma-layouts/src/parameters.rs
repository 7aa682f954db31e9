// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

/// Domain of the tags that carry transfection parameters.
pub const TRANSFECTION_DOMAIN: &str = "transfection";

/// The transfection parameters recognised in authored layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransfectionParameter {
    MoleculeDesignPool,
    IsoVolume,
    IsoConcentration,
    FinalConcentration,
    ReagentName,
    ReagentDilutionFactor,
    OptimemDilutionFactor,
}

impl TransfectionParameter {
    pub const ALL: [TransfectionParameter; 7] = [
        TransfectionParameter::MoleculeDesignPool,
        TransfectionParameter::IsoVolume,
        TransfectionParameter::IsoConcentration,
        TransfectionParameter::FinalConcentration,
        TransfectionParameter::ReagentName,
        TransfectionParameter::ReagentDilutionFactor,
        TransfectionParameter::OptimemDilutionFactor,
    ];

    /// The four factors a design sheet may define.
    pub const FACTORS: [TransfectionParameter; 4] = [
        TransfectionParameter::MoleculeDesignPool,
        TransfectionParameter::ReagentName,
        TransfectionParameter::ReagentDilutionFactor,
        TransfectionParameter::FinalConcentration,
    ];

    pub fn predicate(&self) -> &'static str {
        match self {
            TransfectionParameter::MoleculeDesignPool => "molecule_design_pool",
            TransfectionParameter::IsoVolume => "iso_volume",
            TransfectionParameter::IsoConcentration => "iso_concentration",
            TransfectionParameter::FinalConcentration => "final_concentration",
            TransfectionParameter::ReagentName => "reagent_name",
            TransfectionParameter::ReagentDilutionFactor => "reagent_dil_factor",
            TransfectionParameter::OptimemDilutionFactor => "optimem_dil_factor",
        }
    }

    /// Alternative spellings accepted in authored sheets.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            TransfectionParameter::MoleculeDesignPool => &[
                "molecule design pool id",
                "molecule design pool",
                "molecule design set id",
                "pool id",
                "md pool",
            ],
            TransfectionParameter::IsoVolume => &["iso volume", "volume"],
            TransfectionParameter::IsoConcentration => &["iso concentration", "iso conc"],
            TransfectionParameter::FinalConcentration => &[
                "final concentration",
                "final conc",
                "concentration in cell plate",
            ],
            TransfectionParameter::ReagentName => &[
                "reagent name",
                "transfection reagent",
                "reagent",
            ],
            TransfectionParameter::ReagentDilutionFactor => &[
                "reagent dilution factor",
                "reagent dil factor",
                "final dilution factor",
            ],
            TransfectionParameter::OptimemDilutionFactor => &[
                "optimem dilution factor",
                "optimem dil factor",
            ],
        }
    }

    /// Resolve a predicate or one of its aliases (case-insensitive).
    pub fn from_alias(name: &str) -> Option<TransfectionParameter> {
        let name = name.trim().to_lowercase();
        let normalised = name.replace('_', " ");
        TransfectionParameter::ALL.into_iter().find(|parameter| {
            parameter.predicate() == name
                || parameter.predicate().replace('_', " ") == normalised
                || parameter.aliases().contains(&normalised.as_str())
        })
    }
}

impl Display for TransfectionParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate().replace('_', " "))
    }
}
