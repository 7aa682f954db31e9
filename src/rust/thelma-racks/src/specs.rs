// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Static tables for the liquid handling equipment.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thelma_units::{Microliters, Volume, microliters};

use crate::RackShape;
use crate::shape::{SHAPE_96, SHAPE_384};

/// Commonly used pipetting properties of a liquid handler.
#[derive(Debug, PartialEq)]
pub struct PipettingSpecs {
    pub name: &'static str,
    pub min_transfer_volume: Volume<Microliters>,
    pub max_transfer_volume: Option<Volume<Microliters>>,
    /// Largest dilution that can be done in a single transfer step.
    pub max_dilution_factor: f64,
    /// Whether the dead volume of a source well depends on the number of
    /// transfers taken from it.
    pub has_dynamic_dead_volume: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipettingSpecsKind {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "BioMek")]
    Biomek,
    #[serde(rename = "BioMekStock")]
    BiomekStock,
    #[serde(rename = "CyBio")]
    CyBio,
}

impl PipettingSpecsKind {
    pub fn specs(&self) -> &'static PipettingSpecs {
        match self {
            PipettingSpecsKind::Manual => &MANUAL_SPECS,
            PipettingSpecsKind::Biomek => &BIOMEK_SPECS,
            PipettingSpecsKind::BiomekStock => &BIOMEK_STOCK_SPECS,
            PipettingSpecsKind::CyBio => &CYBIO_SPECS,
        }
    }
}

impl Display for PipettingSpecsKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.specs().name)
    }
}

pub const MANUAL_SPECS: PipettingSpecs = PipettingSpecs {
    name: "manual",
    min_transfer_volume: microliters(1.0),
    max_transfer_volume: None,
    max_dilution_factor: 10.0,
    has_dynamic_dead_volume: false,
};

pub const BIOMEK_SPECS: PipettingSpecs = PipettingSpecs {
    name: "BioMek",
    min_transfer_volume: microliters(2.0),
    max_transfer_volume: Some(microliters(250.0)),
    max_dilution_factor: 10.0,
    has_dynamic_dead_volume: true,
};

pub const BIOMEK_STOCK_SPECS: PipettingSpecs = PipettingSpecs {
    name: "BioMekStock",
    min_transfer_volume: microliters(1.0),
    max_transfer_volume: Some(microliters(250.0)),
    max_dilution_factor: 10.0,
    has_dynamic_dead_volume: true,
};

pub const CYBIO_SPECS: PipettingSpecs = PipettingSpecs {
    name: "CyBio",
    min_transfer_volume: microliters(1.0),
    max_transfer_volume: Some(microliters(50.0)),
    max_dilution_factor: 10.0,
    has_dynamic_dead_volume: false,
};

/// Volume properties of a plate type used as ISO plate.
#[derive(Debug, PartialEq)]
pub struct ReservoirSpecs {
    pub name: &'static str,
    pub rack_shape: &'static RackShape,
    pub max_volume: Volume<Microliters>,
    pub min_dead_volume: Volume<Microliters>,
    pub max_dead_volume: Volume<Microliters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReservoirSpecsKind {
    #[serde(rename = "standard 96")]
    Standard96,
    #[serde(rename = "deep 96")]
    Deep96,
    #[serde(rename = "standard 384")]
    Standard384,
}

impl ReservoirSpecsKind {
    pub fn specs(&self) -> &'static ReservoirSpecs {
        match self {
            ReservoirSpecsKind::Standard96 => &STANDARD_96_SPECS,
            ReservoirSpecsKind::Deep96 => &DEEP_96_SPECS,
            ReservoirSpecsKind::Standard384 => &STANDARD_384_SPECS,
        }
    }
}

impl Display for ReservoirSpecsKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.specs().name)
    }
}

pub const STANDARD_96_SPECS: ReservoirSpecs = ReservoirSpecs {
    name: "standard 96",
    rack_shape: &SHAPE_96,
    max_volume: microliters(250.0),
    min_dead_volume: microliters(5.0),
    max_dead_volume: microliters(10.0),
};

pub const DEEP_96_SPECS: ReservoirSpecs = ReservoirSpecs {
    name: "deep 96",
    rack_shape: &SHAPE_96,
    max_volume: microliters(1000.0),
    min_dead_volume: microliters(30.0),
    max_dead_volume: microliters(40.0),
};

pub const STANDARD_384_SPECS: ReservoirSpecs = ReservoirSpecs {
    name: "standard 384",
    rack_shape: &SHAPE_384,
    max_volume: microliters(100.0),
    min_dead_volume: microliters(5.0),
    max_dead_volume: microliters(10.0),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_resolve_to_tables() {
        assert_eq!(
            PipettingSpecsKind::Biomek.specs().min_transfer_volume,
            microliters(2.0)
        );
        assert_eq!(PipettingSpecsKind::CyBio.to_string(), "CyBio");
        assert_eq!(
            ReservoirSpecsKind::Standard384.specs().rack_shape,
            RackShape::SHAPE_384
        );
        assert!(
            ReservoirSpecsKind::Deep96.specs().max_volume
                > ReservoirSpecsKind::Standard96.specs().max_volume
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PipettingSpecsKind::BiomekStock).unwrap();
        assert_eq!(json, "\"BioMekStock\"");
        let kind: ReservoirSpecsKind = serde_json::from_str("\"deep 96\"").unwrap();
        assert_eq!(kind, ReservoirSpecsKind::Deep96);
    }
}
