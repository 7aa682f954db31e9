// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

mod biomek_transfer;
mod cell_suspension;
mod cybio_transfer;
mod optimem;
mod reagent;
mod series;

pub use biomek_transfer::biomek_transfer_worklist;
pub use cell_suspension::cell_suspension_worklist;
pub use cybio_transfer::cybio_transfer_worklist;
pub use optimem::optimem_worklist;
pub use reagent::{initial_reagent_dilution_factor, reagent_worklist};
pub use series::{GeneratedSeries, SeriesGenerator};

use std::fmt::{self, Display, Formatter};

use thelma_layouts::{TransfectionLayout, TransfectionPosition};
use thelma_racks::{RackPosition, join_labels};
use thelma_units::{Microliters, Volume};

use crate::settings::PlannerSettings;
use crate::{Error, Result};

/// Role of a worklist within an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorklistRole {
    Optimem,
    Reagent,
    BiomekTransfer,
    CybioTransfer,
    CellSuspension,
}

impl Display for WorklistRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorklistRole::Optimem => "optimem",
            WorklistRole::Reagent => "reagent",
            WorklistRole::BiomekTransfer => "biomek_transfer",
            WorklistRole::CybioTransfer => "cybio_transfer",
            WorklistRole::CellSuspension => "cellsuspension",
        };
        write!(f, "{name}")
    }
}

pub struct GeneratorContext<'a> {
    pub experiment_label: &'a str,
    pub settings: &'a PlannerSettings,
}

impl GeneratorContext<'_> {
    /// `<experiment>[-<design rack>]_<role>`
    pub fn label(&self, design_rack: Option<&str>, role: WorklistRole) -> String {
        match design_rack {
            Some(rack) => format!("{}-{rack}_{role}", self.experiment_label),
            None => format!("{}_{role}", self.experiment_label),
        }
    }
}

/// ISO volume of every liquid position of the layout.
///
/// Fails if the layout has no liquid positions or some lack an ISO volume.
fn iso_volumes<'a>(
    layout: &'a TransfectionLayout,
    label: &str,
) -> Result<Vec<(&'a TransfectionPosition, Volume<Microliters>)>> {
    let mut volumes = Vec::new();
    let mut missing: Vec<RackPosition> = Vec::new();
    for position in layout.liquid_positions() {
        match position.iso_volume() {
            Some(volume) => volumes.push((position, volume)),
            None => missing.push(position.rack_position),
        }
    }
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Unable to generate worklist {label}, the ISO volume is missing for the following \
             positions: {}.",
            join_labels(&missing)
        )));
    }
    if volumes.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Unable to generate worklist {label}, the layout has no positions to transfect."
        )));
    }
    Ok(volumes)
}

/// OptiMem dilution factor of a liquid position.
fn optimem_dil_factor(layout: &TransfectionLayout, position: &TransfectionPosition) -> Result<f64> {
    layout.optimem_dil_factor(position).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown OptiMem dilution factor for position {}.",
            position.rack_position
        ))
    })
}
