// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Constants of the transfection workflow.
use serde::Deserialize;
use thelma_units::{Microliters, Volume, microliters};

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Mastermix volume transferred into each cell plate well.
    pub transfer_volume: Volume<Microliters>,
    /// Cell suspension volume added to each cell plate well.
    pub cell_suspension_volume: Volume<Microliters>,
    /// Dilution of the OptiMem-diluted sample by the transfection reagent.
    pub reagent_mastermix_dilution_factor: f64,
    /// Usable fraction of a mastermix, the rest is dead volume.
    pub mastermix_dead_factor: f64,
    pub minimum_optimem_dilution_factor: f64,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        PlannerSettings {
            transfer_volume: microliters(5.0),
            cell_suspension_volume: microliters(30.0),
            reagent_mastermix_dilution_factor: 2.0,
            mastermix_dead_factor: 0.8,
            minimum_optimem_dilution_factor: 3.0,
        }
    }
}

impl PlannerSettings {
    /// Load settings from JSON. Missing fields keep their default.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("Invalid planner settings: {e}.")))
    }

    /// Dilution of the mastermix by the cell suspension.
    pub fn cell_dilution_factor(&self) -> f64 {
        (self.transfer_volume + self.cell_suspension_volume).value() / self.transfer_volume.value()
    }

    /// Dilution between ISO plate and cell plate for an OptiMem dilution
    /// factor.
    pub fn total_dilution_factor(&self, optimem_dil_factor: f64) -> f64 {
        optimem_dil_factor * self.reagent_mastermix_dilution_factor * self.cell_dilution_factor()
    }

    pub fn sanitize(&mut self) -> Result<Vec<SanitizationChange>> {
        let defaults = PlannerSettings::default();
        let mut changes = vec![];
        let volume_fields = [
            (
                "transfer_volume",
                &mut self.transfer_volume,
                defaults.transfer_volume,
            ),
            (
                "cell_suspension_volume",
                &mut self.cell_suspension_volume,
                defaults.cell_suspension_volume,
            ),
        ];
        for (field, value, default) in volume_fields {
            if !(value.value() > 0.0 && value.value().is_finite()) {
                changes.push(SanitizationChange {
                    field,
                    original: value.to_string(),
                    sanitized: default.to_string(),
                    reason: "Volumes must be positive.".to_string(),
                });
                *value = default;
            }
        }
        let factor_fields = [
            (
                "reagent_mastermix_dilution_factor",
                &mut self.reagent_mastermix_dilution_factor,
                defaults.reagent_mastermix_dilution_factor,
                "Dilution factors must be larger than 1.",
            ),
            (
                "minimum_optimem_dilution_factor",
                &mut self.minimum_optimem_dilution_factor,
                defaults.minimum_optimem_dilution_factor,
                "Dilution factors must be larger than 1.",
            ),
        ];
        for (field, value, default, reason) in factor_fields {
            if !(*value > 1.0 && value.is_finite()) {
                changes.push(SanitizationChange {
                    field,
                    original: value.to_string(),
                    sanitized: default.to_string(),
                    reason: reason.to_string(),
                });
                *value = default;
            }
        }
        if !(self.mastermix_dead_factor > 0.0 && self.mastermix_dead_factor <= 1.0) {
            changes.push(SanitizationChange {
                field: "mastermix_dead_factor",
                original: self.mastermix_dead_factor.to_string(),
                sanitized: defaults.mastermix_dead_factor.to_string(),
                reason: "Not within (0, 1].".to_string(),
            });
            self.mastermix_dead_factor = defaults.mastermix_dead_factor;
        }
        Ok(changes)
    }
}
