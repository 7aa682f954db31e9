// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use thelma_layouts::{TransfectionLayout, TransfectionPosition};
use thelma_racks::{RackPosition, join_labels};
use thelma_units::{Concentration, Nanomolar, TOLERANCE};

use crate::quadrant::QuadrantIterator;
use crate::value_determiner::{SectorAttribute, SectorValueDeterminer};
use crate::{Error, Result, SectorIndex};

/// The concentration that has to be uniform within a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcentrationKind {
    Iso,
    Final,
}

impl SectorAttribute<TransfectionPosition> for ConcentrationKind {
    type Value = Concentration<Nanomolar>;

    fn name(&self) -> &str {
        match self {
            ConcentrationKind::Iso => "ISO concentration",
            ConcentrationKind::Final => "final concentration",
        }
    }

    fn value(&self, position: &TransfectionPosition) -> Option<Self::Value> {
        match self {
            ConcentrationKind::Iso => position.iso_concentration(),
            ConcentrationKind::Final => position.final_concentration(),
        }
    }

    fn ignore(&self, position: &TransfectionPosition) -> bool {
        !position.is_sample()
    }
}

pub type SectorConcentrations = BTreeMap<SectorIndex, Option<Concentration<Nanomolar>>>;

/// Result of a successful sector association.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorAssociation {
    /// Pairwise disjoint groups of sectors, ordered by their lowest sector.
    pub groups: Vec<BTreeSet<SectorIndex>>,
    pub concentrations: SectorConcentrations,
}

/// Finds the sectors of a layout that share molecule design pools and must
/// therefore be transferred together.
pub struct RackSectorAssociator<'a> {
    layout: &'a TransfectionLayout,
    number_sectors: u16,
    concentration: ConcentrationKind,
}

/// Concentrations of a group relative to the highest one, descending.
fn dilution_profile(
    group: &BTreeSet<SectorIndex>,
    concentrations: &SectorConcentrations,
) -> Vec<Option<f64>> {
    let mut values: Vec<Option<f64>> = group
        .iter()
        .map(|sector| concentrations.get(sector).copied().flatten().map(|c| c.value()))
        .collect();
    values.sort_by(|a, b| match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let max = values.iter().flatten().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return values;
    }
    values.into_iter().map(|v| v.map(|v| v / max)).collect()
}

fn same_profile(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|pair| match pair {
            (Some(a), Some(b)) => (a - b).abs() <= TOLERANCE,
            (None, None) => true,
            _ => false,
        })
}

impl<'a> RackSectorAssociator<'a> {
    pub fn new(
        layout: &'a TransfectionLayout,
        number_sectors: u16,
        concentration: ConcentrationKind,
    ) -> Self {
        RackSectorAssociator {
            layout,
            number_sectors,
            concentration,
        }
    }

    pub fn sector_concentrations(&self) -> Result<SectorConcentrations> {
        SectorValueDeterminer::new(&**self.layout, self.number_sectors).determine(&self.concentration)
    }

    pub fn associate(&self) -> Result<SectorAssociation> {
        let concentrations = self.sector_concentrations()?;

        // Sector set of a pool within a quadrant, mapped to the quadrants it
        // was found in.
        let mut candidates: BTreeMap<BTreeSet<SectorIndex>, BTreeSet<RackPosition>> =
            BTreeMap::new();
        for quadrant in QuadrantIterator::new(&**self.layout, self.number_sectors)? {
            let mut pools: BTreeMap<String, BTreeSet<SectorIndex>> = BTreeMap::new();
            for (sector, position) in quadrant.occupied() {
                if position.is_sample() {
                    pools
                        .entry(position.pool.tag_value())
                        .or_default()
                        .insert(sector);
                }
            }
            for sectors in pools.into_values() {
                candidates
                    .entry(sectors)
                    .or_default()
                    .insert(quadrant.label_position());
            }
        }
        if candidates.is_empty() {
            return Err(Error::Association(
                "There are no sample positions in the layout.".to_string(),
            ));
        }

        let sets: Vec<&BTreeSet<SectorIndex>> = candidates.keys().collect();
        let mut inconsistent: BTreeSet<RackPosition> = BTreeSet::new();
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                if !a.is_disjoint(b) && !a.is_subset(b) && !b.is_subset(a) {
                    inconsistent.extend(&candidates[*a]);
                    inconsistent.extend(&candidates[*b]);
                }
            }
        }
        if !inconsistent.is_empty() {
            return Err(Error::Association(format!(
                "Unable to associate the rack sectors, the following quadrants have \
                 inconsistent pools: {}.",
                join_labels(&inconsistent)
            )));
        }

        let groups: Vec<BTreeSet<SectorIndex>> = sets
            .iter()
            .filter(|a| !sets.iter().any(|b| a != &b && a.is_subset(b)))
            .map(|a| (*a).clone())
            .collect();
        let quadrants_of = |group: &BTreeSet<SectorIndex>| -> BTreeSet<RackPosition> {
            candidates
                .iter()
                .filter(|(sectors, _)| sectors.is_subset(group))
                .flat_map(|(_, quadrants)| quadrants.iter().copied())
                .collect()
        };

        let reference_length = reference_length(&groups);
        let deviating: BTreeSet<RackPosition> = groups
            .iter()
            .filter(|group| group.len() != reference_length)
            .flat_map(&quadrants_of)
            .collect();
        if !deviating.is_empty() {
            return Err(Error::Association(format!(
                "Unable to associate the rack sectors, the associated sector groups have \
                 different lengths. Please check the quadrants at the following positions: {}.",
                join_labels(&deviating)
            )));
        }

        let profiles: Vec<Vec<Option<f64>>> = groups
            .iter()
            .map(|group| dilution_profile(group, &concentrations))
            .collect();
        if profiles.iter().any(|p| !same_profile(p, &profiles[0])) {
            let quadrants: BTreeSet<RackPosition> = groups.iter().flat_map(&quadrants_of).collect();
            return Err(Error::Association(format!(
                "Unable to associate the rack sectors, the associated sector groups have \
                 different concentration combinations. Please check the quadrants at the \
                 following positions: {}.",
                join_labels(&quadrants)
            )));
        }

        let mut groups = groups;
        groups.sort_by_key(|group| group.iter().next().copied());
        thelma_log::diagnostic!("Associated rack sectors: {:?}.", groups);
        Ok(SectorAssociation {
            groups,
            concentrations,
        })
    }
}

/// The most common group length, the larger one on ties.
fn reference_length(groups: &[BTreeSet<SectorIndex>]) -> usize {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for group in groups {
        *counts.entry(group.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(length, count)| (*count, *length))
        .map(|(length, _)| length)
        .unwrap_or_default()
}
