// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use thelma_layouts::{WorkingLayout, WorkingPosition};
use thelma_racks::RackPosition;

use crate::translator::{RackSectorTranslator, TranslationBehaviour, sector_index};
use crate::{Error, Result, SectorIndex};

/// The positions of all sectors that share one position of the sector grid.
#[derive(Debug)]
pub struct Quadrant<'a, P> {
    /// Position in the sector grid (the 96-well grid for 384-well racks).
    pub anchor: RackPosition,
    /// Rack position of each sector, indexed by sector.
    pub rack_positions: Vec<RackPosition>,
    /// Working position of each sector, indexed by sector.
    pub positions: Vec<Option<&'a P>>,
}

impl<P> Quadrant<'_, P> {
    /// The rack position of sector 0, used to name the quadrant in messages.
    pub fn label_position(&self) -> RackPosition {
        self.rack_positions[0]
    }

    pub fn is_empty(&self) -> bool {
        self.positions.iter().all(Option::is_none)
    }

    /// Sector indices and working positions of the occupied sectors.
    pub fn occupied(&self) -> impl Iterator<Item = (SectorIndex, &P)> {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (i as SectorIndex, p)))
    }
}

/// Iterates over the quadrants of a layout in row-major anchor order.
///
/// Quadrants without any working position are skipped.
pub struct QuadrantIterator<'a, P> {
    layout: &'a WorkingLayout<P>,
    translators: Vec<RackSectorTranslator>,
    anchors: Box<dyn Iterator<Item = RackPosition>>,
}

impl<'a, P: WorkingPosition> QuadrantIterator<'a, P> {
    pub fn new(layout: &'a WorkingLayout<P>, number_sectors: u16) -> Result<Self> {
        let shape = layout.shape();
        let translators = (0..number_sectors)
            .map(|sector| {
                let behaviour = if number_sectors == 1 {
                    TranslationBehaviour::OneToOne
                } else {
                    TranslationBehaviour::ManyToOne
                };
                RackSectorTranslator::new(number_sectors, 0, sector, Some(behaviour))
            })
            .collect::<Result<Vec<_>>>()?;
        let side = (number_sectors as f64).sqrt().round() as u16;
        if shape.number_rows % side != 0 || shape.number_columns % side != 0 {
            return Err(Error::InvalidInput(format!(
                "Rack shape {shape} cannot be split into {number_sectors} sectors."
            )));
        }
        let rows = shape.number_rows / side;
        let columns = shape.number_columns / side;
        let anchors = (0..rows)
            .flat_map(move |row| (0..columns).map(move |column| RackPosition::from_indices(row, column)));
        Ok(QuadrantIterator {
            layout,
            translators,
            anchors: Box::new(anchors),
        })
    }
}

impl<'a, P: WorkingPosition> Iterator for QuadrantIterator<'a, P> {
    type Item = Quadrant<'a, P>;

    fn next(&mut self) -> Option<Self::Item> {
        for anchor in self.anchors.by_ref() {
            let rack_positions: Vec<RackPosition> = self
                .translators
                .iter()
                .filter_map(|translator| translator.translate(anchor).ok())
                .collect();
            let positions = rack_positions
                .iter()
                .map(|rack_position| self.layout.get(rack_position))
                .collect();
            let quadrant = Quadrant {
                anchor,
                rack_positions,
                positions,
            };
            if !quadrant.is_empty() {
                return Some(quadrant);
            }
        }
        None
    }
}

/// The working positions of each sector, in row-major order. Every sector
/// index is present, possibly with an empty list.
pub fn sort_into_sectors<P: WorkingPosition>(
    layout: &WorkingLayout<P>,
    number_sectors: u16,
) -> Result<BTreeMap<SectorIndex, Vec<&P>>> {
    let mut sectors: BTreeMap<SectorIndex, Vec<&P>> =
        (0..number_sectors).map(|i| (i, Vec::new())).collect();
    for position in layout.iter() {
        let index = sector_index(position.rack_position(), number_sectors)?;
        sectors.entry(index).or_default().push(position);
    }
    Ok(sectors)
}
