// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use thelma_layouts::TransfectionLayout;
use thelma_racks::RackShape;
use thelma_units::{Concentration, Nanomolar};

use crate::associator::{
    ConcentrationKind, RackSectorAssociator, SectorAssociation, SectorConcentrations,
};
use crate::value_determiner::SectorValueDeterminer;
use crate::{Result, SectorIndex};

/// Sector groups, sector concentrations and the dilution hierarchy of a
/// layout.
///
/// Within a group sectors are sorted by concentration, highest first (ties
/// go to the lower sector index). The parent of a sector is its predecessor
/// in that order, i.e. the sector it is diluted from in a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationData {
    number_sectors: u16,
    associated_sectors: Vec<BTreeSet<SectorIndex>>,
    sector_concentrations: SectorConcentrations,
    parent_sectors: BTreeMap<SectorIndex, Option<SectorIndex>>,
}

impl AssociationData {
    /// Associate the sectors of a layout. 96-well layouts consist of a single
    /// sector.
    pub fn new(layout: &TransfectionLayout, concentration: ConcentrationKind) -> Result<Self> {
        if layout.shape().size() <= RackShape::SHAPE_96.size() {
            let sector_concentration = SectorValueDeterminer::new(&**layout, 1)
                .determine(&concentration)?
                .get(&0)
                .copied()
                .flatten();
            return Ok(AssociationData::from_association(
                1,
                SectorAssociation {
                    groups: vec![BTreeSet::from([0])],
                    concentrations: BTreeMap::from([(0, sector_concentration)]),
                },
            ));
        }
        let association = RackSectorAssociator::new(layout, 4, concentration).associate()?;
        Ok(AssociationData::from_association(4, association))
    }

    pub fn from_association(number_sectors: u16, association: SectorAssociation) -> Self {
        let mut parent_sectors = BTreeMap::new();
        for group in &association.groups {
            let mut sorted: Vec<SectorIndex> = group.iter().copied().collect();
            let value = |sector: &SectorIndex| {
                association
                    .concentrations
                    .get(sector)
                    .copied()
                    .flatten()
                    .map(|c| c.value())
                    .unwrap_or(0.0)
            };
            sorted.sort_by(|a, b| value(b).total_cmp(&value(a)).then(a.cmp(b)));
            let mut parent = None;
            for sector in sorted {
                parent_sectors.insert(sector, parent);
                parent = Some(sector);
            }
        }
        AssociationData {
            number_sectors,
            associated_sectors: association.groups,
            sector_concentrations: association.concentrations,
            parent_sectors,
        }
    }

    pub fn number_sectors(&self) -> u16 {
        self.number_sectors
    }

    pub fn associated_sectors(&self) -> &[BTreeSet<SectorIndex>] {
        &self.associated_sectors
    }

    pub fn sector_concentrations(&self) -> &SectorConcentrations {
        &self.sector_concentrations
    }

    pub fn sector_concentration(&self, sector: SectorIndex) -> Option<Concentration<Nanomolar>> {
        self.sector_concentrations.get(&sector).copied().flatten()
    }

    pub fn parent_sector(&self, sector: SectorIndex) -> Option<SectorIndex> {
        self.parent_sectors.get(&sector).copied().flatten()
    }

    /// Sectors that take part in any group.
    pub fn occupied_sectors(&self) -> impl Iterator<Item = SectorIndex> + '_ {
        self.associated_sectors.iter().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use thelma_layouts::{MoleculeDesignPool, MoleculeType, PoolValue, TransfectionPosition};
    use thelma_racks::RackPosition;
    use thelma_units::nanomolar;

    fn sample(label: &str, id: u64, concentration: f64) -> TransfectionPosition {
        TransfectionPosition::new(
            RackPosition::from_label(label).unwrap(),
            PoolValue::Fixed(MoleculeDesignPool {
                id,
                molecule_type: MoleculeType::Sirna,
                stock_concentration: nanomolar(50000.0),
            }),
        )
        .with_final_concentration(nanomolar(concentration))
    }

    #[test]
    fn test_parent_sectors_of_screening_layout() {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_384);
        for position in [
            sample("A1", 205200, 10.0),
            sample("B1", 205200, 10.0),
            sample("A2", 205201, 20.0),
            sample("B2", 205201, 20.0),
        ] {
            layout.add_position(position).unwrap();
        }
        let data = AssociationData::new(&layout, ConcentrationKind::Final).unwrap();
        assert_eq!(data.number_sectors(), 4);
        assert_eq!(
            data.associated_sectors(),
            &[BTreeSet::from([0, 2]), BTreeSet::from([1, 3])]
        );
        assert_eq!(data.parent_sector(0), None);
        assert_eq!(data.parent_sector(2), Some(0));
        assert_eq!(data.parent_sector(1), None);
        assert_eq!(data.parent_sector(3), Some(1));
        assert_eq!(data.sector_concentration(3), Some(nanomolar(20.0)));
    }

    #[test]
    fn test_cascade_follows_concentrations() {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_384);
        for position in [
            sample("A1", 1, 10.0),
            sample("A2", 1, 40.0),
            sample("B1", 1, 20.0),
            sample("B2", 1, 30.0),
        ] {
            layout.add_position(position).unwrap();
        }
        let data = AssociationData::new(&layout, ConcentrationKind::Final).unwrap();
        assert_eq!(data.parent_sector(1), None);
        assert_eq!(data.parent_sector(3), Some(1));
        assert_eq!(data.parent_sector(2), Some(3));
        assert_eq!(data.parent_sector(0), Some(2));
    }

    #[test]
    fn test_96_well_layout_is_a_single_sector() {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout.add_position(sample("B2", 1, 10.0)).unwrap();
        layout.add_position(sample("B3", 2, 10.0)).unwrap();
        let data = AssociationData::new(&layout, ConcentrationKind::Final).unwrap();
        assert_eq!(data.associated_sectors(), &[BTreeSet::from([0])]);
        assert_eq!(data.parent_sector(0), None);
        assert_eq!(data.sector_concentration(0), Some(nanomolar(10.0)));
        assert_eq!(data.occupied_sectors().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_96_well_layout_with_mixed_concentrations_fails() {
        let mut layout = TransfectionLayout::new(RackShape::SHAPE_96);
        layout.add_position(sample("B2", 1, 10.0)).unwrap();
        layout.add_position(sample("B3", 1, 20.0)).unwrap();
        let err = AssociationData::new(&layout, ConcentrationKind::Final).unwrap_err();
        assert!(matches!(err, Error::Association(_)));
    }
}
