// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use thelma_racks::{PositionOrder, RackPosition, RackShape};

use crate::{Error, Result, SectorIndex};

/// How positions of the source and the target rack relate.
///
/// `ManyToOne` places a position of the small (sector) grid into a sector of
/// the large rack, `OneToMany` does the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationBehaviour {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// A position is not part of the sector it was translated from.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Position {position} does not belong to sector {sector_index} ({number_sectors} sectors).")]
pub struct TranslationError {
    pub position: RackPosition,
    pub sector_index: SectorIndex,
    pub number_sectors: u16,
}

/// Rows and columns of a sector grid with `number_sectors` cells.
fn grid_dimensions(number_sectors: u16) -> Result<(u16, u16)> {
    let side = (number_sectors as f64).sqrt().round() as u16;
    if number_sectors == 0 || u32::from(side) * u32::from(side) != u32::from(number_sectors) {
        return Err(Error::InvalidInput(format!(
            "The number of sectors must be a square number, got {number_sectors}."
        )));
    }
    Ok((side, side))
}

/// Translates rack positions between the sectors of interleaved racks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RackSectorTranslator {
    number_sectors: u16,
    source_sector_index: SectorIndex,
    target_sector_index: SectorIndex,
    row_count: u16,
    column_count: u16,
    behaviour: TranslationBehaviour,
}

impl RackSectorTranslator {
    /// Create a translator. Without explicit behaviour it is inferred from
    /// the sector indices.
    pub fn new(
        number_sectors: u16,
        source_sector_index: SectorIndex,
        target_sector_index: SectorIndex,
        behaviour: Option<TranslationBehaviour>,
    ) -> Result<Self> {
        Self::with_dimensions(
            number_sectors,
            source_sector_index,
            target_sector_index,
            behaviour,
            None,
            None,
        )
    }

    /// Create a translator for a sector grid that is not square. A missing
    /// dimension is derived from the other one, with both missing the grid
    /// is square.
    pub fn with_dimensions(
        number_sectors: u16,
        source_sector_index: SectorIndex,
        target_sector_index: SectorIndex,
        behaviour: Option<TranslationBehaviour>,
        row_count: Option<u16>,
        column_count: Option<u16>,
    ) -> Result<Self> {
        let (row_count, column_count) = match (row_count, column_count) {
            (None, None) => grid_dimensions(number_sectors)?,
            (Some(rows), None) if rows > 0 => (rows, number_sectors / rows),
            (None, Some(columns)) if columns > 0 => (number_sectors / columns, columns),
            (rows, columns) => (rows.unwrap_or(0), columns.unwrap_or(0)),
        };
        if row_count == 0
            || column_count == 0
            || u32::from(row_count) * u32::from(column_count) != u32::from(number_sectors)
        {
            return Err(Error::InvalidInput(format!(
                "A grid of {row_count} x {column_count} does not have {number_sectors} sectors."
            )));
        }
        for index in [source_sector_index, target_sector_index] {
            if index >= number_sectors {
                return Err(Error::InvalidInput(format!(
                    "Sector index {index} is out of range for {number_sectors} sectors."
                )));
            }
        }
        let behaviour = behaviour.unwrap_or_else(|| {
            if number_sectors == 1 {
                TranslationBehaviour::OneToOne
            } else if source_sector_index == 0 && target_sector_index == 0 {
                TranslationBehaviour::ManyToMany
            } else if target_sector_index == 0 {
                TranslationBehaviour::OneToMany
            } else if source_sector_index == 0 {
                TranslationBehaviour::ManyToOne
            } else {
                TranslationBehaviour::ManyToMany
            }
        });
        Ok(RackSectorTranslator {
            number_sectors,
            source_sector_index,
            target_sector_index,
            row_count,
            column_count,
            behaviour,
        })
    }

    /// Translator for a transfer between racks of the given shapes.
    pub fn for_shapes(
        source_shape: &RackShape,
        target_shape: &RackShape,
        number_sectors: u16,
        source_sector_index: SectorIndex,
        target_sector_index: SectorIndex,
    ) -> Result<Self> {
        RackSectorTranslator::new(
            number_sectors,
            source_sector_index,
            target_sector_index,
            Some(Self::translation_behaviour(
                source_shape,
                target_shape,
                number_sectors,
            )),
        )
    }

    /// Behaviour of a transfer between racks of the given shapes.
    pub fn translation_behaviour(
        source_shape: &RackShape,
        target_shape: &RackShape,
        number_sectors: u16,
    ) -> TranslationBehaviour {
        if number_sectors == 1 {
            return TranslationBehaviour::OneToOne;
        }
        match source_shape.size().cmp(&target_shape.size()) {
            std::cmp::Ordering::Equal => TranslationBehaviour::ManyToMany,
            std::cmp::Ordering::Greater => TranslationBehaviour::OneToMany,
            std::cmp::Ordering::Less => TranslationBehaviour::ManyToOne,
        }
    }

    pub fn behaviour(&self) -> TranslationBehaviour {
        self.behaviour
    }

    pub fn number_sectors(&self) -> u16 {
        self.number_sectors
    }

    pub fn source_sector_index(&self) -> SectorIndex {
        self.source_sector_index
    }

    pub fn target_sector_index(&self) -> SectorIndex {
        self.target_sector_index
    }

    pub fn translate(
        &self,
        position: RackPosition,
    ) -> std::result::Result<RackPosition, TranslationError> {
        match self.behaviour {
            TranslationBehaviour::OneToOne => Ok(position),
            TranslationBehaviour::ManyToOne => Ok(self.into_sector(position, self.target_sector_index)),
            TranslationBehaviour::OneToMany => self.out_of_sector(position, self.source_sector_index),
            TranslationBehaviour::ManyToMany => {
                let reduced = self.out_of_sector(position, self.source_sector_index)?;
                Ok(self.into_sector(reduced, self.target_sector_index))
            }
        }
    }

    fn modifiers(&self, sector_index: SectorIndex) -> (u16, u16) {
        (
            sector_index / self.column_count,
            sector_index % self.column_count,
        )
    }

    fn into_sector(&self, position: RackPosition, sector_index: SectorIndex) -> RackPosition {
        let (row_modifier, column_modifier) = self.modifiers(sector_index);
        RackPosition::from_indices(
            position.row_index() * self.row_count + row_modifier,
            position.column_index() * self.column_count + column_modifier,
        )
    }

    fn out_of_sector(
        &self,
        position: RackPosition,
        sector_index: SectorIndex,
    ) -> std::result::Result<RackPosition, TranslationError> {
        let (row_modifier, column_modifier) = self.modifiers(sector_index);
        if position.row_index() % self.row_count != row_modifier
            || position.column_index() % self.column_count != column_modifier
        {
            return Err(TranslationError {
                position,
                sector_index,
                number_sectors: self.number_sectors,
            });
        }
        Ok(RackPosition::from_indices(
            position.row_index() / self.row_count,
            position.column_index() / self.column_count,
        ))
    }
}

/// The sector a position of the large rack belongs to.
pub fn sector_index(position: RackPosition, number_sectors: u16) -> Result<SectorIndex> {
    let (row_count, column_count) = grid_dimensions(number_sectors)?;
    Ok((position.row_index() % row_count) * column_count + position.column_index() % column_count)
}

/// All positions of `shape` that belong to the given sector, in row-major
/// order.
pub fn sector_positions(
    sector_index: SectorIndex,
    shape: &RackShape,
    number_sectors: u16,
) -> Result<Vec<RackPosition>> {
    let behaviour = if number_sectors == 1 {
        TranslationBehaviour::OneToOne
    } else {
        TranslationBehaviour::OneToMany
    };
    let translator = RackSectorTranslator::new(number_sectors, sector_index, 0, Some(behaviour))?;
    Ok(shape
        .positions(PositionOrder::RowMajor)
        .filter(|position| translator.translate(*position).is_ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn pos(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    #[test]
    fn test_default_behaviour() {
        let behaviour = |n, s, t| RackSectorTranslator::new(n, s, t, None).unwrap().behaviour();
        assert_eq!(behaviour(1, 0, 0), TranslationBehaviour::OneToOne);
        assert_eq!(behaviour(4, 0, 0), TranslationBehaviour::ManyToMany);
        assert_eq!(behaviour(4, 2, 0), TranslationBehaviour::OneToMany);
        assert_eq!(behaviour(4, 0, 3), TranslationBehaviour::ManyToOne);
        assert_eq!(behaviour(4, 1, 3), TranslationBehaviour::ManyToMany);
        assert!(RackSectorTranslator::new(3, 0, 0, None).is_err());
        assert!(RackSectorTranslator::new(4, 4, 0, None).is_err());
    }

    #[test]
    fn test_translation_behaviour_from_shapes() {
        let behaviour = RackSectorTranslator::translation_behaviour;
        assert_eq!(
            behaviour(RackShape::SHAPE_384, RackShape::SHAPE_96, 4),
            TranslationBehaviour::OneToMany
        );
        assert_eq!(
            behaviour(RackShape::SHAPE_96, RackShape::SHAPE_384, 4),
            TranslationBehaviour::ManyToOne
        );
        assert_eq!(
            behaviour(RackShape::SHAPE_384, RackShape::SHAPE_384, 4),
            TranslationBehaviour::ManyToMany
        );
        assert_eq!(
            behaviour(RackShape::SHAPE_96, RackShape::SHAPE_384, 1),
            TranslationBehaviour::OneToOne
        );
    }

    #[test]
    fn test_translate() {
        let into_3 = RackSectorTranslator::new(4, 0, 3, None).unwrap();
        assert_eq!(into_3.translate(pos("B2")), Ok(pos("D4")));
        let into_1 = RackSectorTranslator::new(4, 0, 1, None).unwrap();
        assert_eq!(into_1.translate(pos("A1")), Ok(pos("A2")));

        let out_of_2 = RackSectorTranslator::new(4, 2, 0, None).unwrap();
        assert_eq!(out_of_2.translate(pos("D3")), Ok(pos("B2")));
        assert_eq!(
            out_of_2.translate(pos("C3")),
            Err(TranslationError {
                position: pos("C3"),
                sector_index: 2,
                number_sectors: 4
            })
        );

        let swap = RackSectorTranslator::new(4, 1, 2, None).unwrap();
        assert_eq!(swap.translate(pos("A2")), Ok(pos("B1")));
    }

    #[test]
    fn test_translate_on_rectangular_grid() {
        let translator = RackSectorTranslator::with_dimensions(
            4,
            0,
            3,
            Some(TranslationBehaviour::ManyToOne),
            Some(1),
            None,
        )
        .unwrap();
        assert_eq!(translator.translate(pos("A1")).unwrap(), pos("A4"));
        assert_eq!(translator.translate(pos("B2")).unwrap(), pos("B8"));

        let translator =
            RackSectorTranslator::with_dimensions(2, 1, 0, None, Some(2), Some(1)).unwrap();
        assert_eq!(translator.behaviour(), TranslationBehaviour::OneToMany);
        assert_eq!(translator.translate(pos("B3")).unwrap(), pos("A3"));
        assert!(translator.translate(pos("A3")).is_err());

        assert!(matches!(
            RackSectorTranslator::with_dimensions(4, 0, 0, None, Some(3), Some(3)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            RackSectorTranslator::with_dimensions(4, 0, 0, None, None, Some(3)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sector_index() {
        assert_eq!(sector_index(pos("A1"), 4).unwrap(), 0);
        assert_eq!(sector_index(pos("A2"), 4).unwrap(), 1);
        assert_eq!(sector_index(pos("B1"), 4).unwrap(), 2);
        assert_eq!(sector_index(pos("P24"), 4).unwrap(), 3);
        assert_eq!(sector_index(pos("P24"), 1).unwrap(), 0);
    }

    #[test]
    fn test_sector_positions() {
        let positions = sector_positions(3, RackShape::SHAPE_384, 4).unwrap();
        assert_eq!(positions.len(), 96);
        assert_eq!(positions[0], pos("B2"));
        assert_eq!(sector_positions(0, RackShape::SHAPE_96, 1).unwrap().len(), 96);
    }

    proptest! {
        #[test]
        fn prop_sector_positions_partition_the_shape(use_384 in any::<bool>()) {
            let shape = if use_384 { RackShape::SHAPE_384 } else { RackShape::SHAPE_96 };
            let mut seen = BTreeSet::new();
            let mut total = 0;
            for sector in 0..4 {
                for position in sector_positions(sector, shape, 4).unwrap() {
                    prop_assert_eq!(sector_index(position, 4).unwrap(), sector);
                    seen.insert(position);
                    total += 1;
                }
            }
            prop_assert_eq!(total, shape.size());
            prop_assert_eq!(seen.len(), shape.size());
        }

        #[test]
        fn prop_translation_round_trip(row in 0u16..8, column in 0u16..12, sector in 0u16..4) {
            let position = RackPosition::from_indices(row, column);
            let forward = RackSectorTranslator::new(4, 0, sector, Some(TranslationBehaviour::ManyToOne)).unwrap();
            let backward = RackSectorTranslator::new(4, sector, 0, Some(TranslationBehaviour::OneToMany)).unwrap();
            let translated = forward.translate(position).unwrap();
            prop_assert!(RackShape::SHAPE_384.contains(&translated));
            prop_assert_eq!(backward.translate(translated), Ok(position));
        }
    }
}
