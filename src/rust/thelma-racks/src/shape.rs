// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use crate::{Error, RackPosition, Result};

/// Enumeration order of the positions of a rack shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOrder {
    /// `A1, A2, ..., B1, ...`
    RowMajor,
    /// `A1, B1, ..., A2, ...`
    ColumnMajor,
}

/// The dimensions of a rack.
///
/// Shapes are process-wide constants; callers get `&'static` handles from
/// [`RackShape::from_name`] or [`RackShape::from_size`] and never build them.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct RackShape {
    pub name: &'static str,
    pub number_rows: u16,
    pub number_columns: u16,
}

pub const SHAPE_96: RackShape = RackShape {
    name: "8x12",
    number_rows: 8,
    number_columns: 12,
};

pub const SHAPE_384: RackShape = RackShape {
    name: "16x24",
    number_rows: 16,
    number_columns: 24,
};

static ALL_SHAPES: [&RackShape; 2] = [&SHAPE_96, &SHAPE_384];

impl RackShape {
    pub const SHAPE_96: &'static RackShape = &SHAPE_96;
    pub const SHAPE_384: &'static RackShape = &SHAPE_384;

    pub fn from_name(name: &str) -> Result<&'static RackShape> {
        ALL_SHAPES
            .iter()
            .find(|shape| shape.name == name)
            .copied()
            .ok_or_else(|| Error::UnknownName {
                kind: "rack shape",
                name: name.to_string(),
            })
    }

    pub fn from_size(size: usize) -> Result<&'static RackShape> {
        ALL_SHAPES
            .iter()
            .find(|shape| shape.size() == size)
            .copied()
            .ok_or_else(|| Error::UnknownName {
                kind: "rack shape size",
                name: size.to_string(),
            })
    }

    pub const fn size(&self) -> usize {
        self.number_rows as usize * self.number_columns as usize
    }

    pub fn contains(&self, position: &RackPosition) -> bool {
        position.row_index() < self.number_rows && position.column_index() < self.number_columns
    }

    /// Fail with a user-facing error if the position does not fit the shape.
    pub fn check_contains(&self, position: &RackPosition) -> Result<()> {
        if self.contains(position) {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                position: position.label(),
                shape: self.name.to_string(),
            })
        }
    }

    pub fn positions(&self, order: PositionOrder) -> impl Iterator<Item = RackPosition> + use<> {
        let rows = self.number_rows;
        let columns = self.number_columns;
        (0..self.size()).map(move |i| match order {
            PositionOrder::RowMajor => RackPosition::from_indices(
                (i / columns as usize) as u16,
                (i % columns as usize) as u16,
            ),
            PositionOrder::ColumnMajor => {
                RackPosition::from_indices((i % rows as usize) as u16, (i / rows as usize) as u16)
            }
        })
    }
}

impl Display for RackShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert_eq!(RackShape::from_name("8x12").unwrap(), RackShape::SHAPE_96);
        assert_eq!(RackShape::from_size(384).unwrap(), RackShape::SHAPE_384);
        assert!(RackShape::from_name("4x6").is_err());
        assert_eq!(RackShape::SHAPE_96.size(), 96);
    }

    #[test]
    fn test_position_orders() {
        let row_major: Vec<_> = RackShape::SHAPE_96
            .positions(PositionOrder::RowMajor)
            .take(3)
            .map(|p| p.label())
            .collect();
        assert_eq!(row_major, vec!["A1", "A2", "A3"]);
        let column_major: Vec<_> = RackShape::SHAPE_96
            .positions(PositionOrder::ColumnMajor)
            .take(3)
            .map(|p| p.label())
            .collect();
        assert_eq!(column_major, vec!["A1", "B1", "C1"]);
        assert_eq!(
            RackShape::SHAPE_384
                .positions(PositionOrder::ColumnMajor)
                .last()
                .unwrap()
                .label(),
            "P24"
        );
    }

    #[test]
    fn test_contains() {
        let h12 = RackPosition::from_label("H12").unwrap();
        let i1 = RackPosition::from_label("I1").unwrap();
        assert!(RackShape::SHAPE_96.contains(&h12));
        assert!(!RackShape::SHAPE_96.contains(&i1));
        assert!(RackShape::SHAPE_384.contains(&i1));
        assert!(RackShape::SHAPE_96.check_contains(&i1).is_err());
    }
}
