// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;

use indexmap::IndexMap;
use thelma_racks::{RackPosition, RackPositionSet, RackShape};

use crate::rack_layout::{RackLayout, TaggedRackPositionSet};
use crate::tag::Tag;
use crate::{Error, Result};

/// A position of a working layout.
///
/// Working positions are plain values keyed by their rack position; they hold
/// no reference to the layout they live in.
pub trait WorkingPosition: Clone {
    fn rack_position(&self) -> RackPosition;

    /// The tags this position contributes to a rack layout.
    fn tags(&self) -> BTreeSet<Tag>;

    fn is_empty(&self) -> bool {
        false
    }
}

/// A rack shape plus one working position per occupied rack position.
///
/// The layout acts as builder: positions can be added and edited until the
/// layout is closed. Mutating a closed layout is a state error.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingLayout<P> {
    shape: &'static RackShape,
    positions: BTreeMap<RackPosition, P>,
    closed: bool,
}

impl<P: WorkingPosition> WorkingLayout<P> {
    pub fn new(shape: &'static RackShape) -> Self {
        WorkingLayout {
            shape,
            positions: BTreeMap::new(),
            closed: false,
        }
    }

    pub fn shape(&self) -> &'static RackShape {
        self.shape
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::State(
                "The layout has been closed and must not be modified.".to_string(),
            ));
        }
        Ok(())
    }

    /// Add (or replace) the working position at its rack position.
    pub fn add_position(&mut self, position: P) -> Result<()> {
        self.check_open()?;
        let rack_position = position.rack_position();
        if !self.shape.contains(&rack_position) {
            return Err(Error::LayoutInconsistency(format!(
                "Position {rack_position} is out of range for rack shape {}.",
                self.shape
            )));
        }
        self.positions.insert(rack_position, position);
        Ok(())
    }

    pub fn remove_position(&mut self, rack_position: &RackPosition) -> Result<Option<P>> {
        self.check_open()?;
        Ok(self.positions.remove(rack_position))
    }

    pub fn get(&self, rack_position: &RackPosition) -> Option<&P> {
        self.positions.get(rack_position)
    }

    pub fn get_mut(&mut self, rack_position: &RackPosition) -> Result<Option<&mut P>> {
        self.check_open()?;
        Ok(self.positions.get_mut(rack_position))
    }

    /// Working positions in (row, column) order.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.positions.values()
    }

    pub fn iter_mut(&mut self) -> Result<impl Iterator<Item = &mut P>> {
        self.check_open()?;
        Ok(self.positions.values_mut())
    }

    pub fn rack_positions(&self) -> RackPositionSet {
        self.positions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the layout and hand out a read-only view.
    pub fn freeze(mut self) -> Frozen<Self> {
        self.close();
        Frozen(self)
    }

    /// Materialise the layout: positions sharing an identical tag set end up
    /// in one tagged position set. Positions without tags are skipped.
    pub fn create_rack_layout(&self, creator: &str) -> Result<RackLayout> {
        let mut groups: IndexMap<BTreeSet<Tag>, RackPositionSet> = IndexMap::new();
        for (rack_position, position) in &self.positions {
            if position.is_empty() {
                continue;
            }
            let tags = position.tags();
            if tags.is_empty() {
                continue;
            }
            groups.entry(tags).or_default().insert(*rack_position);
        }
        let mut rack_layout = RackLayout::new(self.shape);
        for (tags, positions) in groups {
            rack_layout.add_tagged_position_set(TaggedRackPositionSet::new(
                tags, positions, creator,
            ))?;
        }
        Ok(rack_layout)
    }
}

/// A read-only view of a closed layout.
///
/// Only frozen layouts are handed to the worklist generators; the wrapper
/// gives out shared references only, so the layout cannot change anymore.
#[derive(Debug, Clone, PartialEq)]
pub struct Frozen<L>(L);

impl<L> Frozen<L> {
    pub(crate) fn new(layout: L) -> Self {
        Frozen(layout)
    }
}

impl<L> Deref for Frozen<L> {
    type Target = L;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A working position that carries arbitrary tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TagPosition {
    pub rack_position: RackPosition,
    pub tags: BTreeSet<Tag>,
}

impl WorkingPosition for TagPosition {
    fn rack_position(&self) -> RackPosition {
        self.rack_position
    }

    fn tags(&self) -> BTreeSet<Tag> {
        self.tags.clone()
    }

    fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl WorkingLayout<TagPosition> {
    /// Convert a rack layout into a working layout with one position per
    /// tagged rack position.
    pub fn from_rack_layout(rack_layout: &RackLayout) -> Result<Self> {
        let mut layout = WorkingLayout::new(rack_layout.shape());
        for (rack_position, tags) in rack_layout.tag_map() {
            layout.add_position(TagPosition {
                rack_position,
                tags,
            })?;
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pos(label: &str) -> RackPosition {
        RackPosition::from_label(label).unwrap()
    }

    fn tag_position(label: &str, tags: &[(&str, &str)]) -> TagPosition {
        TagPosition {
            rack_position: pos(label),
            tags: tags.iter().map(|(p, v)| Tag::factor(*p, *v)).collect(),
        }
    }

    #[test]
    fn test_add_position_checks_shape() {
        let mut layout = WorkingLayout::new(RackShape::SHAPE_96);
        layout.add_position(tag_position("H12", &[("a", "1")])).unwrap();
        let err = layout
            .add_position(tag_position("I1", &[("a", "1")]))
            .unwrap_err();
        assert!(matches!(err, Error::LayoutInconsistency(_)));
        assert_eq!(layout.len(), 1);
    }

    #[test]
    fn test_closed_layout_rejects_mutation() {
        let mut layout = WorkingLayout::new(RackShape::SHAPE_96);
        layout.add_position(tag_position("A1", &[("a", "1")])).unwrap();
        layout.close();
        assert!(matches!(
            layout.add_position(tag_position("A2", &[("a", "1")])),
            Err(Error::State(_))
        ));
        assert!(layout.get_mut(&pos("A1")).is_err());
        assert!(layout.iter_mut().is_err());
        assert!(layout.remove_position(&pos("A1")).is_err());
        assert!(layout.get(&pos("A1")).is_some());
    }

    #[test]
    fn test_create_rack_layout_groups_identical_tags() {
        let mut layout = WorkingLayout::new(RackShape::SHAPE_96);
        layout.add_position(tag_position("A1", &[("a", "1")])).unwrap();
        layout.add_position(tag_position("B1", &[("a", "1")])).unwrap();
        layout
            .add_position(tag_position("A2", &[("a", "1"), ("b", "2")]))
            .unwrap();
        layout.add_position(tag_position("C1", &[])).unwrap();
        let rack_layout = layout.create_rack_layout("tester").unwrap();
        let sets = rack_layout.tagged_position_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].positions.len(), 2);
        assert!(sets[0].positions.contains(&pos("B1")));
        assert_eq!(sets[1].tags.len(), 2);
        assert!(!rack_layout.positions().contains(&pos("C1")));
    }

    #[test]
    fn test_round_trip_between_rack_layout_and_working_layout() {
        let mut layout = WorkingLayout::new(RackShape::SHAPE_384);
        layout
            .add_position(tag_position("A1", &[("cell line", "MCF7"), ("siRNA", "x")]))
            .unwrap();
        layout
            .add_position(tag_position("P24", &[("cell line", "HeLa")]))
            .unwrap();
        layout
            .add_position(tag_position("C7", &[("cell line", "MCF7")]))
            .unwrap();
        let rack_layout = layout.create_rack_layout("tester").unwrap();
        let converted = WorkingLayout::from_rack_layout(&rack_layout).unwrap();
        assert_eq!(converted.create_rack_layout("tester").unwrap(), rack_layout);
        assert_eq!(converted.len(), 3);
    }

    #[test]
    fn test_frozen_layout_is_read_only_and_closed() {
        let mut layout = WorkingLayout::new(RackShape::SHAPE_96);
        layout.add_position(tag_position("A1", &[("a", "1")])).unwrap();
        let frozen = layout.freeze();
        assert!(frozen.is_closed());
        assert_eq!(frozen.len(), 1);
    }

    fn arbitrary_rack_layout() -> impl Strategy<Value = RackLayout> {
        let tag = (0..3usize, 0..3usize)
            .prop_map(|(predicate, value)| Tag::factor(format!("factor {predicate}"), format!("{value}")));
        let tags = proptest::collection::btree_set(tag, 1..4);
        let positions = proptest::collection::btree_set((0u16..8, 0u16..12), 1..10).prop_map(
            |indices| {
                indices
                    .into_iter()
                    .map(|(row, column)| RackPosition::from_indices(row, column))
                    .collect::<RackPositionSet>()
            },
        );
        proptest::collection::vec((tags, positions), 0..6).prop_map(|sets| {
            let mut rack_layout = RackLayout::new(RackShape::SHAPE_96);
            for (tags, positions) in sets {
                rack_layout
                    .add_tagged_position_set(TaggedRackPositionSet::new(tags, positions, "tester"))
                    .unwrap();
            }
            rack_layout
        })
    }

    proptest! {
        #[test]
        fn prop_rack_layout_survives_working_layout_round_trip(rack_layout in arbitrary_rack_layout()) {
            let working = WorkingLayout::from_rack_layout(&rack_layout).unwrap();
            prop_assert_eq!(working.len(), rack_layout.positions().len());
            prop_assert_eq!(working.create_rack_layout("tester").unwrap(), rack_layout);
        }
    }
}
