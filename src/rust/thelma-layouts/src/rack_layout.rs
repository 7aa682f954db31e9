// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thelma_racks::{RackPosition, RackPositionSet, RackShape, join_labels};

use crate::tag::Tag;
use crate::{Error, Result};

/// A set of tags applied to every position of a position set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRackPositionSet {
    pub tags: BTreeSet<Tag>,
    pub positions: RackPositionSet,
    pub creator: String,
}

impl TaggedRackPositionSet {
    pub fn new(tags: BTreeSet<Tag>, positions: RackPositionSet, creator: impl Into<String>) -> Self {
        TaggedRackPositionSet {
            tags,
            positions,
            creator: creator.into(),
        }
    }
}

/// A rack shape plus tagged position sets.
///
/// Pure data: positions bearing identical tag sets are indistinguishable.
/// Equality is therefore semantic, two layouts are equal if they have the
/// same shape and every position carries the same tags in both.
#[derive(Debug, Clone)]
pub struct RackLayout {
    shape: &'static RackShape,
    tagged_position_sets: Vec<TaggedRackPositionSet>,
}

impl RackLayout {
    pub fn new(shape: &'static RackShape) -> Self {
        RackLayout {
            shape,
            tagged_position_sets: Vec::new(),
        }
    }

    pub fn shape(&self) -> &'static RackShape {
        self.shape
    }

    pub fn tagged_position_sets(&self) -> &[TaggedRackPositionSet] {
        &self.tagged_position_sets
    }

    pub fn add_tagged_position_set(&mut self, tagged: TaggedRackPositionSet) -> Result<()> {
        let outside: Vec<_> = tagged
            .positions
            .iter()
            .filter(|p| !self.shape.contains(p))
            .collect();
        if !outside.is_empty() {
            return Err(Error::LayoutInconsistency(format!(
                "The following positions are out of range for rack shape {}: {}.",
                self.shape,
                join_labels(outside)
            )));
        }
        self.tagged_position_sets.push(tagged);
        Ok(())
    }

    /// Union of the tags of all tagged position sets.
    pub fn tags(&self) -> BTreeSet<Tag> {
        self.tagged_position_sets
            .iter()
            .flat_map(|t| t.tags.iter().cloned())
            .collect()
    }

    /// Union of the positions of all tagged position sets.
    pub fn positions(&self) -> RackPositionSet {
        self.tagged_position_sets
            .iter()
            .flat_map(|t| t.positions.iter().copied())
            .collect()
    }

    pub fn tags_for(&self, position: &RackPosition) -> BTreeSet<Tag> {
        self.tagged_position_sets
            .iter()
            .filter(|t| t.positions.contains(position))
            .flat_map(|t| t.tags.iter().cloned())
            .collect()
    }

    pub fn positions_for(&self, tag: &Tag) -> RackPositionSet {
        self.tagged_position_sets
            .iter()
            .filter(|t| t.tags.contains(tag))
            .flat_map(|t| t.positions.iter().copied())
            .collect()
    }

    /// Tags of every tagged position, in (row, column) order.
    pub fn tag_map(&self) -> BTreeMap<RackPosition, BTreeSet<Tag>> {
        let mut map: BTreeMap<RackPosition, BTreeSet<Tag>> = BTreeMap::new();
        for tagged in &self.tagged_position_sets {
            for position in &tagged.positions {
                map.entry(*position)
                    .or_default()
                    .extend(tagged.tags.iter().cloned());
            }
        }
        map.retain(|_, tags| !tags.is_empty());
        map
    }
}

impl PartialEq for RackLayout {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.tag_map() == other.tag_map()
    }
}

impl Eq for RackLayout {}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(labels: &[&str]) -> RackPositionSet {
        labels
            .iter()
            .map(|l| RackPosition::from_label(l).unwrap())
            .collect()
    }

    fn sample_layout() -> RackLayout {
        let mut layout = RackLayout::new(RackShape::SHAPE_96);
        layout
            .add_tagged_position_set(TaggedRackPositionSet::new(
                BTreeSet::from([Tag::factor("cell line", "MCF7")]),
                positions(&["A1", "A2"]),
                "tester",
            ))
            .unwrap();
        layout
            .add_tagged_position_set(TaggedRackPositionSet::new(
                BTreeSet::from([Tag::factor("siRNA", "B")]),
                positions(&["A2", "B1"]),
                "tester",
            ))
            .unwrap();
        layout
    }

    #[test]
    fn test_derived_queries() {
        let layout = sample_layout();
        assert_eq!(layout.tags().len(), 2);
        assert_eq!(layout.positions(), positions(&["A1", "A2", "B1"]));
        let a2 = RackPosition::from_label("A2").unwrap();
        assert_eq!(
            layout.tags_for(&a2),
            BTreeSet::from([Tag::factor("cell line", "MCF7"), Tag::factor("siRNA", "B")])
        );
        assert_eq!(
            layout.positions_for(&Tag::factor("siRNA", "B")),
            positions(&["A2", "B1"])
        );
        assert!(layout.tags_for(&RackPosition::from_label("H12").unwrap()).is_empty());
    }

    #[test]
    fn test_out_of_range_positions_are_rejected() {
        let mut layout = RackLayout::new(RackShape::SHAPE_96);
        let err = layout
            .add_tagged_position_set(TaggedRackPositionSet::new(
                BTreeSet::from([Tag::factor("x", "y")]),
                positions(&["P24", "A1", "I1"]),
                "tester",
            ))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following positions are out of range for rack shape 8x12: I1, P24."
        );
    }

    #[test]
    fn test_semantic_equality() {
        let layout = sample_layout();
        // Same per-position tags, different grouping.
        let mut regrouped = RackLayout::new(RackShape::SHAPE_96);
        for (position, tags) in layout.tag_map() {
            regrouped
                .add_tagged_position_set(TaggedRackPositionSet::new(
                    tags,
                    RackPositionSet::from_iter([position]),
                    "other",
                ))
                .unwrap();
        }
        assert_eq!(layout, regrouped);
        assert_ne!(layout, RackLayout::new(RackShape::SHAPE_96));
    }
}
