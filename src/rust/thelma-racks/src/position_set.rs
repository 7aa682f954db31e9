// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::RackPosition;

/// An unordered set of rack positions with a process-stable hash value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RackPositionSet(BTreeSet<RackPosition>);

impl RackPositionSet {
    pub fn new() -> Self {
        RackPositionSet(BTreeSet::new())
    }

    pub fn insert(&mut self, position: RackPosition) -> bool {
        self.0.insert(position)
    }

    pub fn contains(&self, position: &RackPosition) -> bool {
        self.0.contains(position)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positions in (row, column) order.
    pub fn iter(&self) -> impl Iterator<Item = &RackPosition> {
        self.0.iter()
    }

    pub fn union(&self, other: &RackPositionSet) -> RackPositionSet {
        RackPositionSet(self.0.union(&other.0).copied().collect())
    }

    /// Hash value derived from the sorted position labels.
    ///
    /// Two sets containing the same positions always yield the same value,
    /// independent of insertion order and of the process that computes it.
    pub fn hash_value(&self) -> String {
        let labels = self
            .0
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(";");
        format!("{:x}", md5::compute(labels.as_bytes()))
    }
}

impl FromIterator<RackPosition> for RackPositionSet {
    fn from_iter<I: IntoIterator<Item = RackPosition>>(iter: I) -> Self {
        RackPositionSet(iter.into_iter().collect())
    }
}

impl Extend<RackPosition> for RackPositionSet {
    fn extend<I: IntoIterator<Item = RackPosition>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for RackPositionSet {
    type Item = RackPosition;
    type IntoIter = std::collections::btree_set::IntoIter<RackPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RackPositionSet {
    type Item = &'a RackPosition;
    type IntoIter = std::collections::btree_set::Iter<'a, RackPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[&str]) -> RackPositionSet {
        labels
            .iter()
            .map(|l| RackPosition::from_label(l).unwrap())
            .collect()
    }

    #[test]
    fn test_hash_value_is_order_independent() {
        let a = set(&["A1", "B2", "C3"]);
        let b = set(&["C3", "A1", "B2"]);
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
        assert_ne!(a.hash_value(), set(&["A1", "B2"]).hash_value());
    }

    #[test]
    fn test_hash_value_is_stable() {
        // md5 of "A1;B2"
        assert_eq!(
            set(&["B2", "A1"]).hash_value(),
            format!("{:x}", md5::compute(b"A1;B2"))
        );
    }

    #[test]
    fn test_union() {
        let union = set(&["A1", "B2"]).union(&set(&["B2", "C3"]));
        assert_eq!(union, set(&["A1", "B2", "C3"]));
        assert_eq!(union.len(), 3);
    }
}
