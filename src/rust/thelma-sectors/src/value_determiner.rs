// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Display;

use thelma_layouts::{WorkingLayout, WorkingPosition};

use crate::quadrant::sort_into_sectors;
use crate::{Error, Result, SectorIndex};

/// An attribute of a working position that must be uniform within a sector.
pub trait SectorAttribute<P> {
    type Value: Clone + PartialEq + Display;

    /// Name used in messages, e.g. "final concentration".
    fn name(&self) -> &str;

    fn value(&self, position: &P) -> Option<Self::Value>;

    /// Positions for which this returns true do not contribute a value.
    fn ignore(&self, _position: &P) -> bool {
        false
    }
}

/// Determines the single value of an attribute within each sector.
pub struct SectorValueDeterminer<'a, P> {
    layout: &'a WorkingLayout<P>,
    number_sectors: u16,
}

impl<'a, P: WorkingPosition> SectorValueDeterminer<'a, P> {
    pub fn new(layout: &'a WorkingLayout<P>, number_sectors: u16) -> Self {
        SectorValueDeterminer {
            layout,
            number_sectors,
        }
    }

    /// Value per sector; `None` for sectors without any value.
    ///
    /// Fails if a sector yields more than one distinct value.
    pub fn determine<A: SectorAttribute<P>>(
        &self,
        attribute: &A,
    ) -> Result<BTreeMap<SectorIndex, Option<A::Value>>> {
        let mut values = BTreeMap::new();
        let mut conflicts = Vec::new();
        for (sector, positions) in sort_into_sectors(self.layout, self.number_sectors)? {
            let mut found: Vec<A::Value> = Vec::new();
            for position in positions {
                if attribute.ignore(position) {
                    continue;
                }
                match attribute.value(position) {
                    Some(value) if !found.contains(&value) => found.push(value),
                    _ => {}
                }
            }
            if found.len() > 1 {
                let rendered: Vec<String> = found.iter().map(ToString::to_string).collect();
                conflicts.push(format!("sector {} ({})", sector + 1, rendered.join(", ")));
                continue;
            }
            values.insert(sector, found.pop());
        }
        if !conflicts.is_empty() {
            return Err(Error::Association(format!(
                "There is more than one {} value in the following sectors: {}.",
                attribute.name(),
                conflicts.join(", ")
            )));
        }
        thelma_log::diagnostic!("Determined {} per sector.", attribute.name());
        Ok(values)
    }
}
