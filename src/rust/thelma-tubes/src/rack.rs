// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use thelma_racks::{RackPosition, RackShape};

use crate::{Error, Result};

/// A rack holding barcoded tubes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeRack {
    barcode: String,
    shape: &'static RackShape,
    tubes: BTreeMap<RackPosition, String>,
}

impl TubeRack {
    pub fn new(barcode: impl Into<String>, shape: &'static RackShape) -> Self {
        TubeRack {
            barcode: barcode.into(),
            shape,
            tubes: BTreeMap::new(),
        }
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn shape(&self) -> &'static RackShape {
        self.shape
    }

    pub fn tube_at(&self, position: &RackPosition) -> Option<&str> {
        self.tubes.get(position).map(String::as_str)
    }

    pub fn position_of(&self, tube_barcode: &str) -> Option<RackPosition> {
        self.tubes
            .iter()
            .find(|(_, barcode)| barcode.as_str() == tube_barcode)
            .map(|(position, _)| *position)
    }

    /// Tubes in (row, column) order.
    pub fn tubes(&self) -> impl Iterator<Item = (RackPosition, &str)> {
        self.tubes.iter().map(|(p, b)| (*p, b.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty()
    }

    pub fn add_tube(&mut self, position: RackPosition, tube_barcode: impl Into<String>) -> Result<()> {
        self.shape.check_contains(&position)?;
        if let Some(existing) = self.tubes.get(&position) {
            return Err(Error::OccupiedSlot(format!(
                "Position {position} of rack {} is already occupied by tube {existing}.",
                self.barcode
            )));
        }
        self.tubes.insert(position, tube_barcode.into());
        Ok(())
    }

    pub fn remove_tube(&mut self, position: &RackPosition) -> Result<String> {
        self.tubes.remove(position).ok_or_else(|| {
            Error::MissingSample(format!(
                "There is no tube at position {position} of rack {}.",
                self.barcode
            ))
        })
    }
}

/// Access to the tube racks of the entity store.
pub trait TubeRackStore {
    fn rack(&self, barcode: &str) -> Option<&TubeRack>;

    fn rack_mut(&mut self, barcode: &str) -> Option<&mut TubeRack>;

    /// Barcodes of all known racks.
    fn rack_barcodes(&self) -> Vec<String>;

    /// Rack and position of a tube.
    fn locate_tube(&self, tube_barcode: &str) -> Option<(String, RackPosition)> {
        self.rack_barcodes().into_iter().find_map(|barcode| {
            let position = self.rack(&barcode)?.position_of(tube_barcode)?;
            Some((barcode, position))
        })
    }
}

/// In-memory rack store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RackInventory {
    racks: BTreeMap<String, TubeRack>,
}

impl RackInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rack(mut self, rack: TubeRack) -> Self {
        self.racks.insert(rack.barcode.clone(), rack);
        self
    }
}

impl TubeRackStore for RackInventory {
    fn rack(&self, barcode: &str) -> Option<&TubeRack> {
        self.racks.get(barcode)
    }

    fn rack_mut(&mut self, barcode: &str) -> Option<&mut TubeRack> {
        self.racks.get_mut(barcode)
    }

    fn rack_barcodes(&self) -> Vec<String> {
        self.racks.keys().cloned().collect()
    }
}
