// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thelma_units::{Concentration, Nanomolar};

pub type PoolId = u64;

/// Prefix of the placeholders of floating positions, e.g. `md_001`.
pub const FLOATING_PREFIX: &str = "md_";
pub const MOCK_VALUE: &str = "mock";
pub const UNTREATED_VALUE: &str = "untreated";
pub const LIBRARY_VALUE: &str = "library";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoleculeType {
    #[serde(rename = "SIRNA")]
    Sirna,
    #[serde(rename = "ESI_RNA")]
    Esirna,
    #[serde(rename = "MIRNA_INHI")]
    MirnaInhibitor,
    #[serde(rename = "MIRNA_MIMI")]
    MirnaMimic,
    #[serde(rename = "LONG_DSRNA")]
    LongDsrna,
    #[serde(rename = "ANTI_MIR")]
    Antisense,
    #[serde(rename = "COMPOUND")]
    Compound,
}

impl MoleculeType {
    /// OptiMem dilution factor used when the layout does not specify one.
    pub fn default_optimem_dilution_factor(&self) -> f64 {
        match self {
            MoleculeType::MirnaInhibitor | MoleculeType::MirnaMimic => 3.0,
            _ => 4.0,
        }
    }
}

/// A molecule design pool as provided by the entity store.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeDesignPool {
    pub id: PoolId,
    pub molecule_type: MoleculeType,
    pub stock_concentration: Concentration<Nanomolar>,
}

/// Lookup of molecule design pools in the entity store.
pub trait PoolCatalog {
    fn get_pool(&self, id: PoolId) -> Option<MoleculeDesignPool>;
}

/// In-memory pool catalog.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: HashMap<PoolId, MoleculeDesignPool>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: MoleculeDesignPool) -> Self {
        self.pools.insert(pool.id, pool);
        self
    }
}

impl PoolCatalog for PoolRegistry {
    fn get_pool(&self, id: PoolId) -> Option<MoleculeDesignPool> {
        self.pools.get(&id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionType {
    Fixed,
    Floating,
    Library,
    Mock,
    Untreated,
    Empty,
}

impl Display for PositionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            PositionType::Fixed => "fixed",
            PositionType::Floating => "floating",
            PositionType::Library => "library",
            PositionType::Mock => "mock",
            PositionType::Untreated => "untreated",
            PositionType::Empty => "empty",
        };
        write!(f, "{name}")
    }
}

/// Content of the molecule design pool field of a position.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolValue {
    Fixed(MoleculeDesignPool),
    /// Placeholder filled with a different pool per ISO.
    Floating(String),
    Library,
    Mock,
    Untreated,
    Empty,
}

impl PoolValue {
    pub fn position_type(&self) -> PositionType {
        match self {
            PoolValue::Fixed(_) => PositionType::Fixed,
            PoolValue::Floating(_) => PositionType::Floating,
            PoolValue::Library => PositionType::Library,
            PoolValue::Mock => PositionType::Mock,
            PoolValue::Untreated => PositionType::Untreated,
            PoolValue::Empty => PositionType::Empty,
        }
    }

    /// True for positions that receive a sample (fixed, floating, library).
    pub fn is_sample(&self) -> bool {
        matches!(
            self,
            PoolValue::Fixed(_) | PoolValue::Floating(_) | PoolValue::Library
        )
    }

    /// The value used in tags and hash keys.
    pub fn tag_value(&self) -> String {
        match self {
            PoolValue::Fixed(pool) => pool.id.to_string(),
            PoolValue::Floating(placeholder) => placeholder.clone(),
            PoolValue::Library => LIBRARY_VALUE.to_string(),
            PoolValue::Mock => MOCK_VALUE.to_string(),
            PoolValue::Untreated => UNTREATED_VALUE.to_string(),
            PoolValue::Empty => String::new(),
        }
    }

    pub fn molecule_type(&self) -> Option<MoleculeType> {
        match self {
            PoolValue::Fixed(pool) => Some(pool.molecule_type),
            _ => None,
        }
    }

    /// Parse a pool field. Numeric values are looked up in the catalog.
    pub fn parse(value: &str, catalog: &impl PoolCatalog) -> Option<PoolValue> {
        let value = value.trim();
        let lower = value.to_lowercase();
        match lower.as_str() {
            "" | "none" => return Some(PoolValue::Empty),
            MOCK_VALUE => return Some(PoolValue::Mock),
            UNTREATED_VALUE => return Some(PoolValue::Untreated),
            LIBRARY_VALUE => return Some(PoolValue::Library),
            _ => {}
        }
        if lower.starts_with(FLOATING_PREFIX) {
            return Some(PoolValue::Floating(lower));
        }
        let id: PoolId = value.parse().ok()?;
        catalog.get_pool(id).map(PoolValue::Fixed)
    }
}
