// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Geometry of interleaved rack sectors.
//!
//! A 384-well plate consists of four interleaved sectors of 96 wells each,
//! numbered in Z order (`A1 -> 0`, `A2 -> 1`, `B1 -> 2`, `B2 -> 3`). This
//! crate maps positions between sectors and discovers which sectors of an
//! authored layout must be treated together.

pub mod association_data;
pub mod associator;
pub mod quadrant;
pub mod translator;
pub mod value_determiner;

pub use association_data::AssociationData;
pub use associator::{ConcentrationKind, RackSectorAssociator, SectorAssociation};
pub use quadrant::{Quadrant, QuadrantIterator, sort_into_sectors};
pub use translator::{
    RackSectorTranslator, TranslationBehaviour, TranslationError, sector_index, sector_positions,
};
pub use value_determiner::{SectorAttribute, SectorValueDeterminer};

pub type SectorIndex = u16;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Association(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Layout(#[from] thelma_layouts::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
