// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod converter;
pub mod factor;
pub mod parameters;
pub mod pool;
pub mod rack_layout;
pub mod scenario;
pub mod tag;
pub mod transfection;
pub mod working_layout;

pub use converter::TransfectionLayoutConverter;
pub use factor::FactorValue;
pub use parameters::TransfectionParameter;
pub use pool::{
    MoleculeDesignPool, MoleculeType, PoolCatalog, PoolId, PoolRegistry, PoolValue, PositionType,
};
pub use rack_layout::{RackLayout, TaggedRackPositionSet};
pub use scenario::{Scenario, ScenarioTraits};
pub use tag::Tag;
pub use transfection::{TransfectionLayout, TransfectionPosition};
pub use working_layout::{Frozen, TagPosition, WorkingLayout, WorkingPosition};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    LayoutInconsistency(String),

    #[error("{0}")]
    State(String),

    #[error(transparent)]
    Rack(#[from] thelma_racks::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
