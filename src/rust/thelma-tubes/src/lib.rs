// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Tube racks and the execution of tube transfers, including the files
//! exchanged with the XL20 tube handler and the rack scanner.

pub mod executor;
pub mod rack;
pub mod rack_scanning;
pub mod transfer;
pub mod xl20;

pub use executor::TubeTransferExecutor;
pub use rack::{RackInventory, TubeRack, TubeRackStore};
pub use rack_scanning::{RackScan, ScanComparison, derive_tube_transfers};
pub use transfer::{TubeTransfer, TubeTransferWorklist};
pub use xl20::{Xl20Output, Xl20Step, Xl20Worklist};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    MissingSample(String),

    #[error("{0}")]
    OccupiedSlot(String),

    #[error("{0}")]
    State(String),

    #[error(transparent)]
    Rack(#[from] thelma_racks::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
