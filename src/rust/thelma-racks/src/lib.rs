// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Rack geometry and the static equipment tables.

pub mod position;
pub mod position_set;
pub mod shape;
pub mod specs;

pub use position::RackPosition;
pub use position_set::RackPositionSet;
pub use shape::{PositionOrder, RackShape};
pub use specs::{PipettingSpecs, PipettingSpecsKind, ReservoirSpecs, ReservoirSpecsKind};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid rack position label: '{0}'.")]
    InvalidLabel(String),

    #[error("Position {position} is out of range for rack shape {shape}.")]
    OutOfRange { position: String, shape: String },

    #[error("Unknown {kind}: '{name}'.")]
    UnknownName { kind: &'static str, name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Join position labels in (row, column) order for user-facing messages.
pub fn join_labels<'a>(positions: impl IntoIterator<Item = &'a RackPosition>) -> String {
    let mut positions: Vec<_> = positions.into_iter().collect();
    positions.sort();
    positions.dedup();
    positions
        .iter()
        .map(|p| p.label())
        .collect::<Vec<_>>()
        .join(", ")
}
