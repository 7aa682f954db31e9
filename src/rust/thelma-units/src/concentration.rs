// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use crate::unit::quantity;

quantity!(Concentration);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Nanomolar;

impl Display for Nanomolar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "nM")
    }
}

/// Create a concentration in nanomolar.
pub const fn nanomolar(value: f64) -> Concentration<Nanomolar> {
    Concentration {
        value,
        unit: Nanomolar,
    }
}

impl Concentration<Nanomolar> {
    /// Concentration in molar, the unit used by the entity store.
    pub fn in_molar(self) -> f64 {
        self.value / 1e9
    }

    pub fn from_molar(molar: f64) -> Self {
        nanomolar(molar * 1e9)
    }

    /// The factor by which `self` has to be diluted to reach `target`.
    pub fn dilution_factor_to(self, target: Self) -> f64 {
        self.value / target.value
    }
}
