// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Typed liquid quantities.
//!
//! Volumes are kept in microliters and concentrations in nanomolar, which are
//! the units used on every layout, worklist and robot file of the planner.

pub mod concentration;
mod unit;
pub mod volume;

pub use concentration::{Concentration, Nanomolar, nanomolar};
pub use unit::{TOLERANCE, format_number, round_up};
pub use volume::{Microliters, Volume, microliters};
