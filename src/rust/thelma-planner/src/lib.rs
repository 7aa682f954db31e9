// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Experiment planning: robot support, well association and worklist
//! generation for transfection experiments.

mod error;
pub mod generators;
pub mod planner;
pub mod robot_support;
pub mod settings;
pub mod well_associator;
pub mod worklist;

pub use error::{Error, Result};
pub use generators::{GeneratedSeries, SeriesGenerator, WorklistRole};
pub use planner::{ExperimentPlan, ExperimentPlanner};
pub use robot_support::{LibraryParameters, RobotSupport, RobotSupportDeterminer};
pub use settings::{PlannerSettings, SanitizationChange};
pub use well_associator::{WellAssociation, WellAssociator};
pub use worklist::{PlannedLiquidTransfer, PlannedWorklist, TransferType, WorklistSeries};
