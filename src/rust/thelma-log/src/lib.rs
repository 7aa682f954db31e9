// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Logging front end of the planning crates.
//!
//! All records go to the `log` facade with a target below [`TARGET_PREFIX`]
//! followed by the module path, so a host can route planner output
//! separately from its own.

use std::sync::atomic::{AtomicBool, Ordering};

#[doc(hidden)]
pub use log as _log;

/// Common prefix of all log targets.
pub const TARGET_PREFIX: &str = "thelma";

#[doc(hidden)]
#[macro_export]
macro_rules! __record {
    ($level:ident, $($arg:tt)+) => {
        thelma_log::_log::$level!(target: concat!("thelma::", module_path!()), $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal $(, $($arg:tt)+)?) => {
        thelma_log::__record!(debug, $msg $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! info {
    ($msg:literal $(, $($arg:tt)+)?) => {
        thelma_log::__record!(info, $msg $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal $(, $($arg:tt)+)?) => {
        thelma_log::__record!(warn, $msg $(, $($arg)+)?)
    };
}

/// Log a planning diagnostic at info level if diagnostics are enabled.
///
/// Diagnostics trace intermediate planning decisions, e.g. the sector groups
/// found by the associator or the reservoir chosen for an ISO plate.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal $(, $($arg:tt)+)?) => {
        if thelma_log::is_diagnostics_enabled() {
            thelma_log::__record!(info, $msg $(, $($arg)+)?)
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Toggle planning diagnostics.
///
/// The host installs the concrete logger. Records of the planning crates
/// can be selected by their target, see [`is_planner_target`].
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}

/// True for log targets of the planning crates.
pub fn is_planner_target(target: &str) -> bool {
    target
        .strip_prefix(TARGET_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}
