// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use crate::unit::quantity;

quantity!(Volume);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Microliters;

impl Display for Microliters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ul")
    }
}

/// Create a volume in microliters.
pub const fn microliters(value: f64) -> Volume<Microliters> {
    Volume {
        value,
        unit: Microliters,
    }
}

impl Volume<Microliters> {
    /// Volume in liters, the unit used by the entity store.
    pub fn in_liters(self) -> f64 {
        self.value / 1e6
    }

    pub fn from_liters(liters: f64) -> Self {
        microliters(liters * 1e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", microliters(11.2)), "11.2 ul");
        assert_eq!(format!("{}", microliters(5.0)), "5 ul");
        assert_eq!(format!("{}", microliters(0.1) + microliters(0.2)), "0.3 ul");
    }

    #[test]
    fn test_tolerant_comparison() {
        let minimum = microliters(2.0);
        assert!(!microliters(2.0).is_smaller_than(minimum));
        assert!(!microliters(2.0 - 1e-9).is_smaller_than(minimum));
        assert!(microliters(1.99).is_smaller_than(minimum));
        assert!(microliters(2.01).is_larger_than(minimum));
        assert!(microliters(0.1 + 0.2).is_close(microliters(0.3)));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(microliters(2.5) * 4.0, microliters(10.0));
        assert_eq!(microliters(10.0) / 4.0, microliters(2.5));
        assert_eq!(microliters(10.0) - microliters(2.5), microliters(7.5));
        assert!(microliters(1.0) < microliters(2.0));
        assert_eq!(microliters(11.21).round_up(1), microliters(11.3));
    }

    #[test]
    fn test_liters() {
        assert_eq!(microliters(5.0).in_liters(), 5e-6);
        assert!(Volume::from_liters(5e-6).is_close(microliters(5.0)));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&microliters(12.5)).unwrap();
        assert_eq!(json, "12.5");
        let volume: Volume<Microliters> = serde_json::from_str("12.5").unwrap();
        assert_eq!(volume, microliters(12.5));
    }
}
