// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Tag value marking a parameter as explicitly not applicable.
pub const NOT_APPLICABLE_VALUE: &str = "None";

/// An optional, spreadsheet-derived parameter value.
///
/// Authors may leave a cell empty ([`FactorValue::Unset`]) or write `None`
/// ([`FactorValue::NotApplicable`]), e.g. for the concentration of a mock
/// well. Both mean "no value" for calculations but only the latter is a
/// statement by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum FactorValue<T> {
    #[default]
    Unset,
    NotApplicable,
    Set(T),
}

impl<T> FactorValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FactorValue::Set(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, FactorValue::Set(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FactorValue::Unset)
    }
}

impl<T: Copy> FactorValue<T> {
    pub fn get(&self) -> Option<T> {
        self.value().copied()
    }
}

impl<T> From<Option<T>> for FactorValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => FactorValue::Set(value),
            None => FactorValue::Unset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_not_applicable_differ() {
        let unset: FactorValue<f64> = FactorValue::Unset;
        let none: FactorValue<f64> = FactorValue::NotApplicable;
        assert_ne!(unset, none);
        assert_eq!(unset.get(), None);
        assert_eq!(none.get(), None);
        assert!(unset.is_unset());
        assert!(!none.is_unset());
        assert_eq!(FactorValue::from(Some(2.0)).get(), Some(2.0));
    }
}
