// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// A single well or tube slot of a rack.
///
/// Positions are plain values: they know nothing about the layouts or racks
/// they are used in. Ordering is by row, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RackPosition {
    row_index: u16,
    column_index: u16,
}

impl RackPosition {
    pub const fn from_indices(row_index: u16, column_index: u16) -> Self {
        RackPosition {
            row_index,
            column_index,
        }
    }

    /// Parse a label like `B7` or `AA12`. Row letters are case-insensitive.
    pub fn from_label(label: &str) -> Result<Self> {
        let label = label.trim();
        let split = label
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidLabel(label.to_string()))?;
        let (letters, digits) = label.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidLabel(label.to_string()));
        }
        let mut row: u32 = 0;
        for c in letters.chars() {
            row = row
                .saturating_mul(26)
                .saturating_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let column: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidLabel(label.to_string()))?;
        if column == 0 || row > u16::MAX as u32 || column > u16::MAX as u32 {
            return Err(Error::InvalidLabel(label.to_string()));
        }
        Ok(RackPosition::from_indices((row - 1) as u16, (column - 1) as u16))
    }

    pub fn row_index(&self) -> u16 {
        self.row_index
    }

    pub fn column_index(&self) -> u16 {
        self.column_index
    }

    /// Row letters followed by the 1-based column, e.g. `B7`.
    pub fn label(&self) -> String {
        format!("{}{}", row_letters(self.row_index), self.column_index + 1)
    }
}

fn row_letters(row_index: u16) -> String {
    let mut letters = Vec::new();
    let mut n = row_index as u32 + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

impl Display for RackPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RackPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RackPosition::from_label(s)
    }
}

impl Serialize for RackPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for RackPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        RackPosition::from_label(&label).map_err(serde::de::Error::custom)
    }
}
