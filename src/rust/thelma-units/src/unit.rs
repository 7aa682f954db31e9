// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Absolute tolerance used when comparing liquid quantities.
///
/// Volumes and concentrations come from spreadsheets and are multiplied by
/// dilution factors, so exact float comparison would reject values that only
/// differ by rounding noise.
pub const TOLERANCE: f64 = 1e-6;

pub(crate) fn round_to_significant_digits(x: f64, n: u32) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        let order = x.abs().log10().floor();
        let scale = 10f64.powf((n as f64) - 1.0 - order);
        (x * scale).round() / scale
    }
}

/// Round `value` up to `decimal_places`, ignoring noise below [`TOLERANCE`].
pub fn round_up(value: f64, decimal_places: i32) -> f64 {
    let scale = 10f64.powi(decimal_places);
    (value * scale - TOLERANCE).ceil() / scale
}

/// Format a number the way layout tags and hash keys expect it: integers
/// without decimals, everything else in its shortest representation.
pub fn format_number(value: f64) -> String {
    let rounded = round_to_significant_digits(value, 12);
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}

macro_rules! quantity {
    ($ident:ident) => {
        /// A liquid quantity represented with unit type.
        ///
        /// # Type Parameter
        /// - `T`: The underlying value (a floating point number)
        /// - `U`: The unit of the value. Typically, it is a zero-sized type.
        #[derive(std::clone::Clone, std::marker::Copy, std::default::Default, core::fmt::Debug)]
        pub struct $ident<U, T = f64> {
            pub(crate) value: T,
            pub(crate) unit: U,
        }

        impl<U, T> $ident<U, T> {
            pub fn value(self) -> T {
                self.value
            }
        }

        impl<U: std::marker::Copy> $ident<U, f64> {
            /// True if the values are equal within [`crate::TOLERANCE`].
            pub fn is_close(self, other: Self) -> bool {
                (self.value - other.value).abs() <= $crate::TOLERANCE
            }

            pub fn is_smaller_than(self, other: Self) -> bool {
                self.value < other.value - $crate::TOLERANCE
            }

            pub fn is_larger_than(self, other: Self) -> bool {
                self.value > other.value + $crate::TOLERANCE
            }

            pub fn round_up(self, decimal_places: i32) -> Self {
                $ident {
                    value: $crate::unit::round_up(self.value, decimal_places),
                    unit: self.unit,
                }
            }
        }

        impl<T: num_traits::Zero + std::cmp::PartialEq, U> PartialEq for $ident<U, T> {
            fn eq(&self, other: &Self) -> bool {
                let a = &self.value;
                let b = &other.value;
                if a.is_zero() && b.is_zero() {
                    true
                } else {
                    a == b
                }
            }
        }

        impl<T: num_traits::Zero + std::cmp::PartialEq, U> Eq for $ident<U, T> {}

        impl<T: num_traits::Zero + std::cmp::PartialOrd, U> PartialOrd for $ident<U, T> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<T: std::cmp::PartialOrd + num_traits::Zero, U> Ord for $ident<U, T> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                if self.value < other.value {
                    std::cmp::Ordering::Less
                } else if self.value > other.value {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            }
        }

        impl<T, U> std::ops::Add for $ident<U, T>
        where
            T: std::ops::Add<Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                $ident {
                    value: self.value + rhs.value,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::Sub for $ident<U, T>
        where
            T: std::ops::Sub<Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                $ident {
                    value: self.value - rhs.value,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::Mul<T> for $ident<U, T>
        where
            T: std::ops::Mul<T, Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn mul(self, rhs: T) -> Self::Output {
                $ident {
                    value: self.value * rhs,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::Div<T> for $ident<U, T>
        where
            T: std::ops::Div<T, Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn div(self, rhs: T) -> Self::Output {
                $ident {
                    value: self.value / rhs,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::fmt::Display for $ident<U, T>
        where
            T: std::fmt::Display
                + std::fmt::Debug
                + num_traits::AsPrimitive<f64>
                + num_traits::Float,
            U: std::fmt::Display,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if f.alternate() {
                    std::fmt::Display::fmt(&self.value, f)?;
                } else {
                    // Pipetting volumes never need more than a handful of digits,
                    // rounding hides the noise of repeated dilution arithmetic.
                    let value = $crate::unit::round_to_significant_digits(self.value.as_(), 10);
                    write!(f, "{}", $crate::unit::format_number(value))?;
                }
                write!(f, " ")?;
                self.unit.fmt(f)
            }
        }

        impl<T, U> From<T> for $ident<U, T>
        where
            T: num_traits::Num,
            U: std::default::Default,
        {
            fn from(value: T) -> Self {
                $ident {
                    value,
                    unit: U::default(),
                }
            }
        }

        impl<U> From<$ident<U, f64>> for f64 {
            fn from(value: $ident<U, f64>) -> Self {
                value.value
            }
        }

        impl<U, T> num_traits::Zero for $ident<U, T>
        where
            T: num_traits::Zero + std::marker::Copy,
            U: std::marker::Copy + std::default::Default,
        {
            fn zero() -> Self {
                Self {
                    value: T::zero(),
                    unit: U::default(),
                }
            }

            fn is_zero(&self) -> bool {
                self.value.is_zero()
            }
        }

        impl<U, T: serde::Serialize> serde::Serialize for $ident<U, T> {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.value.serialize(serializer)
            }
        }

        impl<'de, U: std::default::Default, T: serde::Deserialize<'de>> serde::Deserialize<'de>
            for $ident<U, T>
        {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                T::deserialize(deserializer).map(|value| $ident {
                    value,
                    unit: U::default(),
                })
            }
        }
    };
}

pub(crate) use quantity;
