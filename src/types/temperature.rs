// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature type for readings and setpoints.
//!
//! The device reports degrees Celsius. A value at or below
//! [`MIN_TEMPERATURE`] is the "no reading" sentinel and is never a real
//! measurement.

use std::fmt;

use crate::error::ValueError;

/// Absolute zero in Celsius, used as the "no valid reading" sentinel.
pub const MIN_TEMPERATURE: f32 = -273.0;

/// Returns `true` if a raw value is a real measurement rather than the sentinel.
///
/// # Examples
///
/// ```
/// use tempc_lib::types::is_valid_reading;
///
/// assert!(is_valid_reading(21.5));
/// assert!(!is_valid_reading(-273.0));
/// assert!(!is_valid_reading(f32::NAN));
/// ```
#[must_use]
pub fn is_valid_reading(value: f32) -> bool {
    value.is_finite() && value > MIN_TEMPERATURE
}

/// A temperature in degrees Celsius strictly above absolute zero.
///
/// # Examples
///
/// ```
/// use tempc_lib::types::Temperature;
///
/// let target = Temperature::new(62.5).unwrap();
/// assert_eq!(target.celsius(), 62.5);
///
/// assert!(Temperature::new(-273.0).is_err());
/// assert!(Temperature::new(f32::INFINITY).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f32);

impl Temperature {
    /// Creates a new temperature value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTemperature` if the value is not finite or
    /// is at or below [`MIN_TEMPERATURE`].
    pub fn new(celsius: f32) -> Result<Self, ValueError> {
        if !is_valid_reading(celsius) {
            return Err(ValueError::InvalidTemperature(celsius));
        }
        Ok(Self(celsius))
    }

    /// Returns the value in degrees Celsius.
    #[must_use]
    pub const fn celsius(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} C", self.0)
    }
}

impl TryFrom<f32> for Temperature {
    type Error = ValueError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Temperature> for f32 {
    fn from(value: Temperature) -> Self {
        value.0
    }
}
