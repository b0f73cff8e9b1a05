//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Identifiers are assigned by the store and start at 1.
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    /// The identifier could not be parsed as an integer.
    #[error("invalid {field}: {value}")]
    Malformed { field: &'static str, value: String },
}

/// A validated employee identifier.
///
/// Employee IDs are positive integers assigned by the store. The core never
/// invents them; it only threads them through to the produced intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EmployeeId(i64);

impl EmployeeId {
    /// Creates a new ID after validation.
    pub const fn new(id: i64) -> Result<Self, ValidationError> {
        if id <= 0 {
            return Err(ValidationError::NotPositive {
                field: "employee ID",
                value: id,
            });
        }
        Ok(Self(id))
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EmployeeId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmployeeId> for i64 {
    fn from(id: EmployeeId) -> Self {
        id.0
    }
}

impl std::str::FromStr for EmployeeId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty {
                field: "employee ID",
            });
        }
        let value: i64 = trimmed.parse().map_err(|_| ValidationError::Malformed {
            field: "employee ID",
            value: s.to_string(),
        })?;
        Self::new(value)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
