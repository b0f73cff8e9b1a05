//! Admitted attendance events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::types::EmployeeId;

/// An event suitable for shift reconstruction.
///
/// This trait allows reconstruction to work with different event representations
/// (e.g., `StoredEvent` from wt-db, or test fixtures). The direction is exposed
/// raw so that rows with unrecognized values surface as anomalies instead of
/// being dropped before they reach the reconstructor.
pub trait AttendanceRecord {
    /// Returns when the badge was scanned.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Returns the raw direction string (e.g., "IN", "OUT").
    fn direction(&self) -> &str;

    /// Store-assigned identifier, if this representation has one.
    fn event_id(&self) -> Option<i64> {
        None
    }
}

/// A single IN/OUT swipe for one employee, immutable once admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub employee_id: EmployeeId,
    pub direction: Direction,
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl AttendanceEvent {
    pub const fn new(
        employee_id: EmployeeId,
        direction: Direction,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            employee_id,
            direction,
            timestamp,
        }
    }
}

impl AttendanceRecord for AttendanceEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn direction(&self) -> &str {
        self.direction.as_str()
    }
}
