//! Non-fatal irregularities found while reconstructing shifts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of irregularity. Informational only; never blocks processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyCode {
    /// IN while a previous IN is still open; the later IN replaces it.
    DuplicateIn,
    /// OUT with no open IN.
    OrphanOut,
    /// OUT timestamped before the currently open IN.
    OutBeforeIn,
    /// Direction is neither IN nor OUT.
    UnknownDirection,
    /// The synthesized close instant precedes the open IN.
    AutoCloseInvalid,
}

impl AnomalyCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateIn => "DUPLICATE_IN",
            Self::OrphanOut => "ORPHAN_OUT",
            Self::OutBeforeIn => "OUT_BEFORE_IN",
            Self::UnknownDirection => "UNKNOWN_DIRECTION",
            Self::AutoCloseInvalid => "AUTO_CLOSE_INVALID",
        }
    }
}

impl fmt::Display for AnomalyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A recorded irregularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub code: AnomalyCode,
    #[serde(rename = "ts_utc")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Anomaly {
    pub fn new(code: AnomalyCode, timestamp: DateTime<Utc>, details: impl Into<String>) -> Self {
        Self {
            code,
            timestamp: Some(timestamp),
            details: Some(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn codes_serialize_as_screaming_snake_case() {
        for code in [
            AnomalyCode::DuplicateIn,
            AnomalyCode::OrphanOut,
            AnomalyCode::OutBeforeIn,
            AnomalyCode::UnknownDirection,
            AnomalyCode::AutoCloseInvalid,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn anomaly_json_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let anomaly = Anomaly::new(AnomalyCode::OrphanOut, ts, "OUT without preceding IN; ignored");
        let json = serde_json::to_value(&anomaly).unwrap();

        assert_eq!(json["code"], "ORPHAN_OUT");
        assert_eq!(json["ts_utc"], "2025-03-10T09:00:00Z");
        assert_eq!(json["details"], "OUT without preceding IN; ignored");
    }
}
