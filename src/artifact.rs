//! JSON round-trip for stored coverage results.
//!
//! The storage collaborator (artifact upload/download) only ever sees this
//! shape; it must survive a serialize/deserialize cycle losslessly so a
//! later run can use it as the comparison base. Field order is not
//! significant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::AggregatedCoverage;

/// An aggregated result plus the moment it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub created_at: DateTime<Utc>,
    pub results: AggregatedCoverage,
}

impl StoredReport {
    #[must_use]
    pub fn new(results: AggregatedCoverage) -> Self {
        Self {
            created_at: Utc::now(),
            results,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}
