//! The unit of streaming input.

use chrono::{DateTime, Utc};

use crate::data::{map_from_json, Map};

/// One record delivered to a running query.
///
/// `Clone` is a deep copy: the cloned row shares no storage with the
/// original, so a copy placed in one window buffer can never observe
/// changes made to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    /// Event time, used for time-based windows
    pub timestamp: DateTime<Utc>,
    /// The named-value payload expressions are evaluated against
    pub data: Map,
    /// Name of the relation (stream) this tuple arrived from
    pub input_name: String,
}

impl Tuple {
    pub fn new(input_name: impl Into<String>, timestamp: DateTime<Utc>, data: Map) -> Self {
        Self {
            timestamp,
            data,
            input_name: input_name.into(),
        }
    }

    /// Build a tuple from a JSON object payload.
    pub fn from_json(
        input_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        data: serde_json::Value,
    ) -> Self {
        Self::new(input_name, timestamp, map_from_json(data))
    }
}
