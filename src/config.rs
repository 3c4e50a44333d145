//! Loading logical plans from configuration files.
//!
//! A plan can be written as TOML or JSON; both map one-to-one onto
//! [`LogicalPlan`]:
//!
//! ```toml
//! unit = "tuples"
//! value = 5
//! emitter = "istream"
//!
//! [[relations]]
//! name = "sensors"
//! alias = "s"
//!
//! [[projections]]
//! alias = "temperature"
//! expr = { kind = "column", path = "temp" }
//!
//! [filter]
//! kind = "binary"
//! op = "greater_than"
//! left = { kind = "column", path = "temp" }
//! right = { kind = "literal", value = 20 }
//! ```

use std::path::Path;

use crate::error::{StreamqlError, StreamqlResult};
use crate::plan::LogicalPlan;

pub fn plan_from_toml_str(s: &str) -> StreamqlResult<LogicalPlan> {
    Ok(toml::from_str(s)?)
}

pub fn plan_from_json_str(s: &str) -> StreamqlResult<LogicalPlan> {
    Ok(serde_json::from_str(s)?)
}

/// Load a plan from a `.toml` or `.json` file.
pub fn load_plan(path: impl AsRef<Path>) -> StreamqlResult<LogicalPlan> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let plan = match extension.as_deref() {
        Some("toml") => plan_from_toml_str(&std::fs::read_to_string(path)?)?,
        Some("json") => plan_from_json_str(&std::fs::read_to_string(path)?)?,
        _ => {
            return Err(StreamqlError::ConfigError(format!(
                "unsupported plan file '{}' (expected .toml or .json)",
                path.display()
            )))
        }
    };

    tracing::debug!(
        "Loaded plan from '{}': {} relation(s), {} projection(s)",
        path.display(),
        plan.relations.len(),
        plan.projections.len()
    );
    Ok(plan)
}
