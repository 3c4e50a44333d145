//! Execution plans for continuous queries.
//!
//! The surrounding dataflow runtime feeds every arriving tuple to
//! [`ExecutionPlan::process`] and forwards the returned rows downstream.

pub mod common;
pub mod default_select;
pub mod delta;
pub mod logical;
pub mod window;

pub use default_select::DefaultSelectPlan;
pub use delta::compute_delta;
pub use logical::{AliasRelation, Emitter, LogicalPlan, Projection, RangeUnit};
pub use window::{WindowBound, WindowBuffers};

use crate::data::Map;
use crate::error::StreamqlResult;
use crate::tuple::Tuple;

/// A running continuous query.
///
/// Calls must be serialized per instance; the plan keeps mutable window
/// and result state between calls and does no internal locking.
pub trait ExecutionPlan: Send {
    /// Feed one arriving tuple and return the rows to emit for it.
    ///
    /// An error is fatal for the query. Window state already updated by
    /// the call is not rolled back.
    fn process(&mut self, tuple: Tuple) -> StreamqlResult<Vec<Map>>;
}
