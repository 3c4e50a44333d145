//! streamql - incremental windowed SELECT execution for continuous queries.
//!
//! Continuous queries run indefinitely over unbounded tuple streams. On
//! every arriving tuple the execution plan updates a sliding window of
//! buffered input, re-runs the query over the window and emits only the
//! part of the result selected by the query's emitter.
//!
//! # Main Components
//!
//! - **Data**: the `Value` model, lenient conversions and field paths
//! - **Expressions**: expression trees, compilation and evaluation
//! - **Plans**: window buffers, delta computation and the default SELECT plan
//! - **Config**: loading logical plans from TOML or JSON
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use serde_json::json;
//! use streamql::{
//!     AliasRelation, DefaultSelectPlan, Emitter, ExecutionPlan, Expression, FunctionMap,
//!     LogicalPlan, Projection, RangeUnit, Tuple,
//! };
//!
//! let lp = LogicalPlan {
//!     relations: vec![AliasRelation::named("sensors")],
//!     projections: vec![Projection::new(Expression::column("temp"))],
//!     filter: None,
//!     group_list: vec![],
//!     having: None,
//!     unit: RangeUnit::Tuples,
//!     value: 2,
//!     emitter: Emitter::Istream,
//! };
//! assert!(DefaultSelectPlan::can_build(&lp));
//!
//! let mut plan = DefaultSelectPlan::new(&lp, &FunctionMap::with_builtins()).unwrap();
//! let t = Utc.timestamp_opt(0, 0).unwrap();
//! let rows = plan
//!     .process(Tuple::from_json("sensors", t, json!({"temp": 21})))
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod expr;
pub mod plan;
pub mod tuple;

// Re-export main types for convenience
pub use config::{load_plan, plan_from_json_str, plan_from_toml_str};
pub use data::{Map, Path, Value, ValueType};
pub use error::{StreamqlError, StreamqlResult};
pub use expr::{
    compile, BinaryOperator, CompiledExpr, Evaluator, Expression, Function, FunctionMap,
    FunctionRegistry, UnaryOperator,
};
pub use plan::{
    compute_delta, AliasRelation, DefaultSelectPlan, Emitter, ExecutionPlan, LogicalPlan,
    Projection, RangeUnit, WindowBound, WindowBuffers,
};
pub use tuple::Tuple;
