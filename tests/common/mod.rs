//! Common test utilities for execution plan tests
//!
//! Provides shared helper functions for:
//! - Building logical plans and execution plans
//! - Creating timestamped input tuples
//! - Turning JSON literals into result rows

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use streamql::{
    AliasRelation, DefaultSelectPlan, Emitter, ExecutionPlan, Expression, FunctionMap,
    LogicalPlan, Map, Projection, RangeUnit, Tuple,
};

/// Route tracing output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// `base_time()` plus the given number of milliseconds.
pub fn at_ms(ms: i64) -> DateTime<Utc> {
    base_time() + Duration::milliseconds(ms)
}

pub fn at_secs(secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(secs)
}

pub fn tuple(input: &str, ts: DateTime<Utc>, data: Value) -> Tuple {
    Tuple::from_json(input, ts, data)
}

pub fn rows(values: &[Value]) -> Vec<Map> {
    values.iter().cloned().map(streamql::data::map_from_json).collect()
}

/// `SELECT <projections> FROM sensors [RANGE value unit]` with the given emitter.
pub fn sensor_plan(
    projections: Vec<Projection>,
    unit: RangeUnit,
    value: i64,
    emitter: Emitter,
) -> LogicalPlan {
    LogicalPlan {
        relations: vec![AliasRelation::named("sensors")],
        projections,
        filter: None,
        group_list: vec![],
        having: None,
        unit,
        value,
        emitter,
    }
}

pub fn select_column(path: &str) -> Vec<Projection> {
    vec![Projection::new(Expression::column(path))]
}

pub fn build_plan(lp: &LogicalPlan) -> DefaultSelectPlan {
    init_tracing();
    DefaultSelectPlan::new(lp, &FunctionMap::with_builtins()).expect("Failed to build plan")
}

/// Feed every tuple and collect the emitted rows per arrival.
pub fn run_all(plan: &mut DefaultSelectPlan, tuples: Vec<Tuple>) -> Vec<Vec<Map>> {
    tuples
        .into_iter()
        .map(|t| plan.process(t).expect("Failed to process tuple"))
        .collect()
}
