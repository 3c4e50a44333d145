//! The logical description of a continuous SELECT query.
//!
//! A `LogicalPlan` is produced by the query front end (or loaded from a
//! config file, see [`crate::config`]) and handed to an execution plan
//! constructor. It is assumed to be syntactically valid.

use serde::{Deserialize, Serialize};

use crate::expr::Expression;

/// An input relation: the stream `name` tuples are tagged with, bound to
/// the `alias` its window buffer is stored under.
///
/// `FROM a AS left, a AS right` yields two relations with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRelation {
    pub name: String,
    pub alias: String,
}

impl AliasRelation {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// A relation whose alias is its own name (`FROM a`).
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
        }
    }
}

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub expr: Expression,
    /// Output path from `AS`, e.g. `a.b.c`
    #[serde(default)]
    pub alias: Option<String>,
}

impl Projection {
    pub fn new(expr: Expression) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expression, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Unit of the window size: `[RANGE n TUPLES]` or `[RANGE n SECONDS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeUnit {
    Tuples,
    Seconds,
}

/// Which part of the result delta is emitted after each arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emitter {
    /// Every row of the current result
    #[serde(alias = "all")]
    Rstream,
    /// Rows not present in the previous result
    #[serde(alias = "only_new")]
    Istream,
    /// Rows of the previous result no longer present
    #[serde(alias = "only_removed")]
    Dstream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    pub relations: Vec<AliasRelation>,
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub filter: Option<Expression>,
    #[serde(default)]
    pub group_list: Vec<Expression>,
    #[serde(default)]
    pub having: Option<Expression>,
    /// Window unit
    pub unit: RangeUnit,
    /// Window size: a tuple count or a number of seconds
    pub value: i64,
    pub emitter: Emitter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal_plan() {
        let plan: LogicalPlan = serde_json::from_value(json!({
            "relations": [{"name": "sensors", "alias": "s"}],
            "projections": [{"expr": {"kind": "wildcard"}}],
            "unit": "tuples",
            "value": 3,
            "emitter": "istream"
        }))
        .unwrap();

        assert_eq!(plan.relations, vec![AliasRelation::new("sensors", "s")]);
        assert_eq!(plan.projections, vec![Projection::new(Expression::Wildcard)]);
        assert!(plan.filter.is_none());
        assert!(plan.group_list.is_empty());
        assert!(plan.having.is_none());
        assert_eq!(plan.unit, RangeUnit::Tuples);
        assert_eq!(plan.emitter, Emitter::Istream);
    }

    #[test]
    fn test_emitter_aliases() {
        let e: Emitter = serde_json::from_value(json!("only_removed")).unwrap();
        assert_eq!(e, Emitter::Dstream);
        let e: Emitter = serde_json::from_value(json!("all")).unwrap();
        assert_eq!(e, Emitter::Rstream);
    }

    #[test]
    fn test_named_relation() {
        let rel = AliasRelation::named("events");
        assert_eq!(rel.name, "events");
        assert_eq!(rel.alias, "events");
    }
}
