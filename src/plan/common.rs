//! Projection and filter preparation shared by execution plans.

use crate::data::{Map, Path, Value};
use crate::error::{StreamqlError, StreamqlResult};
use crate::expr::{compile, Evaluator, Expression, FunctionRegistry};

use super::logical::Projection;

/// Where a projection's value goes in the result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Unaliased `*`: merge every top-level field of the value
    Merge,
    /// Assign at a (possibly nested) key path
    Path(Path),
}

/// A projection ready for evaluation.
pub struct CompiledProjection {
    pub target: OutputTarget,
    pub evaluator: Box<dyn Evaluator>,
}

/// Compile the SELECT list and resolve each projection's output target.
///
/// Output names are, in order of preference: the `AS` alias, the last key
/// of a plain column path, or `col_<n>` for the n-th projection.
pub fn prepare_projections(
    projections: &[Projection],
    registry: &dyn FunctionRegistry,
) -> StreamqlResult<Vec<CompiledProjection>> {
    projections
        .iter()
        .enumerate()
        .map(|(i, proj)| {
            let target = output_target(proj, i)?;
            let evaluator: Box<dyn Evaluator> = Box::new(compile(&proj.expr, registry)?);
            Ok(CompiledProjection { target, evaluator })
        })
        .collect()
}

fn output_target(proj: &Projection, index: usize) -> StreamqlResult<OutputTarget> {
    if let Some(alias) = &proj.alias {
        let path = Path::parse(alias)?;
        if !path.is_key_only() {
            return Err(StreamqlError::CompileError(format!(
                "output alias '{}' cannot contain array indexes",
                alias
            )));
        }
        return Ok(OutputTarget::Path(path));
    }

    let name = match &proj.expr {
        Expression::Wildcard => return Ok(OutputTarget::Merge),
        Expression::Column { path } => Path::parse(path)?.last_key().map(str::to_string),
        _ => None,
    };
    let name = name.unwrap_or_else(|| format!("col_{}", index + 1));
    Ok(OutputTarget::Path(Path::parse(&name)?))
}

/// Compile the WHERE clause. `None` means every row passes.
pub fn prepare_filter(
    filter: Option<&Expression>,
    registry: &dyn FunctionRegistry,
) -> StreamqlResult<Option<Box<dyn Evaluator>>> {
    match filter {
        Some(expr) => {
            let evaluator: Box<dyn Evaluator> = Box::new(compile(expr, registry)?);
            Ok(Some(evaluator))
        }
        None => Ok(None),
    }
}

/// Write a projected value into a result row.
pub fn assign_output_value(
    result: &mut Map,
    target: &OutputTarget,
    value: Value,
) -> StreamqlResult<()> {
    match target {
        OutputTarget::Path(path) => path.set(result, value),
        OutputTarget::Merge => match value {
            Value::Map(fields) => {
                result.extend(fields);
                Ok(())
            }
            other => Err(StreamqlError::EvaluationError(format!(
                "cannot merge {} into the result row",
                other.value_type()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::map_from_json;
    use crate::expr::{BinaryOperator, FunctionMap};
    use serde_json::json;

    fn targets(projections: &[Projection]) -> Vec<OutputTarget> {
        prepare_projections(projections, &FunctionMap::with_builtins())
            .unwrap()
            .into_iter()
            .map(|p| p.target)
            .collect()
    }

    fn path(raw: &str) -> OutputTarget {
        OutputTarget::Path(Path::parse(raw).unwrap())
    }

    #[test]
    fn test_output_names() {
        let projections = vec![
            Projection::new(Expression::column("sensor.temp")),
            Projection::aliased(Expression::column("id"), "meta.id"),
            Projection::new(Expression::Wildcard),
            Projection::new(Expression::binary(
                BinaryOperator::Add,
                Expression::column("a"),
                Expression::literal(1),
            )),
            Projection::new(Expression::column("readings[0]")),
            Projection::aliased(Expression::Wildcard, "raw"),
        ];

        assert_eq!(
            targets(&projections),
            vec![
                path("temp"),
                path("meta.id"),
                OutputTarget::Merge,
                path("col_4"),
                path("col_5"),
                path("raw"),
            ]
        );
    }

    #[test]
    fn test_indexed_alias_rejected() {
        let projections = vec![Projection::aliased(Expression::column("a"), "out[0]")];
        assert!(matches!(
            prepare_projections(&projections, &FunctionMap::new()),
            Err(StreamqlError::CompileError(_))
        ));
    }

    #[test]
    fn test_prepare_filter() {
        let registry = FunctionMap::new();
        assert!(prepare_filter(None, &registry).unwrap().is_none());

        let unknown = Expression::call("nope", vec![]);
        assert!(prepare_filter(Some(&unknown), &registry).is_err());
    }

    #[test]
    fn test_assign_merge_and_nested() {
        let mut result = Map::new();
        assign_output_value(
            &mut result,
            &OutputTarget::Merge,
            Value::from(json!({"a": 1, "b": 2})),
        )
        .unwrap();
        assign_output_value(&mut result, &path("b.c"), Value::Int(3)).unwrap();

        assert_eq!(result, map_from_json(json!({"a": 1, "b": {"c": 3}})));

        assert!(assign_output_value(&mut result, &OutputTarget::Merge, Value::Int(1)).is_err());
    }
}
