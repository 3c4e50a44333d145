//! Compiled expressions and their evaluation.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::functions::{Function, FunctionRegistry};
use super::{BinaryOperator, Expression, UnaryOperator};
use crate::data::{to_bool, Map, Path, Value};
use crate::error::{StreamqlError, StreamqlResult};

/// Evaluate a compiled expression against a row of named values.
///
/// Implementations must be pure with respect to the row: evaluating the
/// same row twice yields the same value.
pub trait Evaluator: Send + Sync {
    fn eval(&self, row: &Map) -> StreamqlResult<Value>;
}

/// An expression with its paths parsed and its functions resolved.
#[derive(Clone)]
pub enum CompiledExpr {
    Literal(Value),
    Column(Path),
    Wildcard,
    Binary {
        op: BinaryOperator,
        left: Box<CompiledExpr>,
        right: Box<CompiledExpr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<CompiledExpr>,
    },
    Call {
        name: String,
        function: Arc<dyn Function>,
        args: Vec<CompiledExpr>,
    },
}

impl fmt::Debug for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledExpr::Literal(v) => write!(f, "Literal({})", v),
            CompiledExpr::Column(p) => write!(f, "Column({})", p),
            CompiledExpr::Wildcard => f.write_str("Wildcard"),
            CompiledExpr::Binary { op, left, right } => {
                write!(f, "({:?} {} {:?})", left, op.symbol(), right)
            }
            CompiledExpr::Unary { op, operand } => write!(f, "{:?}({:?})", op, operand),
            CompiledExpr::Call { name, args, .. } => write!(f, "{}({:?})", name, args),
        }
    }
}

/// Compile an expression tree.
///
/// Fails with a compile error on malformed paths, unknown functions and
/// calls with the wrong number of arguments.
pub fn compile(expr: &Expression, registry: &dyn FunctionRegistry) -> StreamqlResult<CompiledExpr> {
    Ok(match expr {
        Expression::Literal { value } => CompiledExpr::Literal(value.clone()),
        Expression::Column { path } => CompiledExpr::Column(Path::parse(path)?),
        Expression::Wildcard => CompiledExpr::Wildcard,
        Expression::Binary { op, left, right } => CompiledExpr::Binary {
            op: *op,
            left: Box::new(compile(left, registry)?),
            right: Box::new(compile(right, registry)?),
        },
        Expression::Unary { op, operand } => CompiledExpr::Unary {
            op: *op,
            operand: Box::new(compile(operand, registry)?),
        },
        Expression::Function { name, args } => {
            let function = registry.lookup(name).ok_or_else(|| {
                StreamqlError::CompileError(format!("function '{}' is not registered", name))
            })?;
            if let Some(arity) = function.arity() {
                if arity != args.len() {
                    return Err(StreamqlError::CompileError(format!(
                        "function '{}' takes {} argument(s) but {} were given",
                        name,
                        arity,
                        args.len()
                    )));
                }
            }
            let args = args
                .iter()
                .map(|arg| compile(arg, registry))
                .collect::<StreamqlResult<Vec<_>>>()?;
            CompiledExpr::Call {
                name: name.clone(),
                function,
                args,
            }
        }
    })
}

impl Evaluator for CompiledExpr {
    fn eval(&self, row: &Map) -> StreamqlResult<Value> {
        match self {
            CompiledExpr::Literal(v) => Ok(v.clone()),
            CompiledExpr::Column(path) => path.get(row).cloned(),
            CompiledExpr::Wildcard => Ok(Value::Map(row.clone())),
            CompiledExpr::Binary { op, left, right } => match op {
                BinaryOperator::And => eval_and(left, right, row),
                BinaryOperator::Or => eval_or(left, right, row),
                _ => {
                    let l = left.eval(row)?;
                    let r = right.eval(row)?;
                    evaluate_binary_op(&l, *op, &r)
                }
            },
            CompiledExpr::Unary { op, operand } => evaluate_unary_op(*op, &operand.eval(row)?),
            CompiledExpr::Call { function, args, .. } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(row))
                    .collect::<StreamqlResult<Vec<_>>>()?;
                function.call(&values)
            }
        }
    }
}

// SQL three-valued logic: FALSE wins over NULL for AND, TRUE wins for OR.
fn is_false(v: &Value) -> StreamqlResult<bool> {
    Ok(!v.is_null() && !to_bool(v)?)
}

fn is_true(v: &Value) -> StreamqlResult<bool> {
    Ok(!v.is_null() && to_bool(v)?)
}

fn logical_and(l: &Value, r: &Value) -> StreamqlResult<Value> {
    if is_false(l)? || is_false(r)? {
        Ok(Value::Bool(false))
    } else if l.is_null() || r.is_null() {
        Ok(Value::Null)
    } else {
        Ok(Value::Bool(true))
    }
}

fn logical_or(l: &Value, r: &Value) -> StreamqlResult<Value> {
    if is_true(l)? || is_true(r)? {
        Ok(Value::Bool(true))
    } else if l.is_null() || r.is_null() {
        Ok(Value::Null)
    } else {
        Ok(Value::Bool(false))
    }
}

fn eval_and(left: &CompiledExpr, right: &CompiledExpr, row: &Map) -> StreamqlResult<Value> {
    let l = left.eval(row)?;
    if is_false(&l)? {
        return Ok(Value::Bool(false));
    }
    logical_and(&l, &right.eval(row)?)
}

fn eval_or(left: &CompiledExpr, right: &CompiledExpr, row: &Map) -> StreamqlResult<Value> {
    let l = left.eval(row)?;
    if is_true(&l)? {
        return Ok(Value::Bool(true));
    }
    logical_or(&l, &right.eval(row)?)
}

fn type_mismatch(l: &Value, op: BinaryOperator, r: &Value) -> StreamqlError {
    StreamqlError::EvaluationError(format!(
        "cannot apply {} to {} and {}",
        op.symbol(),
        l.value_type(),
        r.value_type()
    ))
}

/// Equality with Int/Float promotion; everything else compares structurally.
fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
        (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
        _ => l == r,
    }
}

/// Ordering for comparison operators. `Ok(None)` means the operands are
/// unordered (NaN involved).
fn compare_values(l: &Value, op: BinaryOperator, r: &Value) -> StreamqlResult<Option<Ordering>> {
    Ok(match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => return Err(type_mismatch(l, op, r)),
    })
}

fn arithmetic(l: &Value, op: BinaryOperator, r: &Value) -> StreamqlResult<Value> {
    let overflow = || {
        StreamqlError::EvaluationError(format!("integer overflow in {} {} {}", l, op.symbol(), r))
    };
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            if matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) && *b == 0 {
                return Err(StreamqlError::EvaluationError(
                    "division by zero".to_string(),
                ));
            }
            let result = match op {
                BinaryOperator::Add => a.checked_add(*b),
                BinaryOperator::Subtract => a.checked_sub(*b),
                BinaryOperator::Multiply => a.checked_mul(*b),
                BinaryOperator::Divide => a.checked_div(*b),
                BinaryOperator::Modulo => a.checked_rem(*b),
                _ => return Err(type_mismatch(l, op, r)),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_f64(l);
            let b = as_f64(r);
            Ok(Value::Float(match op {
                BinaryOperator::Add => a + b,
                BinaryOperator::Subtract => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide => a / b,
                BinaryOperator::Modulo => a % b,
                _ => return Err(type_mismatch(l, op, r)),
            }))
        }
        _ => Err(type_mismatch(l, op, r)),
    }
}

#[inline]
fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Translate a SQL LIKE pattern (`%`, `_`) into an anchored regex.
fn like_to_regex(pattern: &str) -> StreamqlResult<Regex> {
    // `%` and `_` match newlines too
    let mut regex_pattern = String::with_capacity(pattern.len() + 6);
    regex_pattern.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            _ => regex_pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex_pattern.push('$');
    Regex::new(&regex_pattern)
        .map_err(|e| StreamqlError::EvaluationError(format!("invalid LIKE pattern: {}", e)))
}

/// Evaluate a binary operator on two already evaluated operands.
///
/// NULL operands propagate to a NULL result. `AND`/`OR` are accepted here
/// too, but without short-circuiting.
pub fn evaluate_binary_op(l: &Value, op: BinaryOperator, r: &Value) -> StreamqlResult<Value> {
    match op {
        BinaryOperator::And => logical_and(l, r),
        BinaryOperator::Or => logical_or(l, r),
        _ if l.is_null() || r.is_null() => Ok(Value::Null),
        BinaryOperator::Equal => Ok(Value::Bool(values_equal(l, r))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!values_equal(l, r))),
        BinaryOperator::LessThan => Ok(Value::Bool(
            compare_values(l, op, r)? == Some(Ordering::Less),
        )),
        BinaryOperator::LessThanOrEqual => Ok(Value::Bool(matches!(
            compare_values(l, op, r)?,
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOperator::GreaterThan => Ok(Value::Bool(
            compare_values(l, op, r)? == Some(Ordering::Greater),
        )),
        BinaryOperator::GreaterThanOrEqual => Ok(Value::Bool(matches!(
            compare_values(l, op, r)?,
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(l, op, r),
        BinaryOperator::Concat => match (l, r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(type_mismatch(l, op, r)),
        },
        BinaryOperator::Like => match (l, r) {
            (Value::String(s), Value::String(pattern)) => {
                Ok(Value::Bool(like_to_regex(pattern)?.is_match(s)))
            }
            _ => Err(type_mismatch(l, op, r)),
        },
    }
}

pub fn evaluate_unary_op(op: UnaryOperator, v: &Value) -> StreamqlResult<Value> {
    match op {
        UnaryOperator::IsNull => Ok(Value::Bool(v.is_null())),
        UnaryOperator::IsNotNull => Ok(Value::Bool(!v.is_null())),
        UnaryOperator::Not => match v {
            Value::Null => Ok(Value::Null),
            other => Ok(Value::Bool(!to_bool(other)?)),
        },
        UnaryOperator::Negate => match v {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(|| {
                StreamqlError::EvaluationError(format!("integer overflow in -{}", i))
            }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(StreamqlError::EvaluationError(format!(
                "cannot negate {}",
                other.value_type()
            ))),
        },
    }
}
