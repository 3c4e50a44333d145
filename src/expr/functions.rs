//! Function lookup for expression compilation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{to_blob, to_duration, to_float, to_int, to_string, to_timestamp, Value};
use crate::error::{StreamqlError, StreamqlResult};

/// A scalar function callable from an expression.
pub trait Function: Send + Sync {
    fn call(&self, args: &[Value]) -> StreamqlResult<Value>;

    /// Number of arguments the function takes, `None` if variadic.
    fn arity(&self) -> Option<usize> {
        None
    }
}

/// Resolves function names at compile time.
pub trait FunctionRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Function>>;
}

struct ClosureFunction<F> {
    arity: Option<usize>,
    body: F,
}

impl<F> Function for ClosureFunction<F>
where
    F: Fn(&[Value]) -> StreamqlResult<Value> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> StreamqlResult<Value> {
        (self.body)(args)
    }

    fn arity(&self) -> Option<usize> {
        self.arity
    }
}

/// Registry backed by a map of lowercase names.
#[derive(Default, Clone)]
pub struct FunctionMap {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionMap {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the builtin scalar functions.
    pub fn with_builtins() -> Self {
        let mut map = Self::new();
        map.register_fn("abs", Some(1), builtin_abs);
        map.register_fn("lower", Some(1), |args| {
            map_string(first_arg("lower", args)?, |s| s.to_lowercase())
        });
        map.register_fn("upper", Some(1), |args| {
            map_string(first_arg("upper", args)?, |s| s.to_uppercase())
        });
        map.register_fn("coalesce", None, |args| {
            Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null))
        });
        map.register_fn("len", Some(1), builtin_len);
        map.register_fn("to_int", Some(1), |args| {
            to_int(first_arg("to_int", args)?).map(Value::Int)
        });
        map.register_fn("to_float", Some(1), |args| {
            to_float(first_arg("to_float", args)?).map(Value::Float)
        });
        map.register_fn("to_string", Some(1), |args| {
            to_string(first_arg("to_string", args)?).map(Value::String)
        });
        map.register_fn("to_blob", Some(1), |args| {
            to_blob(first_arg("to_blob", args)?).map(Value::Blob)
        });
        map.register_fn("to_timestamp", Some(1), |args| {
            to_timestamp(first_arg("to_timestamp", args)?).map(Value::Timestamp)
        });
        // there is no duration value type, so durations surface as seconds
        map.register_fn("to_duration", Some(1), |args| {
            let d = to_duration(first_arg("to_duration", args)?)?;
            Ok(Value::Float(match d.num_nanoseconds() {
                Some(nanos) => nanos as f64 / 1e9,
                None => d.num_milliseconds() as f64 / 1e3,
            }))
        });
        map
    }

    pub fn register(&mut self, name: &str, function: Arc<dyn Function>) {
        self.functions.insert(name.to_lowercase(), function);
    }

    /// Register a closure. When `arity` is set, the compiler guarantees
    /// the closure receives exactly that many arguments.
    pub fn register_fn<F>(&mut self, name: &str, arity: Option<usize>, body: F)
    where
        F: Fn(&[Value]) -> StreamqlResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(ClosureFunction { arity, body }));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }
}

impl FunctionRegistry for FunctionMap {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(&name.to_lowercase()).cloned()
    }
}

/// The first argument, or an evaluation error when the function was called
/// without arguments.
fn first_arg<'a>(name: &str, args: &'a [Value]) -> StreamqlResult<&'a Value> {
    args.first().ok_or_else(|| {
        StreamqlError::EvaluationError(format!("{} expects 1 argument but got none", name))
    })
}

fn map_string(value: &Value, f: impl Fn(&str) -> String) -> StreamqlResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(StreamqlError::EvaluationError(format!(
            "expected string argument but got {}",
            other.value_type()
        ))),
    }
}

fn builtin_abs(args: &[Value]) -> StreamqlResult<Value> {
    match first_arg("abs", args)? {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| StreamqlError::EvaluationError(format!("abs({}) overflows", i))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(StreamqlError::EvaluationError(format!(
            "abs expects a number but got {}",
            other.value_type()
        ))),
    }
}

fn builtin_len(args: &[Value]) -> StreamqlResult<Value> {
    let len = match first_arg("len", args)? {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s.chars().count(),
        Value::Blob(b) => b.len(),
        Value::Array(a) => a.len(),
        Value::Map(m) => m.len(),
        other => {
            return Err(StreamqlError::EvaluationError(format!(
                "len expects a string, blob, array or map but got {}",
                other.value_type()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn call(map: &FunctionMap, name: &str, args: &[Value]) -> StreamqlResult<Value> {
        map.lookup(name).expect("function not registered").call(args)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let map = FunctionMap::with_builtins();
        assert!(map.lookup("UPPER").is_some());
        assert!(map.contains("Coalesce"));
        assert!(map.lookup("sum").is_none());
    }

    #[test]
    fn test_builtins() {
        let map = FunctionMap::with_builtins();
        assert_eq!(call(&map, "abs", &[Value::Int(-3)]).unwrap(), Value::Int(3));
        assert!(call(&map, "abs", &[Value::Int(i64::MIN)]).is_err());
        assert_eq!(
            call(&map, "upper", &[Value::from("abc")]).unwrap(),
            Value::from("ABC")
        );
        assert_eq!(call(&map, "lower", &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            call(&map, "coalesce", &[Value::Null, Value::Int(2), Value::Int(3)]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(call(&map, "coalesce", &[]).unwrap(), Value::Null);
        assert_eq!(
            call(&map, "len", &[Value::from("héllo")]).unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            call(&map, "to_int", &[Value::from("0x10")]).unwrap(),
            Value::Int(16)
        );
        assert_eq!(
            call(&map, "to_string", &[Value::Float(1.5)]).unwrap(),
            Value::from("1.5")
        );
    }

    #[test]
    fn test_conversion_builtins() {
        let map = FunctionMap::with_builtins();
        assert_eq!(
            call(&map, "to_blob", &[Value::from("YWJj")]).unwrap(),
            Value::Blob(b"abc".to_vec())
        );
        assert_eq!(
            call(&map, "to_timestamp", &[Value::Int(60)]).unwrap(),
            Value::Timestamp(Utc.timestamp_opt(60, 0).unwrap())
        );
        assert_eq!(
            call(&map, "to_duration", &[Value::from("1m30s")]).unwrap(),
            Value::Float(90.0)
        );
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        let map = FunctionMap::with_builtins();
        for name in [
            "abs",
            "len",
            "lower",
            "upper",
            "to_int",
            "to_float",
            "to_string",
            "to_blob",
            "to_timestamp",
            "to_duration",
        ] {
            assert!(
                matches!(call(&map, name, &[]), Err(StreamqlError::EvaluationError(_))),
                "{} accepted an empty argument list",
                name
            );
        }
    }

    #[test]
    fn test_register_custom_function() {
        let mut map = FunctionMap::new();
        map.register_fn("twice", Some(1), |args| match &args[0] {
            Value::Int(i) => Ok(Value::Int(i * 2)),
            _ => Ok(Value::Null),
        });
        assert!(map.contains("twice"));
        assert_eq!(map.lookup("twice").unwrap().arity(), Some(1));
        assert_eq!(call(&map, "TWICE", &[Value::Int(4)]).unwrap(), Value::Int(8));
    }
}
