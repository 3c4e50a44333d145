//! Field paths into nested rows, e.g. `sensor.readings[0].value`.

use std::fmt;

use super::value::{Map, Value};
use crate::error::{StreamqlError, StreamqlResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A parsed, validated field path.
///
/// Paths are dot-separated keys, each optionally followed by one or more
/// `[n]` array indexes. The first segment is always a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn parse(raw: &str) -> StreamqlResult<Self> {
        let invalid = || StreamqlError::CompileError(format!("invalid field path '{}'", raw));

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if key.is_empty() || key.contains(']') {
                return Err(invalid());
            }
            segments.push(PathSegment::Key(key.to_string()));

            while !rest.is_empty() {
                let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
                let end = inner.find(']').ok_or_else(invalid)?;
                let index = inner[..end].parse::<usize>().map_err(|_| invalid())?;
                segments.push(PathSegment::Index(index));
                rest = &inner[end + 1..];
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The last key of the path if the path does not end in an index.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// True if the path can be used as an assignment target.
    pub fn is_key_only(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, PathSegment::Key(_)))
    }

    fn not_found(&self) -> StreamqlError {
        StreamqlError::EvaluationError(format!("field '{}' not found", self.raw))
    }

    /// Look up the value at this path. Missing keys, out-of-range indexes
    /// and descending into a scalar are all reported as a missing field.
    pub fn get<'a>(&self, row: &'a Map) -> StreamqlResult<&'a Value> {
        let (first, rest) = self
            .segments
            .split_first()
            .ok_or_else(|| self.not_found())?;

        let mut current = match first {
            PathSegment::Key(k) => row.get(k),
            PathSegment::Index(_) => None,
        }
        .ok_or_else(|| self.not_found())?;

        for segment in rest {
            current = match (segment, current) {
                (PathSegment::Key(k), Value::Map(m)) => m.get(k),
                (PathSegment::Index(i), Value::Array(a)) => a.get(*i),
                _ => None,
            }
            .ok_or_else(|| self.not_found())?;
        }

        Ok(current)
    }

    /// Assign `value` at this path, creating intermediate maps as needed.
    /// Intermediate values that are not maps are overwritten.
    pub fn set(&self, row: &mut Map, value: Value) -> StreamqlResult<()> {
        let mut keys = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) => keys.push(k.as_str()),
                PathSegment::Index(_) => {
                    return Err(StreamqlError::EvaluationError(format!(
                        "cannot assign to indexed path '{}'",
                        self.raw
                    )))
                }
            }
        }
        let (last, parents) = keys.split_last().ok_or_else(|| self.not_found())?;

        let mut current = row;
        for key in parents {
            let slot = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Map(Map::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(Map::new());
            }
            current = match slot {
                Value::Map(m) => m,
                _ => return Err(self.not_found()),
            };
        }
        current.insert(last.to_string(), value);
        Ok(())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
