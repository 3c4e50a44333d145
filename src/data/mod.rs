//! Value model shared by tuples, expressions and result rows.

pub mod conversions;
pub mod path;
pub mod value;

pub use conversions::{
    to_blob, to_bool, to_duration, to_float, to_int, to_string, to_timestamp, zero_time,
};
pub use path::{Path, PathSegment};
pub use value::{map_from_json, Map, Value, ValueType};
