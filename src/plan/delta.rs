//! Relation-to-stream conversion: which result rows to emit.

use crate::data::Map;

use super::logical::Emitter;

/// Compare this run's results with the previous run's and select the rows
/// to emit:
///
/// - `Rstream`: all of `current`
/// - `Istream`: rows of `current` without a deeply equal row in `previous`
/// - `Dstream`: rows of `previous` without a deeply equal row in `current`
///
/// Multiplicities are not tracked. A row that appears twice in `current`
/// and once in `previous` is not new, so neither copy is emitted.
pub fn compute_delta(current: &[Map], previous: &[Map], emitter: Emitter) -> Vec<Map> {
    match emitter {
        Emitter::Rstream => current.to_vec(),
        Emitter::Istream => difference(current, previous),
        Emitter::Dstream => difference(previous, current),
    }
}

/// Rows of `left` that have no structurally equal row in `right`, in the
/// order of `left`.
fn difference(left: &[Map], right: &[Map]) -> Vec<Map> {
    left.iter()
        .filter(|row| !right.iter().any(|other| other == *row))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::map_from_json;
    use serde_json::json;

    fn rows(values: &[serde_json::Value]) -> Vec<Map> {
        values.iter().cloned().map(map_from_json).collect()
    }

    #[test]
    fn test_rstream_emits_current_in_order() {
        let previous = rows(&[json!({"a": 1})]);
        let current = rows(&[json!({"a": 1}), json!({"a": 2})]);
        assert_eq!(compute_delta(&current, &previous, Emitter::Rstream), current);
    }

    #[test]
    fn test_istream_emits_new_rows() {
        let previous = rows(&[json!({"a": 1})]);
        let current = rows(&[json!({"a": 1}), json!({"a": 2})]);
        assert_eq!(
            compute_delta(&current, &previous, Emitter::Istream),
            rows(&[json!({"a": 2})])
        );
        assert!(compute_delta(&current, &previous, Emitter::Dstream).is_empty());
    }

    #[test]
    fn test_dstream_emits_removed_rows() {
        let previous = rows(&[json!({"a": 1}), json!({"a": 2})]);
        let current = rows(&[json!({"a": 2})]);
        assert_eq!(
            compute_delta(&current, &previous, Emitter::Dstream),
            rows(&[json!({"a": 1})])
        );
    }

    #[test]
    fn test_duplicates_are_not_counted() {
        let previous = rows(&[json!({"a": 1})]);
        let current = rows(&[json!({"a": 1}), json!({"a": 1})]);
        assert!(compute_delta(&current, &previous, Emitter::Istream).is_empty());
        assert!(compute_delta(&previous, &current, Emitter::Dstream).is_empty());
    }

    #[test]
    fn test_nested_rows_compare_deeply() {
        let previous = rows(&[json!({"a": {"b": [1, 2]}})]);
        let current = rows(&[json!({"a": {"b": [1, 2]}}), json!({"a": {"b": [2, 1]}})]);
        assert_eq!(
            compute_delta(&current, &previous, Emitter::Istream),
            rows(&[json!({"a": {"b": [2, 1]}})])
        );
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let previous = rows(&[json!({"a": 1})]);
        let current = rows(&[json!({"a": 2})]);
        let _ = compute_delta(&current, &previous, Emitter::Istream);
        assert_eq!(previous, rows(&[json!({"a": 1})]));
        assert_eq!(current, rows(&[json!({"a": 2})]));
    }
}
