//! Per-relation sliding window buffers.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::error::{StreamqlError, StreamqlResult};
use crate::tuple::Tuple;

use super::logical::{AliasRelation, RangeUnit};

/// Upper bound for the capacity reserved up front for count windows.
const MAX_PREALLOCATED_TUPLES: usize = 4096;

/// The bound every buffer satisfies after [`WindowBuffers::evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBound {
    /// Keep at most this many of the most recent tuples
    Count(usize),
    /// Keep tuples at most this much older than the newest arrival
    Time(Duration),
}

impl WindowBound {
    pub fn from_range(unit: RangeUnit, value: i64) -> StreamqlResult<Self> {
        if value < 0 {
            return Err(StreamqlError::InvalidPlan(format!(
                "window size must not be negative, got {}",
                value
            )));
        }
        match unit {
            RangeUnit::Tuples => usize::try_from(value).map(WindowBound::Count).map_err(|_| {
                StreamqlError::InvalidPlan(format!("window of {} tuples is too large", value))
            }),
            RangeUnit::Seconds => Duration::try_seconds(value)
                .map(WindowBound::Time)
                .ok_or_else(|| {
                    StreamqlError::InvalidPlan(format!(
                        "window of {} seconds is too large",
                        value
                    ))
                }),
        }
    }
}

/// Window contents of every declared input relation, keyed by alias.
///
/// Buffers hold tuples oldest first. `append` may leave a buffer over its
/// bound; `evict` restores the bound.
#[derive(Debug)]
pub struct WindowBuffers {
    relations: Vec<AliasRelation>,
    bound: WindowBound,
    buffers: HashMap<String, VecDeque<Tuple>>,
}

impl WindowBuffers {
    pub fn new(relations: &[AliasRelation], bound: WindowBound) -> Self {
        let buffers = relations
            .iter()
            .map(|rel| {
                let buffer = match bound {
                    // one extra slot for the arrival before eviction
                    WindowBound::Count(n) => {
                        VecDeque::with_capacity(n.saturating_add(1).min(MAX_PREALLOCATED_TUPLES))
                    }
                    WindowBound::Time(_) => VecDeque::new(),
                };
                (rel.alias.clone(), buffer)
            })
            .collect();

        Self {
            relations: relations.to_vec(),
            bound,
            buffers,
        }
    }

    /// Append an arriving tuple to every buffer whose relation name matches
    /// the tuple's input name.
    ///
    /// On a self-join each additional buffer gets its own deep copy; the
    /// tuple itself moves into the last matching buffer. Nothing is
    /// modified when no relation matches.
    pub fn append(&mut self, tuple: Tuple) -> StreamqlResult<()> {
        let aliases: Vec<&str> = self
            .relations
            .iter()
            .filter(|rel| rel.name == tuple.input_name)
            .map(|rel| rel.alias.as_str())
            .collect();

        let Some((last, others)) = aliases.split_last() else {
            return Err(StreamqlError::UnknownInput {
                input_name: tuple.input_name,
                known: self.relations.iter().map(|rel| rel.name.clone()).collect(),
            });
        };

        for alias in others {
            self.buffers
                .entry(alias.to_string())
                .or_default()
                .push_back(tuple.clone());
        }
        self.buffers
            .entry(last.to_string())
            .or_default()
            .push_back(tuple);
        Ok(())
    }

    /// Drop tuples that fall outside the window, returning how many were
    /// removed.
    ///
    /// For time windows `now` is the timestamp of the tuple that just
    /// arrived, and it applies to every buffer, including buffers of
    /// relations that tuple did not arrive on.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        for buffer in self.buffers.values_mut() {
            let before = buffer.len();
            match self.bound {
                WindowBound::Count(n) => {
                    if buffer.len() > n {
                        let excess = buffer.len() - n;
                        buffer.drain(..excess);
                    }
                }
                WindowBound::Time(range) => {
                    buffer.retain(|t| now.signed_duration_since(t.timestamp) <= range);
                }
            }
            evicted += before - buffer.len();
        }
        evicted
    }

    pub fn get(&self, alias: &str) -> Option<&VecDeque<Tuple>> {
        self.buffers.get(alias)
    }

    /// Buffers that currently hold at least one tuple.
    pub fn populated(&self) -> impl Iterator<Item = (&str, &VecDeque<Tuple>)> {
        self.buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(alias, buffer)| (alias.as_str(), buffer))
    }

    /// Total number of buffered tuples over all relations.
    pub fn total_len(&self) -> usize {
        self.buffers.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn tuple(input: &str, secs: i64, n: i64) -> Tuple {
        Tuple::from_json(input, at(secs), json!({ "n": n }))
    }

    fn ns(buffer: &VecDeque<Tuple>) -> Vec<i64> {
        buffer
            .iter()
            .map(|t| t.data["n"].as_int().unwrap())
            .collect()
    }

    #[test]
    fn test_bound_from_range() {
        assert_eq!(
            WindowBound::from_range(RangeUnit::Tuples, 3).unwrap(),
            WindowBound::Count(3)
        );
        assert_eq!(
            WindowBound::from_range(RangeUnit::Seconds, 5).unwrap(),
            WindowBound::Time(Duration::seconds(5))
        );
        assert!(WindowBound::from_range(RangeUnit::Tuples, -1).is_err());
        assert!(WindowBound::from_range(RangeUnit::Seconds, i64::MAX).is_err());
    }

    #[test]
    fn test_count_preallocation() {
        let buffers = WindowBuffers::new(&[AliasRelation::named("s")], WindowBound::Count(3));
        assert!(buffers.get("s").unwrap().capacity() >= 4);
    }

    #[test]
    fn test_count_eviction_keeps_most_recent() {
        let mut buffers = WindowBuffers::new(&[AliasRelation::named("s")], WindowBound::Count(2));
        for n in 1..=4 {
            buffers.append(tuple("s", n, n)).unwrap();
            buffers.evict(at(n));
            assert!(buffers.get("s").unwrap().len() <= 2);
        }
        assert_eq!(ns(buffers.get("s").unwrap()), vec![3, 4]);
    }

    #[test]
    fn test_zero_count_window_is_always_empty() {
        let mut buffers = WindowBuffers::new(&[AliasRelation::named("s")], WindowBound::Count(0));
        buffers.append(tuple("s", 1, 1)).unwrap();
        assert_eq!(buffers.evict(at(1)), 1);
        assert_eq!(buffers.total_len(), 0);
    }

    #[test]
    fn test_time_eviction_is_inclusive() {
        let mut buffers = WindowBuffers::new(
            &[AliasRelation::named("s")],
            WindowBound::Time(Duration::seconds(2)),
        );
        for secs in [10, 11, 12, 13] {
            buffers.append(tuple("s", secs, secs)).unwrap();
        }
        assert_eq!(buffers.evict(at(13)), 1);
        // 13 - 11 == 2 is still inside the window
        assert_eq!(ns(buffers.get("s").unwrap()), vec![11, 12, 13]);
    }

    #[test]
    fn test_time_eviction_applies_to_all_buffers() {
        let relations = [AliasRelation::named("a"), AliasRelation::named("b")];
        let mut buffers = WindowBuffers::new(&relations, WindowBound::Time(Duration::seconds(5)));
        buffers.append(tuple("a", 0, 1)).unwrap();
        buffers.append(tuple("b", 100, 2)).unwrap();
        buffers.evict(at(100));

        assert!(buffers.get("a").unwrap().is_empty());
        assert_eq!(ns(buffers.get("b").unwrap()), vec![2]);
    }

    #[test]
    fn test_unknown_input_leaves_buffers_untouched() {
        let mut buffers = WindowBuffers::new(&[AliasRelation::named("s")], WindowBound::Count(5));
        buffers.append(tuple("s", 1, 1)).unwrap();

        let err = buffers.append(tuple("other", 2, 2)).unwrap_err();
        match err {
            StreamqlError::UnknownInput { input_name, known } => {
                assert_eq!(input_name, "other");
                assert_eq!(known, vec!["s".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(buffers.total_len(), 1);
    }

    #[test]
    fn test_self_join_appends_independent_copies() {
        let relations = [AliasRelation::new("s", "left"), AliasRelation::new("s", "right")];
        let mut buffers = WindowBuffers::new(&relations, WindowBound::Count(5));
        buffers.append(tuple("s", 1, 7)).unwrap();

        let left = &buffers.get("left").unwrap()[0];
        let right = &buffers.get("right").unwrap()[0];
        assert_eq!(left, right);
        assert!(!std::ptr::eq(left, right));
        assert!(!std::ptr::eq(&left.data, &right.data));
        assert_eq!(buffers.populated().count(), 2);
    }
}
