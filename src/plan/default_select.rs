//! The default execution plan for windowed single-relation SELECT queries.

use crate::data::{to_bool, Map};
use crate::error::{StreamqlError, StreamqlResult};
use crate::expr::{Evaluator, FunctionRegistry};
use crate::tuple::Tuple;

use super::common::{
    assign_output_value, prepare_filter, prepare_projections, CompiledProjection,
};
use super::delta::compute_delta;
use super::logical::{Emitter, LogicalPlan};
use super::window::{WindowBound, WindowBuffers};
use super::ExecutionPlan;

/// A plan that follows the theoretical processing model directly.
///
/// After each tuple arrives it
/// - updates the window contents using the window size and unit
///   (stream-to-relation),
/// - runs the SELECT over the whole window (relation-to-relation),
/// - compares the result with the previous run's result and emits
///   according to the emitter (relation-to-stream).
pub struct DefaultSelectPlan {
    projections: Vec<CompiledProjection>,
    filter: Option<Box<dyn Evaluator>>,
    emitter: Emitter,
    window: WindowBuffers,
    current: Vec<Map>,
    previous: Vec<Map>,
}

impl DefaultSelectPlan {
    /// Whether this plan can execute the given logical plan: exactly one
    /// input relation, no GROUP BY and no HAVING.
    ///
    /// Aggregate function calls in the SELECT list are not detected here.
    pub fn can_build(lp: &LogicalPlan) -> bool {
        lp.relations.len() == 1 && lp.group_list.is_empty() && lp.having.is_none()
    }

    /// Compile projections and filter and allocate one empty window buffer
    /// per declared relation alias.
    pub fn new(lp: &LogicalPlan, registry: &dyn FunctionRegistry) -> StreamqlResult<Self> {
        let projections = prepare_projections(&lp.projections, registry)?;
        let filter = prepare_filter(lp.filter.as_ref(), registry)?;
        let bound = WindowBound::from_range(lp.unit, lp.value)?;

        tracing::debug!(
            "DefaultSelectPlan: built for {:?} with {} projection(s), filter: {}, window: {:?}, emitter: {:?}",
            lp.relations.iter().map(|r| r.alias.as_str()).collect::<Vec<_>>(),
            projections.len(),
            filter.is_some(),
            bound,
            lp.emitter
        );

        Ok(Self {
            projections,
            filter,
            emitter: lp.emitter,
            window: WindowBuffers::new(&lp.relations, bound),
            current: Vec::new(),
            previous: Vec::new(),
        })
    }

    pub fn window(&self) -> &WindowBuffers {
        &self.window
    }

    /// Results of the most recent run.
    pub fn current_results(&self) -> &[Map] {
        &self.current
    }

    /// Results of the run before the most recent one.
    pub fn previous_results(&self) -> &[Map] {
        &self.previous
    }

    /// Run filter and projections over the current window contents.
    ///
    /// This is a pure function of the buffers. Fails if more than one
    /// relation buffer holds tuples, since joins are not supported.
    pub fn evaluate_window(&self) -> StreamqlResult<Vec<Map>> {
        let populated: Vec<_> = self.window.populated().collect();
        if populated.len() > 1 {
            return Err(StreamqlError::UnsupportedJoin(populated.len()));
        }
        let Some((_, buffer)) = populated.first() else {
            return Ok(Vec::new());
        };

        let mut output = Vec::with_capacity(buffer.len());
        for tuple in buffer.iter() {
            if let Some(filter) = &self.filter {
                if !to_bool(&filter.eval(&tuple.data)?)? {
                    continue;
                }
            }

            let mut result = Map::with_capacity(self.projections.len());
            for proj in &self.projections {
                let value = proj.evaluator.eval(&tuple.data)?;
                assign_output_value(&mut result, &proj.target, value)?;
            }
            output.push(result);
        }
        Ok(output)
    }

    /// Evaluate the window and rotate the result sets. On failure neither
    /// result set changes.
    fn perform_query_on_buffer(&mut self) -> StreamqlResult<()> {
        let output = self.evaluate_window()?;
        self.previous = std::mem::replace(&mut self.current, output);
        Ok(())
    }
}

impl ExecutionPlan for DefaultSelectPlan {
    fn process(&mut self, tuple: Tuple) -> StreamqlResult<Vec<Map>> {
        let now = tuple.timestamp;

        // stream-to-relation
        self.window.append(tuple)?;
        let evicted = self.window.evict(now);

        // relation-to-relation
        self.perform_query_on_buffer()?;

        // relation-to-stream
        let emitted = compute_delta(&self.current, &self.previous, self.emitter);
        tracing::trace!(
            "DefaultSelectPlan: evicted {}, window holds {}, emitting {} of {} row(s)",
            evicted,
            self.window.total_len(),
            emitted.len(),
            self.current.len()
        );
        Ok(emitted)
    }
}
