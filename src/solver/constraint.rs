//! The per-solve constraint table.

use std::rc::Rc;

use crate::error::{Result, SolverError};
use crate::solver::{
    engine::ConstraintId,
    problem::{ConstraintSpec, Problem},
    view::TouchTrackingView,
};

/// A constraint prepared for search: the predicate, the views of its
/// variables in the declared order, and its current quality estimate.
///
/// `estimated_quality` is the reordering key. During planning it holds
/// the fast-failer score (cells *not* touched); during search it holds
/// the skip index of the most recent failing evaluation, and 0 for a
/// satisfied constraint. Descending sort therefore tries heavy failers
/// first and sinks satisfied constraints to the end.
pub(crate) struct TableEntry<'p> {
    pub id: ConstraintId,
    pub estimated_quality: usize,
    spec: &'p ConstraintSpec,
    views: Vec<Rc<TouchTrackingView>>,
}

impl TableEntry<'_> {
    pub fn label(&self) -> &str {
        &self.spec.label
    }

    /// Invokes the predicate on the constraint's views.
    pub fn evaluate(&self) -> Result<bool, SolverError> {
        (self.spec.predicate)(&self.views)
    }
}

/// Mutable wrapper over the problem's constraint list, carrying the
/// per-constraint `estimated_quality` used for dynamic reordering. No
/// constraint is ever added or removed during a solve.
pub(crate) struct ConstraintTable<'p> {
    entries: Vec<TableEntry<'p>>,
}

impl<'p> ConstraintTable<'p> {
    /// Pairs each constraint with the views of its variables. `views`
    /// is indexed by variable declaration order.
    pub fn build(problem: &'p Problem, views: &[Rc<TouchTrackingView>]) -> Self {
        let entries = problem
            .constraints()
            .iter()
            .enumerate()
            .map(|(id, spec)| TableEntry {
                id,
                estimated_quality: 0,
                spec,
                views: spec.variables.iter().map(|&v| views[v].clone()).collect(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[TableEntry<'p>] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [TableEntry<'p>] {
        &mut self.entries
    }

    /// Stable descending sort by `estimated_quality`; ties keep their
    /// current relative order.
    pub fn sort_by_quality_desc(&mut self) {
        self.entries
            .sort_by(|a, b| b.estimated_quality.cmp(&a.estimated_quality));
    }
}
