//! Flat storage for the candidate assignment and its bounds.

use std::cell::Cell;
use std::rc::Rc;

use crate::solver::{problem::Problem, view::TouchTrackingView};

/// Owns the flat cell vector plus the parallel lower and upper bound
/// vectors, and hands out the per-variable views.
///
/// Variables keep their declaration order, so the flat offset of
/// variable k is the sum of the lengths of the variables declared
/// before it. This is the stable mapping between the odometer's integer
/// index space and the per-variable views.
#[derive(Debug)]
pub struct AssignmentStore {
    cells: Rc<Vec<Cell<i64>>>,
    lower: Vec<i64>,
    upper: Vec<i64>,
    offsets: Vec<usize>,
}

impl AssignmentStore {
    /// Lays out every variable of `problem` and initializes the flat
    /// vector to the lower bounds.
    pub fn new(problem: &Problem) -> Self {
        let total = problem.total_cells();
        let mut lower = Vec::with_capacity(total);
        let mut upper = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(problem.variables().len());
        for variable in problem.variables() {
            offsets.push(lower.len());
            lower.extend_from_slice(variable.lower());
            upper.extend_from_slice(variable.upper());
        }
        let cells = Rc::new(lower.iter().map(|&v| Cell::new(v)).collect::<Vec<_>>());
        Self {
            cells,
            lower,
            upper,
            offsets,
        }
    }

    /// One read-recording view per variable, in declaration order. All
    /// views alias the same flat storage.
    pub fn alloc_views(&self, problem: &Problem) -> Vec<Rc<TouchTrackingView>> {
        problem
            .variables()
            .iter()
            .zip(&self.offsets)
            .map(|(variable, &offset)| {
                Rc::new(TouchTrackingView::new(
                    self.cells.clone(),
                    offset,
                    variable.dims().to_vec(),
                ))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn cell(&self, i: usize) -> i64 {
        self.cells[i].get()
    }

    pub fn set_cell(&self, i: usize, value: i64) {
        self.cells[i].set(value);
    }

    pub fn inc_cell(&self, i: usize) {
        self.cells[i].set(self.cells[i].get() + 1);
    }

    pub fn lower(&self, i: usize) -> i64 {
        self.lower[i]
    }

    pub fn upper(&self, i: usize) -> i64 {
        self.upper[i]
    }
}
