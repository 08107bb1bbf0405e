//! Problem construction: variables with per-cell bounds and predicate
//! constraints over named variables.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ndarray::{ArrayD, IxDyn};

use crate::error::{Result, SolverError};
use crate::solver::view::TouchTrackingView;

/// The signature every constraint predicate satisfies.
///
/// A predicate is invoked with the views of its declared variables, in
/// the order they were listed, and returns `true` when the candidate
/// satisfies the constraint. Predicates must be pure: the same cell
/// values must produce the same verdict and the same reads. A predicate
/// may fail (e.g. with [`SolverError::Custom`]), which aborts the
/// solve.
pub type PredicateFn = dyn Fn(&[Rc<TouchTrackingView>]) -> Result<bool, SolverError>;

/// A named handle for a contiguous block of cells arranged as a
/// fixed-shape grid. Cells are stored in column-major order: the first
/// index varies fastest.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dims: Vec<usize>,
    lower: Vec<i64>,
    upper: Vec<i64>,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of cells in the variable.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub(crate) fn lower(&self) -> &[i64] {
        &self.lower
    }

    pub(crate) fn upper(&self) -> &[i64] {
        &self.upper
    }
}

pub(crate) struct ConstraintSpec {
    pub label: String,
    /// Indices into the problem's variable list, in the order the
    /// predicate expects its views.
    pub variables: Vec<usize>,
    pub predicate: Box<PredicateFn>,
}

impl fmt::Debug for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSpec")
            .field("label", &self.label)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// An immutable-after-build description of a constraint problem: an
/// ordered list of variables and a list of predicate constraints over
/// them.
///
/// Construction validates eagerly; a `Problem` that was built without
/// errors can be solved any number of times.
#[derive(Debug, Default)]
pub struct Problem {
    variables: Vec<Variable>,
    names: HashMap<String, usize>,
    constraints: Vec<ConstraintSpec>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a grid variable with per-cell bounds.
    ///
    /// `lower`'s shape is authoritative; `upper` only has to hold the
    /// same number of cells and is reshaped to match. Fails with
    /// [`SolverError::ShapeMismatch`] when the cell counts differ, and
    /// with [`SolverError::InvalidBounds`] when any cell's lower bound
    /// exceeds its upper bound. Returns the name for chaining.
    pub fn add_variable(
        &mut self,
        name: &str,
        lower: ArrayD<i64>,
        upper: ArrayD<i64>,
    ) -> Result<String> {
        if self.names.contains_key(name) {
            return Err(SolverError::DuplicateVariable {
                name: name.to_string(),
            }
            .into());
        }
        if lower.len() != upper.len() {
            return Err(SolverError::ShapeMismatch {
                variable: name.to_string(),
                lower_len: lower.len(),
                upper_len: upper.len(),
            }
            .into());
        }

        let dims = lower.shape().to_vec();
        let lower = column_major(&lower);
        let upper = column_major(&upper);
        for (index, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            if lo > hi {
                return Err(SolverError::InvalidBounds {
                    variable: name.to_string(),
                    index,
                    lower: lo,
                    upper: hi,
                }
                .into());
            }
        }

        self.names.insert(name.to_string(), self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            dims,
            lower,
            upper,
        });
        Ok(name.to_string())
    }

    /// Convenience for a single-cell variable with bounds `[lo, hi]`.
    pub fn add_scalar(&mut self, name: &str, lo: i64, hi: i64) -> Result<String> {
        self.add_variable(
            name,
            ArrayD::from_elem(IxDyn(&[1]), lo),
            ArrayD::from_elem(IxDyn(&[1]), hi),
        )
    }

    /// Attaches a predicate constraint over the listed variables.
    ///
    /// Fails with [`SolverError::UnknownVariable`] if any name has not
    /// been declared.
    pub fn add_constraint<F>(&mut self, variables: &[&str], predicate: F) -> Result<()>
    where
        F: Fn(&[Rc<TouchTrackingView>]) -> Result<bool, SolverError> + 'static,
    {
        let label = format!("c{}", self.constraints.len());
        self.add_constraint_named(&label, variables, predicate)
    }

    /// Single-variable convenience, equivalent to a one-element list.
    pub fn add_constraint_on<F>(&mut self, variable: &str, predicate: F) -> Result<()>
    where
        F: Fn(&[Rc<TouchTrackingView>]) -> Result<bool, SolverError> + 'static,
    {
        self.add_constraint(&[variable], predicate)
    }

    /// Like [`add_constraint`](Self::add_constraint), with an explicit
    /// label used in errors and the statistics table.
    pub fn add_constraint_named<F>(
        &mut self,
        label: &str,
        variables: &[&str],
        predicate: F,
    ) -> Result<()>
    where
        F: Fn(&[Rc<TouchTrackingView>]) -> Result<bool, SolverError> + 'static,
    {
        let mut ids = Vec::with_capacity(variables.len());
        for &name in variables {
            let id = self.names.get(name).copied().ok_or_else(|| {
                SolverError::UnknownVariable {
                    constraint: label.to_string(),
                    variable: name.to_string(),
                }
            })?;
            ids.push(id);
        }
        self.constraints.push(ConstraintSpec {
            label: label.to_string(),
            variables: ids,
            predicate: Box::new(predicate),
        });
        Ok(())
    }

    /// Variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Label of the constraint with the given id, if it exists.
    pub fn constraint_label(&self, id: usize) -> Option<&str> {
        self.constraints.get(id).map(|c| c.label.as_str())
    }

    /// Total number of cells across all variables.
    pub fn total_cells(&self) -> usize {
        self.variables.iter().map(Variable::len).sum()
    }

    pub(crate) fn constraints(&self) -> &[ConstraintSpec] {
        &self.constraints
    }
}

/// Flattens a grid with the first index varying fastest. Transposing
/// reverses the axes, so iterating the transpose in logical order walks
/// the original column-major.
fn column_major(grid: &ArrayD<i64>) -> Vec<i64> {
    grid.t().iter().copied().collect()
}
