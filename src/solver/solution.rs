use im::HashMap;
use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::solver::{problem::Problem, store::AssignmentStore};

/// A single satisfying assignment.
///
/// Each variable's values are captured by copy into an independently
/// owned grid of the variable's declared shape, so solutions remain
/// valid after the engine has moved on or been dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    grids: HashMap<String, ArrayD<i64>>,
}

impl Solution {
    /// Copies the current flat assignment into per-variable grids.
    pub(crate) fn capture(problem: &Problem, store: &AssignmentStore) -> Self {
        let mut grids = HashMap::new();
        let mut offset = 0;
        for variable in problem.variables() {
            let values: Vec<i64> = (offset..offset + variable.len())
                .map(|i| store.cell(i))
                .collect();
            let grid = ArrayD::from_shape_vec(IxDyn(variable.dims()).f(), values)
                .expect("variable length matches its declared shape");
            grids.insert(variable.name().to_string(), grid);
            offset += variable.len();
        }
        Self { grids }
    }

    /// The grid assigned to `name`, in the variable's declared shape.
    pub fn grid(&self, name: &str) -> Option<&ArrayD<i64>> {
        self.grids.get(name)
    }

    /// Convenience for single-cell variables: the first (only) value of
    /// the named grid.
    pub fn value(&self, name: &str) -> Option<i64> {
        self.grids.get(name).and_then(|grid| grid.first().copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArrayD<i64>)> {
        self.grids.iter()
    }

    /// Number of variables in the solution.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}
