//! Derives the odometer's increment order from observed read patterns.
//!
//! The odometer increments its low positions most often, so those
//! should be the positions constraints read *last*: a failure then
//! names a high position, and the skip step prunes the whole subtree of
//! lower positions at once. Both planning passes evaluate every
//! predicate against the all-lower-bound assignment and only look at
//! what was touched.

use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, SolverError};
use crate::solver::{
    constraint::ConstraintTable,
    view::{clear_all_touches, snapshot_all_touches, TouchTrackingView},
};

/// Produces the permutation of cell positions used as the odometer
/// order: `order[0]` is incremented fastest, carrying into `order[1]`,
/// and so on.
///
/// Pass 1 scores each constraint by how few cells it touches (fewest
/// touches scores highest) and sorts the table descending, so the
/// cheapest, most selective constraints are tried first. Pass 2 starts
/// from the identity permutation and, for each constraint in that
/// order, stably re-sorts the permutation so that positions no
/// constraint has yet read stay at the front.
pub(crate) fn plan_increment_order(
    table: &mut ConstraintTable<'_>,
    views: &[Rc<TouchTrackingView>],
    total_cells: usize,
) -> Result<Vec<usize>, SolverError> {
    let mut touched = vec![false; total_cells];

    for entry in table.entries_mut() {
        clear_all_touches(views);
        entry.evaluate().map_err(|source| {
            SolverError::ConstraintEvaluationFailed {
                constraint: entry.label().to_string(),
                nodes: 0,
                source: Box::new(source),
            }
        })?;
        snapshot_all_touches(views, &mut touched);
        let touches = touched.iter().filter(|&&t| t).count();
        entry.estimated_quality = total_cells - touches;
    }
    table.sort_by_quality_desc();

    let mut order: Vec<usize> = (0..total_cells).collect();
    let mut cumulative = vec![false; total_cells];
    for entry in table.entries() {
        clear_all_touches(views);
        entry.evaluate().map_err(|source| {
            SolverError::ConstraintEvaluationFailed {
                constraint: entry.label().to_string(),
                nodes: 0,
                source: Box::new(source),
            }
        })?;
        snapshot_all_touches(views, &mut touched);
        for (seen, &touch) in cumulative.iter_mut().zip(&touched) {
            *seen |= touch;
        }
        order.sort_by_key(|&position| cumulative[position]);
    }

    debug!(?order, "increment order planned");
    Ok(order)
}
